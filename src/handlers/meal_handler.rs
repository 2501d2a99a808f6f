use std::sync::Arc;
use uuid::Uuid;

use crate::handlers::render::MealMetrics;
use crate::handlers::session::{SessionHandle, SessionStore};
use crate::models::{ApiError, MealAnalysis};
use crate::services::nutrition::summary_error_message;
use crate::services::{image, GeminiService, MealSink};

pub const PERSISTENCE_DISABLED: &str = "Disabled";

#[derive(Debug)]
pub enum UploadOutcome {
    /// The upload could not be decoded as an image; nothing was sent upstream.
    InvalidImage(String),
    /// The inference pipeline failed; the meal log is unchanged.
    Failed(ApiError),
    /// The session was reset or expired before the meal could be logged.
    SessionNotFound,
    Logged {
        meal: MealAnalysis,
        metrics: MealMetrics,
        position: usize,
        persistence: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    Report(String),
    Error(String),
}

/// Upload and report interactions for one session at a time.
pub struct MealHandler {
    gemini: Arc<GeminiService>,
    sink: Option<Arc<dyn MealSink>>,
}

impl MealHandler {
    pub fn new(gemini: Arc<GeminiService>, sink: Option<Arc<dyn MealSink>>) -> Self {
        Self { gemini, sink }
    }

    pub async fn handle_upload(
        &self,
        sessions: &SessionStore,
        session_id: Uuid,
        image_bytes: &[u8],
    ) -> UploadOutcome {
        if sessions.get(&session_id).is_none() {
            return UploadOutcome::SessionNotFound;
        }

        let base64_jpeg = match image::to_jpeg_base64(image_bytes) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("⚠️ Rejected upload: {:#}", e);
                return UploadOutcome::InvalidImage(format!("{:#}", e));
            }
        };

        let meal = match self.gemini.analyze_meal_image(&base64_jpeg).await {
            Ok(meal) => meal,
            Err(e) => {
                log::error!("❌ Image analysis error: {} ({})", e, e.details());
                return UploadOutcome::Failed(e);
            }
        };

        // Looked up again: the session may have ended during the API call.
        let Some(session) = sessions.get(&session_id) else {
            log::warn!("⚠️ Session {} ended before {} could be logged", session_id, meal.food_name);
            return UploadOutcome::SessionNotFound;
        };
        let position = session.lock().await.meals.append(meal.clone());
        log::info!("✅ Meal #{} logged for session {}: {}", position, session_id, meal.food_name);

        let persistence = self.persist(&session_id.to_string(), &meal).await;

        UploadOutcome::Logged {
            metrics: MealMetrics::from(&meal),
            meal,
            position,
            persistence,
        }
    }

    pub async fn handle_summary(&self, session: &SessionHandle) -> SummaryOutcome {
        let snapshot = session.lock().await.meals.clone();

        match self.gemini.daily_summary(&snapshot).await {
            Ok(report) => SummaryOutcome::Report(report),
            Err(e) => SummaryOutcome::Error(summary_error_message(&e)),
        }
    }

    async fn persist(&self, session_id: &str, meal: &MealAnalysis) -> String {
        let Some(sink) = &self.sink else {
            return PERSISTENCE_DISABLED.to_string();
        };

        match sink.log_meal(session_id, meal).await {
            Ok(id) => {
                log::info!("💾 Meal stored in database with id {}", id);
                "Success".to_string()
            }
            Err(e) => {
                log::error!("❌ Failed to store meal in database: {:#}", e);
                format!("Error: {:#}", e)
            }
        }
    }
}
