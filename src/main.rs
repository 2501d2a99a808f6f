mod config;
mod handlers;
mod models;
mod server;
mod services;

use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;

use config::AppConfig;
use handlers::{MealHandler, SessionStore};
use services::{Database, GeminiService, HttpTransport, MealSink};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("🚀 Starting Meal Nutrition Tracker...");

    let config = AppConfig::from_env();

    let transport = HttpTransport::new(
        config.gemini.api_key.clone(),
        config.gemini.model.clone(),
        config.gemini.api_base.clone(),
        config.gemini.timeout,
    )?;
    let gemini = Arc::new(GeminiService::new(Arc::new(transport)));
    log::info!("✅ Gemini service initialized with model: {}", config.gemini.model);

    let sink: Option<Arc<dyn MealSink>> = match &config.database_url {
        Some(url) => match Database::new(url).await {
            Ok(db) => {
                log::info!("✅ PostgreSQL meal log initialized");
                Some(Arc::new(db) as Arc<dyn MealSink>)
            }
            Err(e) => {
                log::warn!("⚠️ Database unavailable, meals will only be kept in memory: {:#}", e);
                None
            }
        },
        None => {
            log::info!("ℹ️ DATABASE_URL not set, meals will only be kept in memory");
            None
        }
    };

    let meal_handler = Arc::new(MealHandler::new(gemini, sink));
    let sessions = SessionStore::with_idle_timeout(config.session_idle_timeout);
    let app = server::create_router(meal_handler, sessions);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("🌐 Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("🛑 Shutting down...");
        })
        .await?;

    Ok(())
}
