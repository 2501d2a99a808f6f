use anyhow::Result;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Row};

use crate::models::MealAnalysis;

/// Best-effort destination for analysed meals, independent of the
/// in-memory session log.
#[async_trait::async_trait]
pub trait MealSink: Send + Sync {
    async fn log_meal(&self, session_id: &str, meal: &MealAnalysis) -> Result<i64>;
}

pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let db = Database { pool };
        db.init_tables().await?;
        Ok(db)
    }

    async fn init_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS meal_logs (
                id SERIAL PRIMARY KEY,
                session_id TEXT NOT NULL,
                food_name TEXT NOT NULL,
                calories DOUBLE PRECISION NOT NULL,
                analysis JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS meal_logs_session_idx ON meal_logs (session_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl MealSink for Database {
    async fn log_meal(&self, session_id: &str, meal: &MealAnalysis) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO meal_logs (session_id, food_name, calories, analysis, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(session_id)
        .bind(&meal.food_name)
        .bind(meal.calories)
        .bind(Json(meal))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let id: i32 = result.get(0);
        Ok(id as i64)
    }
}
