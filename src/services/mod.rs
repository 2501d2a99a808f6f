pub mod database;
pub mod gemini; // Gemini generateContent client
pub mod image;
pub mod nutrition;
pub mod retry;

pub use database::{Database, MealSink};
pub use gemini::{GeminiService, HttpTransport};
