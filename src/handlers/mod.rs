pub mod meal_handler;
pub mod render;
pub mod session;

pub use meal_handler::{MealHandler, SummaryOutcome, UploadOutcome};
pub use session::SessionStore;
