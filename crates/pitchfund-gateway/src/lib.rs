pub mod app;
pub mod auth;

pub use app::{AppState, router};
pub use auth::Caller;
