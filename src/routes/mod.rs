mod auth;
mod health_check;

pub use auth::{json_error_handler, login, LoginRequest};
pub use health_check::health_check;
