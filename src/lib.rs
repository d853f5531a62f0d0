pub mod auth;
pub mod configuration;
pub mod error;
pub mod logger;
pub mod routes;
pub mod session_cache;
pub mod startup;
pub mod telemetry;
pub mod validators;
