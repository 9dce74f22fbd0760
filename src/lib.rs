// Library root for the exam-prep community API

pub mod auth;
pub mod baas;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

// Re-export commonly used types
pub use baas::BaasClient;
pub use config::Config;
pub use db::Database;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
