pub mod app;
pub mod auth;
pub mod config;
pub mod errors;
pub mod finance;
pub mod gamification;
pub mod handlers;
pub mod live;
pub mod models;
pub mod planner;
pub mod profile;
pub mod state;
pub mod stats;
pub mod storage;
pub mod subscription;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::Backend;
