pub mod app_config;
pub mod model;
pub mod run_config;

pub use app_config::{AppConfig, load_config};
pub use run_config::RunConfig;
