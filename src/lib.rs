pub mod batch;
pub mod classify;
pub mod config;
pub mod error;
pub mod http_probe;
pub mod logging;
pub mod record;
pub mod report;
pub mod source;
pub mod summary;

pub use batch::{BatchRun, BatchScheduler};
pub use classify::{CacheVerdict, classify};
pub use config::RunConfig;
pub use error::{ConfigError, RunError};
pub use record::UrlRecord;
pub use summary::{Summary, summarize};
