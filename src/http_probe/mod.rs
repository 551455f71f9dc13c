pub mod headers;
pub mod probe;
pub mod result;

use std::fmt::Write;

pub mod prelude {
    pub use super::headers::HeaderSet;
    pub use super::probe::{ContentInspector, HttpProber, Prober};
    pub use super::result::{ProbeRequest, ProbeResult, Supplement};
}

/// Renders an error and its `source()` chain as a single message.
pub fn report(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = format!("{}", err);
    while let Some(src) = err.source() {
        let _ = write!(s, "\n\nCaused by: {}", src);
        err = src;
    }
    s
}
