/// A parsed `X-Timer` value: `S<start>,VS<int>,VS<int>,VE<elapsed_ms>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeTimer {
    pub start: f64,
    pub elapsed_ms: u64,
}

impl EdgeTimer {
    /// Returns `None` for anything that does not match the full pattern.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split(',');
        let start = parts.next()?.strip_prefix('S')?.parse::<f64>().ok()?;
        parts.next()?.strip_prefix("VS")?.parse::<u64>().ok()?;
        parts.next()?.strip_prefix("VS")?.parse::<u64>().ok()?;
        let elapsed_ms = parts.next()?.strip_prefix("VE")?.parse::<u64>().ok()?;
        if parts.next().is_some() || !start.is_finite() {
            return None;
        }
        Some(Self { start, elapsed_ms })
    }
}
