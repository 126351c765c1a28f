use serde::Serialize;

/// One persisted probe result. Every sample in a pass shares the same `ts`;
/// the batch is written as one transaction with one timestamp.
#[derive(Debug, Clone)]
pub struct Sample {
    pub host: String,
    pub port: u16,
    /// Unix seconds, captured once per pass.
    pub ts: i64,
    pub online: bool,
}

/// One point of a windowed series, as served by /api/series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplePoint {
    pub t: i64,
    pub v: bool,
}
