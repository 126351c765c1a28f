use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::DEFAULT_WINDOW_SECS;
use crate::db::SampleStore;
use crate::error::Result;

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Uptime over `ts >= since_epoch` as a percentage. `None` means no samples
/// in the window, distinct from 0.0 (every sample was offline).
pub async fn uptime_percentage(
    store: &dyn SampleStore,
    host: &str,
    port: u16,
    since_epoch: i64,
) -> Result<Option<f64>> {
    let (total, online_sum) = store.count_and_sum(host, port, since_epoch).await?;
    if total == 0 {
        return Ok(None);
    }
    Ok(Some(online_sum as f64 / total as f64 * 100.0))
}

/// Turns a window spec into a since-epoch: `"Nh"` is N hours back, `"Nd"` is
/// N days back. Anything else falls back to the 24h default: a bad query
/// parameter on a monitoring view degrades, it does not error.
pub fn window_to_since(spec: &str, now: i64) -> i64 {
    let parsed = if let Some(hours) = spec.strip_suffix('h') {
        hours.parse::<i64>().ok().map(|h| h * 3600)
    } else if let Some(days) = spec.strip_suffix('d') {
        days.parse::<i64>().ok().map(|d| d * 86400)
    } else {
        None
    };
    now - parsed.unwrap_or(DEFAULT_WINDOW_SECS)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
