pub mod health;
pub mod hello;
pub mod mongo_benchmark;
pub mod otp;
pub mod redis_benchmark;
pub mod tenant_settings;

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

/// TTL used by the benchmark routes when none (or an unusable one) is given.
pub const BENCHMARK_TTL: Duration = Duration::from_secs(120);

/// Non-empty query parameter or a 400 naming it.
pub(crate) fn required_param<'a>(params: &'a HashMap<String, String>, name: &str) -> ApiResult<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{name} is required")))
}

/// Parses a `ttl` parameter such as `30s`, `1h30m` or `1.5s`; anything
/// unusable means the default.
pub(crate) fn ttl_param(params: &HashMap<String, String>) -> Duration {
    params
        .get("ttl")
        .and_then(|raw| parse_ttl(raw.trim()))
        .filter(|ttl| !ttl.is_zero())
        .unwrap_or(BENCHMARK_TTL)
}

/// `humantime` rejects fractions, so a single fractional term is read here.
fn parse_ttl(raw: &str) -> Option<Duration> {
    if let Ok(ttl) = humantime::parse_duration(raw) {
        return Some(ttl);
    }

    let split = raw.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
    let (number, unit) = raw.split_at(split);
    let value: f64 = number.parse().ok()?;
    let unit_secs = match unit {
        "ns" => 1e-9,
        "us" | "µs" => 1e-6,
        "ms" => 1e-3,
        "s" => 1.0,
        "m" => 60.0,
        "h" => 3600.0,
        _ => return None,
    };

    Duration::try_from_secs_f64(value * unit_secs).ok()
}

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("route not found".to_string())
}
