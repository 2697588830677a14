// src/config/duration.rs

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*([a-zA-Z]*)$").expect("static regex"));

/// Parse a config duration such as `"200ms"`, `"3s"`, `"2m"` or `"1h"`.
///
/// A unit is mandatory; bare numbers are rejected so `debounce = "200"` does
/// not silently mean seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let caps = DURATION
        .captures(raw)
        .ok_or_else(|| format!("'{raw}' is not a duration like 200ms, 3s, 2m or 1h"))?;

    let value: u64 = caps[1]
        .parse()
        .map_err(|e| format!("'{}' is out of range: {e}", &caps[1]))?;

    let per_unit = match caps[2].to_ascii_lowercase().as_str() {
        "" => return Err(format!("'{raw}' is missing a unit (ms, s, m or h)")),
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        other => return Err(format!("unknown duration unit '{other}' in '{raw}'")),
    };

    value
        .checked_mul(per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("'{raw}' is out of range"))
}
