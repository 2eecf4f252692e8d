use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;

static DURATION_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*([smhdw]?)").expect("valid duration regex"));

/// Parse a relative duration like `90s`, `15m`, `2h`, `1d`, `1w` or `1h30m`
///
/// A bare number is taken as seconds.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        anyhow::bail!("empty duration");
    }

    let mut total: i64 = 0;
    let mut consumed = 0;

    for part in DURATION_PART.captures_iter(input) {
        let whole = part.get(0).context("regex match without group 0")?;
        if input[consumed..whole.start()].trim() != "" {
            anyhow::bail!("invalid duration '{input}'");
        }
        consumed = whole.end();

        let value: i64 = part[1]
            .parse()
            .with_context(|| format!("duration '{input}' is out of range"))?;
        let unit = match &part[2] {
            "" | "s" => 1,
            "m" => 60,
            "h" => 60 * 60,
            "d" => 24 * 60 * 60,
            "w" => 7 * 24 * 60 * 60,
            other => anyhow::bail!("unknown duration unit '{other}'"),
        };

        total = value
            .checked_mul(unit)
            .and_then(|seconds| total.checked_add(seconds))
            .with_context(|| format!("duration '{input}' is out of range"))?;
    }

    if input[consumed..].trim() != "" {
        anyhow::bail!("invalid duration '{input}'");
    }

    if total <= 0 {
        anyhow::bail!("duration must be positive");
    }

    Duration::try_seconds(total).with_context(|| format!("duration '{input}' is out of range"))
}

/// Start and end of a downtime beginning at `now`, as epoch seconds
pub fn downtime_window(now: DateTime<Utc>, duration: Duration) -> Result<(i64, i64)> {
    let end = expiry_after(now, duration)?;
    Ok((now.timestamp(), end))
}

/// Epoch second at which an acknowledgement started at `now` expires
pub fn expiry_after(now: DateTime<Utc>, duration: Duration) -> Result<i64> {
    now.checked_add_signed(duration)
        .map(|end| end.timestamp())
        .with_context(|| format!("duration of {}s ends past the latest date", duration.num_seconds()))
}
