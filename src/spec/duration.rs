//! Go-style duration strings such as `"2160h"`, `"1h30m"` or `"2160h0m0s"`.

use time::Duration;

use crate::error::{RequestError, Result};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        // U+00B5 and U+03BC are both accepted, like Go.
        "us" | "\u{b5}s" | "\u{3bc}s" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(60 * NANOS_PER_SECOND),
        "h" => Some(3600 * NANOS_PER_SECOND),
        _ => None,
    }
}

/// Parses a duration string made of `<decimal><unit>` groups with an optional
/// leading sign, units being `h`, `m`, `s`, `ms`, `us` (or `µs`) and `ns`.
///
/// Values are limited to what fits in a signed 64-bit nanosecond count.
pub fn parse(input: &str) -> Result<Duration> {
    let invalid = |reason: &str| RequestError::InvalidSpec(format!("duration {input:?}: {reason}"));
    let out_of_range = || invalid("number out of range");

    let trimmed = input.trim();
    let (negative, mut rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if rest.is_empty() {
        return Err(invalid("empty"));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let whole: u128 = if int_len == 0 {
            0
        } else {
            rest[..int_len].parse().map_err(|_| out_of_range())?
        };
        rest = &rest[int_len..];

        let mut fraction = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            fraction = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
        }
        if int_len == 0 && fraction.is_empty() {
            return Err(invalid("expected a number"));
        }

        let unit_len = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        if unit.is_empty() {
            return Err(invalid("missing unit"));
        }
        let scale = unit_nanos(unit).ok_or_else(|| invalid("unknown unit"))?;
        rest = &rest[unit_len..];

        let mut part = whole.checked_mul(scale).ok_or_else(out_of_range)?;
        // Digits beyond nanosecond precision are dropped.
        let mut place = scale;
        for digit in fraction.bytes() {
            place /= 10;
            if place == 0 {
                break;
            }
            part += u128::from(digit - b'0') * place;
        }
        total = total.checked_add(part).ok_or_else(out_of_range)?;
    }

    let nanos = i64::try_from(total).map_err(|_| out_of_range())?;
    Ok(Duration::nanoseconds(if negative { -nanos } else { nanos }))
}

/// `value / scale` as a decimal, with trailing fractional zeros removed.
fn decimal(value: u128, scale: u128) -> String {
    let (whole, fraction) = (value / scale, value % scale);
    if fraction == 0 {
        return whole.to_string();
    }
    let width = scale.ilog10() as usize;
    let fraction = format!("{fraction:0width$}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

/// Renders a duration the way Go's `time.Duration.String` does.
pub fn format(duration: Duration) -> String {
    let nanos = duration.whole_nanoseconds();
    if nanos == 0 {
        return "0s".to_string();
    }
    let sign = if nanos < 0 { "-" } else { "" };
    let nanos = nanos.unsigned_abs();

    if nanos < NANOS_PER_MICRO {
        return format!("{sign}{nanos}ns");
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{sign}{}\u{b5}s", decimal(nanos, NANOS_PER_MICRO));
    }
    if nanos < NANOS_PER_SECOND {
        return format!("{sign}{}ms", decimal(nanos, NANOS_PER_MILLI));
    }

    let total = nanos / NANOS_PER_SECOND;
    let (hours, minutes) = (total / 3600, (total % 3600) / 60);
    let seconds = decimal(nanos % (60 * NANOS_PER_SECOND), NANOS_PER_SECOND);
    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{seconds}s")
    } else {
        format!("{sign}{seconds}s")
    }
}

/// Serde adapter for `Option<Duration>` fields carried as Go-style strings.
pub(crate) mod option {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_str(&super::format(*duration)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| super::parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
