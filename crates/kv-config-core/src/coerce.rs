//! Pure string-to-scalar conversions shared by every typed accessor.
//!
//! Store values are untyped text. These helpers turn trimmed raw values into
//! the scalar kinds exposed by [`crate::source::SourceExt`]. Every function
//! is total: it returns `None` instead of failing, which the accessor layer
//! reports as "present but unparseable".

use std::time::Duration;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

/// Fraction digits beyond this precision cannot change a nanosecond total.
const MAX_FRACTION_DIGITS: usize = 18;

/// Splits a comma separated list, trimming items and dropping empty ones.
pub fn to_string_slice(value: &str) -> Option<Vec<String>> {
    Some(
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_owned)
            .collect(),
    )
}

/// Lower bound of the integer range an `f64` can be truncated into without saturating.
const I64_FLOAT_MIN: f64 = i64::MIN as f64;
/// Exclusive upper bound: `i64::MAX as f64` rounds up to 2^63.
const I64_FLOAT_END: f64 = i64::MAX as f64;
/// Exclusive upper bound: `u64::MAX as f64` rounds up to 2^64.
const U64_FLOAT_END: f64 = u64::MAX as f64;

/// Parses a signed integer. Decimal text is accepted and truncated toward zero.
///
/// Numbers outside the `i64` range are rejected rather than saturated.
pub fn to_i64(value: &str) -> Option<i64> {
    if let Ok(number) = value.parse::<i64>() {
        return Some(number);
    }
    let float = value
        .parse::<f64>()
        .ok()
        .filter(|f| (I64_FLOAT_MIN..I64_FLOAT_END).contains(f))?;
    Some(float.trunc() as i64)
}

/// Parses an unsigned integer. Decimal text is accepted and truncated toward zero.
///
/// Negative numbers and numbers outside the `u64` range are rejected.
pub fn to_u64(value: &str) -> Option<u64> {
    if let Ok(number) = value.parse::<u64>() {
        return Some(number);
    }
    let float = value
        .parse::<f64>()
        .ok()
        .filter(|f| (0.0..U64_FLOAT_END).contains(f))?;
    Some(float.trunc() as u64)
}

/// Parses a floating point number.
pub fn to_f64(value: &str) -> Option<f64> {
    value.parse::<f64>().ok()
}

/// Parses a boolean from the lower, upper, or title case forms of `t`/`true` and `f`/`false`, or `1`/`0`.
pub fn to_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Parses a duration such as `300ms`, `5m3s`, `1.5h` or `0`.
///
/// Each component is a decimal number followed by one of `ns`, `us`, `µs`,
/// `ms`, `s`, `m`, `h`. A bare number other than `0` is rejected, as is any
/// negative total.
pub fn to_duration(value: &str) -> Option<Duration> {
    let (negative, mut rest) = match value.as_bytes().first()? {
        b'-' => (true, &value[1..]),
        b'+' => (false, &value[1..]),
        _ => (false, value),
    };
    if rest == "0" {
        return Some(Duration::ZERO);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after_int) = rest.split_at(int_len);
        let (frac_part, after_number) = match after_int.strip_prefix('.') {
            Some(tail) => {
                let frac_len = tail.bytes().take_while(u8::is_ascii_digit).count();
                tail.split_at(frac_len)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }

        let unit_len = after_number
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(after_number.len());
        let (unit, tail) = after_number.split_at(unit_len);
        let scale = match unit {
            "ns" => 1,
            "us" | "\u{b5}s" | "\u{3bc}s" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SECOND,
            "m" => NANOS_PER_MINUTE,
            "h" => NANOS_PER_HOUR,
            _ => return None,
        };

        let whole = if int_part.is_empty() {
            0
        } else {
            int_part.parse::<u128>().ok()?
        };
        let mut component = whole.checked_mul(scale)?;
        let digits = &frac_part[..frac_part.len().min(MAX_FRACTION_DIGITS)];
        if !digits.is_empty() {
            let numerator = digits.parse::<u128>().ok()?;
            let denominator = 10u128.pow(digits.len() as u32);
            component = component.checked_add(numerator * scale / denominator)?;
        }
        total = total.checked_add(component)?;
        rest = tail;
    }

    if negative && total != 0 {
        return None;
    }
    let secs = u64::try_from(total / NANOS_PER_SECOND).ok()?;
    let nanos = (total % NANOS_PER_SECOND) as u32;
    Some(Duration::new(secs, nanos))
}

/// Parses a timestamp in RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or `YYYY-MM-DD` (UTC midnight).
pub fn to_time(value: &str) -> Option<OffsetDateTime> {
    if let Ok(parsed) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(parsed);
    }
    let local_formats = [
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ];
    for format in local_formats {
        if let Ok(parsed) = PrimitiveDateTime::parse(value, format) {
            return Some(parsed.assume_utc());
        }
    }
    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}
