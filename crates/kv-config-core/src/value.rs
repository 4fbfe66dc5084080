//! Target kinds for the single typed-lookup path.
//!
//! Every accessor on [`crate::source::SourceExt`] funnels into
//! `get::<T: ConfigValue>`, so adding a scalar kind only means adding a
//! `ConfigValue` impl here. Integer widths share the widest parser and are
//! narrowed with a two's-complement cast: `"1234"` read as `i8` is `-46` and
//! as `u8` is `210`, not a parse failure.

use std::time::Duration;

use time::OffsetDateTime;

use crate::coerce;

/// A scalar kind that can be produced from a trimmed raw store value.
pub trait ConfigValue: Sized {
    /// Parses a trimmed raw value, returning `None` when it does not fit the kind.
    fn from_raw(raw: &str) -> Option<Self>;
}

impl ConfigValue for String {
    fn from_raw(raw: &str) -> Option<Self> {
        Some(raw.to_owned())
    }
}

impl ConfigValue for Vec<String> {
    fn from_raw(raw: &str) -> Option<Self> {
        coerce::to_string_slice(raw)
    }
}

macro_rules! narrowed_from {
    ($parse:path => $($target:ty),+ $(,)?) => {
        $(
            impl ConfigValue for $target {
                fn from_raw(raw: &str) -> Option<Self> {
                    // Truncating cast: overflow keeps the low bits.
                    $parse(raw).map(|wide| wide as $target)
                }
            }
        )+
    };
}

narrowed_from!(coerce::to_i64 => i8, i16, i32, i64, isize);
narrowed_from!(coerce::to_u64 => u8, u16, u32, u64, usize);

impl ConfigValue for f64 {
    fn from_raw(raw: &str) -> Option<Self> {
        coerce::to_f64(raw)
    }
}

impl ConfigValue for f32 {
    fn from_raw(raw: &str) -> Option<Self> {
        coerce::to_f64(raw).map(|wide| wide as f32)
    }
}

impl ConfigValue for bool {
    fn from_raw(raw: &str) -> Option<Self> {
        coerce::to_bool(raw)
    }
}

impl ConfigValue for Duration {
    fn from_raw(raw: &str) -> Option<Self> {
        coerce::to_duration(raw)
    }
}

impl ConfigValue for OffsetDateTime {
    fn from_raw(raw: &str) -> Option<Self> {
        coerce::to_time(raw)
    }
}
