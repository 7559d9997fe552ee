//! Numeric utilities: centralized integer conversions.
//!
//! - Fallible conversions (returning `Option<T>`) where an out-of-range value should stop the operation, e.g. a negative `$limit`.
//! - Saturating conversions where clamping is acceptable, e.g. elapsed time in log lines.

#[inline]
#[must_use]
pub fn i64_to_usize(v: i64) -> Option<usize> {
    usize::try_from(v).ok()
}

#[inline]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[inline]
#[must_use]
pub fn u128_to_u64_saturating(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

/// Integral value of a BSON number, if it has one (`5.0` counts, `5.5` does not).
#[must_use]
pub fn bson_as_i64(v: &bson::Bson) -> Option<i64> {
    match v {
        bson::Bson::Int32(i) => Some(i64::from(*i)),
        bson::Bson::Int64(i) => Some(*i),
        #[allow(clippy::cast_possible_truncation)]
        bson::Bson::Double(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i64_to_usize_rejects_negative() {
        assert_eq!(i64_to_usize(5), Some(5));
        assert_eq!(i64_to_usize(-1), None);
    }

    #[test]
    fn u128_to_u64_saturating_edges() {
        assert_eq!(u128_to_u64_saturating(0), 0);
        assert_eq!(u128_to_u64_saturating(u128::from(u64::MAX)), u64::MAX);
        assert_eq!(u128_to_u64_saturating(u128::MAX), u64::MAX);
    }

    #[test]
    fn bson_integral_values() {
        assert_eq!(bson_as_i64(&bson::Bson::Double(5.0)), Some(5));
        assert_eq!(bson_as_i64(&bson::Bson::Double(5.5)), None);
        assert_eq!(bson_as_i64(&bson::Bson::Int32(-2)), Some(-2));
        assert_eq!(bson_as_i64(&bson::Bson::String("5".into())), None);
    }
}
