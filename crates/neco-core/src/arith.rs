//! Integer and float arithmetic shared by the constant folder and the VM.
//!
//! Both sides must agree bit for bit, otherwise a folded expression would
//! print something different from the same expression computed at runtime.

/// Integer division. `None` on a zero divisor. Wraps on `i64::MIN / -1`.
#[inline]
pub fn int_div(a: i64, b: i64) -> Option<i64> {
    (b != 0).then(|| a.wrapping_div(b))
}

/// Integer remainder with the sign of the dividend. `None` on a zero divisor.
#[inline]
pub fn int_rem(a: i64, b: i64) -> Option<i64> {
    (b != 0).then(|| a.wrapping_rem(b))
}

/// Integer power. Non-negative exponents wrap; negative exponents truncate
/// the float result toward zero.
pub fn int_pow(base: i64, exp: i64) -> i64 {
    if exp >= 0 {
        base.wrapping_pow(u32::try_from(exp).unwrap_or(u32::MAX))
    } else {
        (base as f64).powf(exp as f64) as i64
    }
}

/// Format a float the way scripts print it: always with a fractional part
/// or exponent, so `2.0` never prints as `2`.
pub fn format_float(value: f64) -> String {
    format!("{value:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_by_zero_is_none() {
        assert_eq!(int_div(1, 0), None);
        assert_eq!(int_rem(1, 0), None);
        assert_eq!(int_div(7, 2), Some(3));
        assert_eq!(int_div(-7, 2), Some(-3));
        assert_eq!(int_rem(-7, 2), Some(-1));
    }

    #[test]
    fn min_over_minus_one_wraps() {
        assert_eq!(int_div(i64::MIN, -1), Some(i64::MIN));
    }

    #[test]
    fn powers() {
        assert_eq!(int_pow(2, 10), 1024);
        assert_eq!(int_pow(2, -1), 0);
        assert_eq!(int_pow(1, -5), 1);
        assert_eq!(int_pow(3, 0), 1);
    }

    #[test]
    fn floats_keep_their_point() {
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(0.5), "0.5");
    }
}
