//! Conversion of `f64` values to 32-bit rationals.
//!
//! RATIONAL and SRATIONAL entries store a numerator and denominator of 32
//! bits each. Arbitrary doubles are approximated with a continued fraction
//! expansion (Euclid's algorithm on a scaled integer form), run twice with
//! different precision ceilings, keeping whichever result reproduces the
//! input more closely.

const MAX_ITERATIONS: usize = 64;

/// Continued fraction approximation of a positive, finite, non-integer
/// `value`.
///
/// `signed_range` caps the denominator at `i32::MAX` instead of
/// `u32::MAX`. `small_range` caps the scaled integer form near `2^31`
/// instead of `2^63`; the low ceiling loses precision for large inputs
/// but avoids quantization drift for small ones, so callers run both and
/// compare.
fn to_rational_euclidean_gcd(value: f64, signed_range: bool, small_range: bool) -> (u64, u64) {
    let n_max: u64 = if small_range {
        (i32::MAX as u64 - 1) / 2
    } else {
        (i64::MAX as u64 - 1) / 2
    };
    let f_max = n_max as f64;
    let max_denom: u64 = if signed_range { 0x7FFF_FFFF } else { 0xFFFF_FFFF };
    let return_limit = max_denom;

    // Scale by powers of two until the fractional part is gone or the
    // ceiling is reached, giving an exact integer ratio to reduce.
    let mut scaled = value;
    let mut big_denom: u64 = 1;
    while scaled != scaled.floor() && scaled < f_max && big_denom < n_max {
        big_denom <<= 1;
        scaled *= 2.0;
    }
    let mut big_num = scaled as u64;

    // Convergents are built incrementally from the Euclidean quotients.
    // num_sum and denom_sum hold the previous, current and next values.
    let mut num_sum: [u64; 3] = [0, 1, 0];
    let mut denom_sum: [u64; 3] = [1, 0, 0];

    let mut i = 0;
    while i < MAX_ITERATIONS {
        if big_denom == 0 {
            break;
        }
        let quotient = big_num / big_denom;
        let remainder = big_num % big_denom;
        big_num = big_denom;
        big_denom = remainder;

        let mut step = quotient;
        if denom_sum[1]
            .saturating_mul(quotient)
            .saturating_add(denom_sum[0])
            >= max_denom
        {
            // The next convergent would overshoot the denominator cap.
            // Either take a clamped final step or stop at the current
            // convergent, whichever loses less.
            step = (max_denom - denom_sum[0]) / denom_sum[1];
            if step * 2 >= quotient || denom_sum[1] >= max_denom {
                i = MAX_ITERATIONS + 1;
            } else {
                break;
            }
        }

        num_sum[2] = step.saturating_mul(num_sum[1]).saturating_add(num_sum[0]);
        num_sum[0] = num_sum[1];
        num_sum[1] = num_sum[2];
        denom_sum[2] = step
            .saturating_mul(denom_sum[1])
            .saturating_add(denom_sum[0]);
        denom_sum[0] = denom_sum[1];
        denom_sum[1] = denom_sum[2];
        i += 1;
    }

    while num_sum[1] > return_limit || denom_sum[1] > return_limit {
        num_sum[1] /= 2;
        denom_sum[1] /= 2;
    }
    (num_sum[1], denom_sum[1])
}

fn closer_of(value: f64, a: (u64, u64), b: (u64, u64)) -> (u64, u64) {
    let err_a = (value - a.0 as f64 / a.1 as f64).abs();
    let err_b = (value - b.0 as f64 / b.1 as f64).abs();
    if err_a < err_b {
        a
    } else {
        b
    }
}

/// Approximates `value` as an unsigned rational.
///
/// NaN and negative inputs are reported and mapped to the `0/0`
/// sentinel; the surrounding directory write continues. Values above
/// `u32::MAX` become `MAX/0`, values too small to represent become
/// `0/MAX`, and exact integers short-circuit to `value/1`.
pub fn to_unsigned_rational(value: f64) -> (u32, u32) {
    if !(value >= 0.0) {
        log::error!("negative or NaN value {} written as unsigned rational 0/0", value);
        return (0, 0);
    }
    if value > u32::MAX as f64 {
        return (u32::MAX, 0);
    }
    if value == (value as u32) as f64 {
        return (value as u32, 1);
    }
    if value < 1.0 / u32::MAX as f64 {
        return (0, u32::MAX);
    }

    let wide = to_rational_euclidean_gcd(value, false, false);
    let narrow = to_rational_euclidean_gcd(value, false, true);
    let (num, denom) = closer_of(value, wide, narrow);
    (num as u32, denom as u32)
}

/// Approximates `value` as a signed rational. The sign travels on the
/// numerator; the magnitude is approximated like the unsigned case with
/// `i32` ceilings.
pub fn to_signed_rational(value: f64) -> (i32, i32) {
    let negative = value < 0.0;
    let magnitude = if negative { -value } else { value };

    if magnitude > i32::MAX as f64 {
        return (i32::MAX, 0);
    }
    if magnitude == (magnitude as i32) as f64 {
        let num = magnitude as i32;
        return (if negative { -num } else { num }, 1);
    }
    if magnitude < 1.0 / i32::MAX as f64 {
        return (0, i32::MAX);
    }

    let wide = to_rational_euclidean_gcd(magnitude, true, false);
    let narrow = to_rational_euclidean_gcd(magnitude, true, true);
    let (num, denom) = closer_of(magnitude, wide, narrow);
    let num = num as i32;
    (if negative { -num } else { num }, denom as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_integers() {
        assert_eq!(to_unsigned_rational(0.0), (0, 1));
        assert_eq!(to_unsigned_rational(300.0), (300, 1));
        assert_eq!(to_unsigned_rational(u32::MAX as f64), (u32::MAX, 1));
        assert_eq!(to_signed_rational(-72.0), (-72, 1));
    }

    #[test]
    fn simple_fractions() {
        assert_eq!(to_unsigned_rational(0.5), (1, 2));
        assert_eq!(to_unsigned_rational(0.25), (1, 4));
        assert_eq!(to_signed_rational(-2.5), (-5, 2));
    }

    #[test]
    fn sentinels() {
        assert_eq!(to_unsigned_rational(f64::NAN), (0, 0));
        assert_eq!(to_unsigned_rational(-1.5), (0, 0));
        assert_eq!(to_unsigned_rational(5e9), (u32::MAX, 0));
        assert_eq!(to_unsigned_rational(1e-12), (0, u32::MAX));
        assert_eq!(to_signed_rational(5e9), (i32::MAX, 0));
        assert_eq!(to_signed_rational(-5e9), (i32::MAX, 0));
        assert_eq!(to_signed_rational(1e-12), (0, i32::MAX));
    }

    #[test]
    fn signed_nan_degrades_to_zero() {
        assert_eq!(to_signed_rational(f64::NAN), (0, 1));
    }

    #[test]
    fn approximation_error_is_small() {
        for &value in &[1.0 / 3.0, 2.0 / 7.0, 3.141592653589793, 29.97, 1234.5678] {
            let (num, denom) = to_unsigned_rational(value);
            assert_ne!(denom, 0);
            let err = (value - num as f64 / denom as f64).abs();
            assert!(err < 1e-6, "{} approximated as {}/{}", value, num, denom);
        }
    }

    #[test]
    fn signed_approximation_keeps_sign() {
        let (num, denom) = to_signed_rational(-29.97);
        assert!(num < 0 && denom > 0);
        let err = (-29.97 - num as f64 / denom as f64).abs();
        assert!(err < 1e-6);
    }
}
