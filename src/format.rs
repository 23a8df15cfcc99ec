//! Normalisation of rendered variable values into the wire format.

/// Round a rendered value to a fixed number of fractional digits.
///
/// Only strings of the shape `[-]digits.digits` (exactly one decimal point,
/// digits on both sides) are rewritten; everything else — integers, text,
/// multi-dot strings — is returned verbatim. Rounding is half-up, away from
/// zero, and the result always carries exactly `precision` fractional digits.
///
/// This never fails: a value that cannot be parsed is passed through
/// unchanged and sent to the collector as-is.
pub fn round_float(value: &str, precision: usize) -> String {
    if !is_simple_decimal(value) {
        return value.to_string();
    }

    let parsed: f64 = match value.parse() {
        Ok(f) => f,
        Err(_) => return value.to_string(),
    };

    let factor = 10f64.powi(precision as i32);
    let rounded = (parsed * factor).round() / factor;

    format!("{rounded:.precision$}")
}

/// Check for the `[-]digits.digits` shape with exactly one decimal point.
fn is_simple_decimal(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);

    let Some((mantissa, fraction)) = unsigned.split_once('.') else {
        return false;
    };

    !mantissa.is_empty()
        && !fraction.is_empty()
        && mantissa.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}
