use crate::utils::constants::TEMPERATURE_DECIMAL_PLACES;

/// Round `value` to `places` decimals, half-up (away from zero).
///
/// Rounding works on the shortest decimal text of the value rather than on
/// its binary expansion, so `2.0005` rounds to `2.001` even though the
/// nearest double is slightly below the midpoint. Non-finite values are
/// returned unchanged.
pub fn round_half_up(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }

    // f64 Display never uses exponent notation
    let text = value.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let places_usize = places as usize;

    if frac_part.len() <= places_usize {
        return value;
    }

    let kept = format!("{}{}", int_part, &frac_part[..places_usize]);
    let round_up = frac_part.as_bytes()[places_usize] >= b'5';

    let scaled = match kept.parse::<i128>() {
        Ok(n) => n + i128::from(round_up),
        Err(_) => {
            let factor = 10f64.powi(places as i32);
            return (value * factor).round() / factor;
        }
    };

    let sign = if value.is_sign_negative() { "-" } else { "" };
    format!("{}{}e-{}", sign, scaled, places)
        .parse::<f64>()
        .unwrap_or(value)
}

/// Round a temperature measurement to the stored precision
pub fn round_temperature(value: f64) -> f64 {
    round_half_up(value, TEMPERATURE_DECIMAL_PLACES)
}

/// Number of digits after the decimal point in the shortest text of `value`
pub fn decimal_places(value: f64) -> usize {
    value
        .to_string()
        .split_once('.')
        .map(|(_, frac)| frac.len())
        .unwrap_or(0)
}
