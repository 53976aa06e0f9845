pub const KIB: f64 = 1024.0;
pub const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Round to `places` decimals. Non-finite input becomes 0.
pub fn round_to(value: f64, places: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(places);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() { rounded } else { 0.0 }
}

pub fn bytes_to_gib(bytes: u64) -> f64 {
    round_to(bytes as f64 / GIB, 2)
}

/// `part / whole * 100`, rounded to 1 decimal; an empty whole gives 0.
pub fn percent_of(part: u64, whole: u64) -> f32 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 1) as f32
}
