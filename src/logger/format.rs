//! Fixed-width decimal and timestamp rendering for track points.

use crate::fix::FixTime;

/// Render `value` right-aligned into a field of at least `width` characters
/// with exactly `precision` fraction digits, then strip the leading padding.
/// The result is the shortest left-trimmed text that still carries the
/// requested fraction digits.
pub fn format_scalar(value: f64, width: usize, precision: usize) -> String {
    let rendered = format!("{value:>width$.precision$}");
    rendered.trim_start_matches([' ', '\t']).to_string()
}

/// `YYYY-MM-DDThh:mm:ss.cccZ` with the configured hour offset applied.
///
/// The offset is added to the hour field only: no carry into the date and no
/// wrap at 24, so fixes near local midnight render an out-of-range hour. The
/// trailing three-digit field is the raw centisecond count, unscaled.
pub fn format_timestamp(time: &FixTime, offset_hours: i32) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        time.year,
        time.month,
        time.day,
        time.hour as i32 + offset_hours,
        time.minute,
        time.second,
        time.centisecond,
    )
}
