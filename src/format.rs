//! Display formatting for engine outputs.

/// Anything slower than this shows [`LONG_ETA_MARKER`] instead of a duration.
pub const LONG_ETA_SECONDS: f64 = 3.154e7 * 10.0;
pub const LONG_ETA_MARKER: &str = "...";

/// Format a number with thousands separators (e.g. 1234567 → "1,234,567").
/// A fractional part above .05 is kept to one decimal.
pub fn format_number(n: f64) -> String {
    if n < 0.0 {
        return format!("-{}", format_number(-n));
    }
    let int_part = n.floor() as u64;
    let frac = n - int_part as f64;

    let s = int_part.to_string();
    let mut grouped = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let tenths = (frac * 10.0).round() as u8;
    if frac > 0.05 && tenths < 10 {
        format!("{}.{}", grouped, tenths)
    } else {
        grouped
    }
}

/// Currency as shown to the player: floored, grouped.
pub fn format_currency(currency: f64) -> String {
    format_number(currency.max(0.0).floor())
}

/// Rate with one decimal place.
pub fn format_rate(rate: f64) -> String {
    format!("{:.1}", rate)
}

/// Banded duration: "Ns", "Mm Ss", "Hh Mm", "Dd Hh".
/// The smaller unit is rounded up and carries into the larger one, so a band
/// never shows "60s" or "60m". Absurdly long or infinite durations show a marker.
pub fn format_eta(seconds: f64) -> String {
    if !seconds.is_finite() || seconds > LONG_ETA_SECONDS {
        return LONG_ETA_MARKER.to_string();
    }
    let seconds = if seconds > 0.0 { seconds } else { 0.0 };

    let total_seconds = seconds.ceil() as u64;
    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }
    if total_seconds < 3_600 {
        return format!("{}m {}s", total_seconds / 60, total_seconds % 60);
    }
    let total_minutes = (seconds / 60.0).ceil() as u64;
    if total_minutes < 1_440 {
        return format!("{}h {}m", total_minutes / 60, total_minutes % 60);
    }
    let total_hours = (seconds / 3_600.0).ceil() as u64;
    format!("{}d {}h", total_hours / 24, total_hours % 24)
}
