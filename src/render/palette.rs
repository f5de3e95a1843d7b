use plotters::style::RGBColor;

/// Default trace colours of the dashboard, in trace order.
pub const TRACE_COLORS: [&str; 3] = ["#636EFA", "#EF553B", "#00CC96"];

pub const FLOW_TEMP: &str = "#C21806";
pub const RETURN_TEMP: &str = "#0F52BA";
pub const DAILY_BAR: &str = "#4CBB17";

/// Stops of the Plasma colour scale, evenly spaced from 0 to 1.
const PLASMA: [&str; 10] = [
    "#0d0887", "#46039f", "#7201a8", "#9c179e", "#bd3786", "#d8576b", "#ed7953", "#fb9f3a",
    "#fdca26", "#f0f921",
];

/// Parses `#rrggbb`. Anything else maps to black.
pub fn hex(code: &str) -> RGBColor {
    let digits = code.trim_start_matches('#');
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .unwrap_or(0)
    };
    if digits.len() != 6 {
        return RGBColor(0, 0, 0);
    }
    RGBColor(channel(0), channel(2), channel(4))
}

/// Colour of `value` on the Plasma scale spanning `[min, max]`.
///
/// Values outside the range are clamped; a degenerate range maps everything
/// to the lowest stop.
pub fn plasma(value: f64, min: f64, max: f64) -> RGBColor {
    let span = max - min;
    let t = if span > 0.0 && value.is_finite() {
        ((value - min) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let scaled = t * (PLASMA.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(PLASMA.len() - 1);
    let frac = scaled - lower as f64;

    let (a, b) = (hex(PLASMA[lower]), hex(PLASMA[upper]));
    let lerp = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * frac).round() as u8;
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_codes() {
        assert_eq!(hex("#4CBB17"), RGBColor(0x4c, 0xbb, 0x17));
        assert_eq!(hex("0f52ba"), RGBColor(0x0f, 0x52, 0xba));
        assert_eq!(hex("#abc"), RGBColor(0, 0, 0));
    }

    #[test]
    fn plasma_endpoints_and_clamping() {
        assert_eq!(plasma(0.0, 0.0, 10.0), hex("#0d0887"));
        assert_eq!(plasma(10.0, 0.0, 10.0), hex("#f0f921"));
        assert_eq!(plasma(-5.0, 0.0, 10.0), hex("#0d0887"));
        assert_eq!(plasma(50.0, 0.0, 10.0), hex("#f0f921"));
        assert_eq!(plasma(3.0, 0.0, 0.0), hex("#0d0887"));
    }
}
