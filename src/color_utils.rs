//! Color utility functions for label colors.
//!
//! Label colors are `#RRGGBB` strings. Generated colors stay inside a
//! brightness band so box outlines, handles and label text remain readable.

use rand::Rng;

use crate::constants::{CONTRAST_THRESHOLD, MAX_LABEL_BRIGHTNESS, MIN_LABEL_BRIGHTNESS};

/// Text color used on light label backgrounds.
pub const BLACK: &str = "#000000";

/// Text color used on dark label backgrounds.
pub const WHITE: &str = "#FFFFFF";

/// Perceptual (YIQ) brightness of an RGB triple, in the range 0-255.
pub fn brightness(rgb: [u8; 3]) -> f64 {
    let [r, g, b] = rgb;
    (f64::from(r) * 299.0 + f64::from(g) * 587.0 + f64::from(b) * 114.0) / 1000.0
}

/// Parse a `#RRGGBB` (or `RRGGBB`) string.
pub fn parse_hex(color: &str) -> Option<[u8; 3]> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Format an RGB triple as an uppercase `#RRGGBB` string.
pub fn to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

/// Draw random colors until one falls inside the readable brightness band.
pub fn random_label_color() -> String {
    random_label_color_with(&mut rand::thread_rng())
}

/// [`random_label_color`] with a caller-provided RNG.
pub fn random_label_color_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    loop {
        let rgb = [
            rng.gen_range(0..=255u8),
            rng.gen_range(0..=255u8),
            rng.gen_range(0..=255u8),
        ];
        let b = brightness(rgb);
        if (MIN_LABEL_BRIGHTNESS..=MAX_LABEL_BRIGHTNESS).contains(&b) {
            return to_hex(rgb);
        }
    }
}

/// Pick black or white text for the given label color.
///
/// Malformed color strings get black.
pub fn contrast_text_color(color: &str) -> &'static str {
    match parse_hex(color) {
        Some(rgb) if brightness(rgb) < CONTRAST_THRESHOLD => WHITE,
        _ => BLACK,
    }
}
