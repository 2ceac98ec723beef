use palette::{Hsl, IntoColor, Lab, Mix, Srgb};
use plotters::style::RGBColor;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues, starting
/// from a muted blue.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = 215.0 + (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.55, 0.52);
            to_rgb(hsl.into_color())
        })
        .collect()
}

/// Series colours for the two survival groups: `[did not survive, survived]`.
pub fn outcome_colors() -> [RGBColor; 2] {
    let palette = generate_palette(2);
    [palette[0], palette[1]]
}

fn to_rgb(rgb: Srgb) -> RGBColor {
    let rgb: Srgb<u8> = rgb.into_format();
    RGBColor(rgb.red, rgb.green, rgb.blue)
}

// ---------------------------------------------------------------------------
// Diverging colour map for correlation heat grids
// ---------------------------------------------------------------------------

const COOL: (u8, u8, u8) = (59, 76, 192);
const NEUTRAL: (u8, u8, u8) = (221, 221, 221);
const WARM: (u8, u8, u8) = (180, 4, 38);

fn lab(rgb: (u8, u8, u8)) -> Lab {
    Srgb::new(rgb.0, rgb.1, rgb.2).into_format::<f32>().into_color()
}

/// Blue → grey → red for `value` in `[-1, 1]`, interpolated in CIE Lab.
/// Values outside the range are clamped; `NaN` maps to the neutral grey.
pub fn coolwarm(value: f64) -> RGBColor {
    if value.is_nan() {
        return RGBColor(NEUTRAL.0, NEUTRAL.1, NEUTRAL.2);
    }
    let v = value.clamp(-1.0, 1.0) as f32;
    let mixed = if v < 0.0 {
        lab(NEUTRAL).mix(lab(COOL), -v)
    } else {
        lab(NEUTRAL).mix(lab(WARM), v)
    };
    to_rgb(mixed.into_color())
}

const DARK_TEXT: RGBColor = RGBColor(0, 0, 0);
const LIGHT_TEXT: RGBColor = RGBColor(255, 255, 255);

/// Black or white, whichever reads better on `background`.
pub fn text_color_for(background: RGBColor) -> &'static RGBColor {
    let RGBColor(r, g, b) = background;
    let luma = 0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b);
    if luma > 140.0 {
        &DARK_TEXT
    } else {
        &LIGHT_TEXT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_sizes() {
        assert!(generate_palette(0).is_empty());
        let p = generate_palette(3);
        assert_eq!(p.len(), 3);
        assert_ne!(p[0], p[1]);
        assert_ne!(p[1], p[2]);
    }

    #[test]
    fn coolwarm_endpoints() {
        assert_eq!(coolwarm(f64::NAN), RGBColor(221, 221, 221));
        let cold = coolwarm(-1.0);
        let hot = coolwarm(1.0);
        assert!(cold.2 > cold.0, "negative end is blue: {cold:?}");
        assert!(hot.0 > hot.2, "positive end is red: {hot:?}");
        assert_eq!(coolwarm(5.0), hot);
    }

    #[test]
    fn annotation_contrast() {
        assert_eq!(*text_color_for(RGBColor(250, 250, 250)), RGBColor(0, 0, 0));
        assert_eq!(*text_color_for(RGBColor(20, 20, 80)), RGBColor(255, 255, 255));
    }
}
