//! HSV color-band test shared by both classification backends.
//!
//! A cropped "helmet zone" passes when any one of three fixed bands (yellow,
//! white, orange) covers strictly more than the configured fraction of the
//! zone. Hue is expressed on the 0..180 scale and saturation/value on 0..255,
//! the same 8-bit encoding the band constants were originally tuned against.

use crate::frame::{Frame, Region};

/// Inclusive HSV range, `[h, s, v]` per bound.
#[derive(Clone, Copy, Debug)]
pub struct HsvBand {
    pub name: &'static str,
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvBand {
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }
}

/// Color bands for common protective-helmet shades.
pub const HELMET_BANDS: [HsvBand; 3] = [
    HsvBand {
        name: "yellow",
        lower: [20, 100, 100],
        upper: [30, 255, 255],
    },
    HsvBand {
        name: "white",
        lower: [0, 0, 200],
        upper: [180, 30, 255],
    },
    HsvBand {
        name: "orange",
        lower: [10, 100, 100],
        upper: [25, 255, 255],
    },
];

/// RGB to 8-bit HSV with hue halved into 0..180.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb;
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = v - min;
    if delta == 0 {
        return [0, 0, v];
    }

    let s = ((255.0 * f32::from(delta)) / f32::from(v)).round() as u8;

    let delta_f = f32::from(delta);
    let hue_deg = if v == r {
        let mut h = 60.0 * (f32::from(g) - f32::from(b)) / delta_f;
        if h < 0.0 {
            h += 360.0;
        }
        h
    } else if v == g {
        120.0 + 60.0 * (f32::from(b) - f32::from(r)) / delta_f
    } else {
        240.0 + 60.0 * (f32::from(r) - f32::from(g)) / delta_f
    };

    [(hue_deg / 2.0) as u8, s, v]
}

/// Fraction of `region` pixels that fall inside `band`.
///
/// The caller is expected to pass a region already clamped to the frame.
pub fn band_coverage(frame: &Frame, region: Region, band: &HsvBand) -> f64 {
    let total = region.area();
    if total == 0 {
        return 0.0;
    }
    let mut inside = 0i64;
    for y in region.y..region.bottom() {
        for x in region.x..region.right() {
            let hsv = rgb_to_hsv(frame.pixel(x as u32, y as u32));
            if band.contains(hsv) {
                inside += 1;
            }
        }
    }
    inside as f64 / total as f64
}

/// True when any helmet band covers strictly more than `min_coverage` of the
/// region. Exactly at the threshold is a miss.
pub fn region_has_helmet_color(frame: &Frame, region: Region, min_coverage: f64) -> bool {
    if region.area() == 0 {
        return false;
    }
    HELMET_BANDS
        .iter()
        .any(|band| band_coverage(frame, region, band) > min_coverage)
}

#[cfg(test)]
mod tests {
    use super::*;

    const YELLOW: [u8; 3] = [255, 220, 0];
    const GRAY: [u8; 3] = [90, 90, 90];

    #[test]
    fn hsv_conversion_matches_reference_values() {
        // Pure red: hue 0, full saturation and value.
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        // Pure green: 120 degrees halves to 60.
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        // Pure blue: 240 degrees halves to 120.
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        // Achromatic pixels keep hue and saturation at zero.
        assert_eq!(rgb_to_hsv([200, 200, 200]), [0, 0, 200]);
    }

    #[test]
    fn helmet_yellow_lands_in_yellow_band() {
        let hsv = rgb_to_hsv(YELLOW);
        assert!(HELMET_BANDS[0].contains(hsv), "hsv was {:?}", hsv);
    }

    #[test]
    fn bright_white_lands_in_white_band() {
        let hsv = rgb_to_hsv([250, 250, 250]);
        assert!(HELMET_BANDS[1].contains(hsv));
    }

    #[test]
    fn dull_gray_matches_no_band() {
        let hsv = rgb_to_hsv(GRAY);
        assert!(!HELMET_BANDS.iter().any(|band| band.contains(hsv)));
    }

    /// Frame whose first `yellow_pixels` pixels (row-major) are helmet
    /// yellow and the rest dull gray.
    fn mixed_frame(width: u32, height: u32, yellow_pixels: u32) -> Frame {
        let mut frame = Frame::filled(width, height, GRAY);
        for i in 0..yellow_pixels {
            let (x, y) = (i % width, i / width);
            frame.image_mut().get_pixel_mut(x, y).0 = YELLOW;
        }
        frame
    }

    #[test]
    fn coverage_counts_band_pixels() {
        let frame = mixed_frame(10, 10, 40);
        let region = Region::new(0, 0, 10, 10);
        let coverage = band_coverage(&frame, region, &HELMET_BANDS[0]);
        assert!((coverage - 0.4).abs() < 1e-9);
    }

    #[test]
    fn coverage_threshold_is_exclusive() {
        // 100 pixels, threshold 0.30: exactly 30 yellow pixels must miss,
        // 31 must hit.
        let region = Region::new(0, 0, 10, 10);

        let at_threshold = mixed_frame(10, 10, 30);
        assert!(!region_has_helmet_color(&at_threshold, region, 0.30));

        let over_threshold = mixed_frame(10, 10, 31);
        assert!(region_has_helmet_color(&over_threshold, region, 0.30));
    }

    #[test]
    fn fully_yellow_region_passes() {
        let frame = Frame::filled(8, 8, YELLOW);
        assert!(region_has_helmet_color(&frame, Region::new(0, 0, 8, 8), 0.30));
    }

    #[test]
    fn zero_area_region_never_passes() {
        let frame = Frame::filled(8, 8, YELLOW);
        assert!(!region_has_helmet_color(&frame, Region::new(0, 0, 0, 8), 0.30));
    }
}
