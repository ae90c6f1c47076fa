//! Lightweight image description from pixel statistics alone. This is the
//! fallback path when the neural captioner is disabled or unavailable.

use std::collections::HashMap;

use image::RgbImage;

/// Returned whenever the upload cannot be decoded or analyzed.
pub const GENERIC_CAPTION: &str = "An image with visual content";

/// Describe an image by its dominant color and orientation.
///
/// Total over arbitrary input bytes: decode or analysis failures resolve to
/// [`GENERIC_CAPTION`] instead of an error.
pub fn describe_image(bytes: &[u8]) -> String {
    match try_describe(bytes) {
        Ok(caption) => caption,
        Err(_) => GENERIC_CAPTION.to_string(),
    }
}

fn try_describe(bytes: &[u8]) -> Result<String, image::ImageError> {
    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    let color = match dominant_color(&rgb) {
        Some([r, g, b]) => color_name(r, g, b),
        None => "colorful",
    };
    let orientation = orientation(rgb.width(), rgb.height());
    Ok(format!("A {orientation} image with {color} tones"))
}

/// Most frequent exact RGB value, or `None` for a zero-pixel raster.
fn dominant_color(image: &RgbImage) -> Option<[u8; 3]> {
    let mut histogram: HashMap<[u8; 3], u64> = HashMap::new();
    for pixel in image.pixels() {
        *histogram.entry(pixel.0).or_insert(0) += 1;
    }
    histogram
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(color, _)| color)
}

fn color_name(r: u8, g: u8, b: u8) -> &'static str {
    let (h, s, v) = rgb_to_hsv(r, g, b);
    if s < 0.1 {
        if v > 0.8 {
            "white"
        } else if v < 0.3 {
            "black"
        } else {
            "gray"
        }
    } else {
        hue_name(h)
    }
}

// Breakpoints are exclusive upper bounds: h == 0.17 is yellow, not orange.
fn hue_name(h: f64) -> &'static str {
    if h < 0.08 || h > 0.92 {
        "red"
    } else if h < 0.17 {
        "orange"
    } else if h < 0.25 {
        "yellow"
    } else if h < 0.42 {
        "green"
    } else if h < 0.58 {
        "cyan"
    } else if h < 0.75 {
        "blue"
    } else {
        "purple"
    }
}

/// RGB in [0, 255] to HSV with all three channels normalized to [0, 1].
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = f64::from(r) / 255.0;
    let g = f64::from(g) / 255.0;
    let b = f64::from(b) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let v = max;
    if max == min {
        return (0.0, 0.0, v);
    }
    let delta = max - min;
    let s = delta / max;
    let h = if max == r {
        (g - b) / delta
    } else if max == g {
        2.0 + (b - r) / delta
    } else {
        4.0 + (r - g) / delta
    };
    ((h / 6.0).rem_euclid(1.0), s, v)
}

// Strict inequality: a width of exactly 1.3x the height is still square.
fn orientation(width: u32, height: u32) -> &'static str {
    let w = f64::from(width);
    let h = f64::from(height);
    if w > h * 1.3 {
        "wide"
    } else if h > w * 1.3 {
        "tall"
    } else {
        "square"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid_png(r: u8, g: u8, b: u8, width: u32, height: u32) -> Vec<u8> {
        let image = RgbImage::from_pixel(width, height, Rgb([r, g, b]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[test]
    fn undecodable_bytes_get_the_generic_caption() {
        assert_eq!(describe_image(b"not an image"), GENERIC_CAPTION);
        assert_eq!(describe_image(&[]), GENERIC_CAPTION);
    }

    #[test]
    fn solid_red_square() {
        let png = solid_png(255, 0, 0, 100, 100);
        assert_eq!(describe_image(&png), "A square image with red tones");
    }

    #[test]
    fn solid_white_wide() {
        let png = solid_png(255, 255, 255, 1000, 500);
        assert_eq!(describe_image(&png), "A wide image with white tones");
    }

    #[test]
    fn solid_black_tall() {
        let png = solid_png(0, 0, 0, 300, 1000);
        assert_eq!(describe_image(&png), "A tall image with black tones");
    }

    #[test]
    fn solid_blue_square() {
        let png = solid_png(0, 0, 255, 64, 64);
        assert_eq!(describe_image(&png), "A square image with blue tones");
    }

    #[test]
    fn mid_gray_is_gray() {
        let png = solid_png(128, 128, 128, 64, 64);
        assert_eq!(describe_image(&png), "A square image with gray tones");
    }

    #[test]
    fn orientation_threshold_is_strict() {
        // 130 = 100 * 1.3 exactly: not wide.
        assert_eq!(orientation(130, 100), "square");
        assert_eq!(orientation(131, 100), "wide");
        assert_eq!(orientation(100, 130), "square");
        assert_eq!(orientation(100, 131), "tall");
    }

    #[test]
    fn hue_breakpoints_are_exclusive_upper_bounds() {
        assert_eq!(hue_name(0.0), "red");
        assert_eq!(hue_name(0.08), "orange");
        assert_eq!(hue_name(0.17), "yellow");
        assert_eq!(hue_name(0.25), "green");
        assert_eq!(hue_name(0.42), "cyan");
        assert_eq!(hue_name(0.58), "blue");
        assert_eq!(hue_name(0.75), "purple");
        assert_eq!(hue_name(0.92), "purple");
        assert_eq!(hue_name(0.93), "red");
    }

    #[test]
    fn low_saturation_splits_on_value() {
        assert_eq!(color_name(230, 230, 230), "white");
        assert_eq!(color_name(40, 40, 40), "black");
        assert_eq!(color_name(120, 120, 120), "gray");
    }

    #[test]
    fn zero_pixel_raster_has_no_dominant_color() {
        assert_eq!(dominant_color(&RgbImage::new(0, 0)), None);
    }

    #[test]
    fn dominant_color_wins_by_count() {
        let mut image = RgbImage::from_pixel(4, 4, Rgb([0, 200, 0]));
        image.put_pixel(0, 0, Rgb([200, 0, 0]));
        assert_eq!(dominant_color(&image), Some([0, 200, 0]));
    }
}
