//! Procedural placeholder images
//!
//! Drawn on the CPU so they exist even when no decoder or GPU is available.
//! Output is deterministic: the same size and label give the same pixels.

use image::{Rgba, RgbaImage};

pub const FALLBACK_LABEL: &str = "QR CODE";
pub const NO_PREVIEW_LABEL: &str = "NO PREVIEW";

const GRADIENT_START: [u8; 3] = [0x66, 0x7e, 0xea];
const GRADIENT_END: [u8; 3] = [0x76, 0x4b, 0xa2];
const LABEL_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

/// Square fallback texture used when the code image cannot be loaded.
pub fn fallback_image(size: u32) -> RgbaImage {
    placeholder(size, size, FALLBACK_LABEL)
}

/// Diagonal gradient with a centred label.
pub fn placeholder(width: u32, height: u32, label: &str) -> RgbaImage {
    let width = width.max(1);
    let height = height.max(1);
    let span = (width + height).saturating_sub(2).max(1) as f32;

    let mut image = RgbaImage::from_fn(width, height, |x, y| {
        let t = (x + y) as f32 / span;
        let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgba([
            lerp(GRADIENT_START[0], GRADIENT_END[0]),
            lerp(GRADIENT_START[1], GRADIENT_END[1]),
            lerp(GRADIENT_START[2], GRADIENT_END[2]),
            255,
        ])
    });

    draw_label(&mut image, label);
    image
}

fn draw_label(image: &mut RgbaImage, label: &str) {
    let chars: Vec<char> = label.chars().map(|c| c.to_ascii_uppercase()).collect();
    if chars.is_empty() {
        return;
    }
    let cols = chars.len() as u32 * (GLYPH_WIDTH + 1) - 1;
    let scale = (image.width() * 3 / 5 / cols)
        .min(image.height() / 3 / GLYPH_HEIGHT)
        .max(1);

    let text_width = cols * scale;
    let text_height = GLYPH_HEIGHT * scale;
    let origin_x = image.width().saturating_sub(text_width) / 2;
    let origin_y = image.height().saturating_sub(text_height) / 2;

    for (index, ch) in chars.iter().enumerate() {
        let rows = glyph(*ch);
        let glyph_x = origin_x + index as u32 * (GLYPH_WIDTH + 1) * scale;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let px = glyph_x + col * scale;
                let py = origin_y + row as u32 * scale;
                fill_rect(image, px, py, scale, scale, LABEL_COLOR);
            }
        }
    }
}

fn fill_rect(image: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    for yy in y..(y + h).min(image.height()) {
        for xx in x..(x + w).min(image.width()) {
            image.put_pixel(xx, yy, color);
        }
    }
}

/// 5x7 bitmaps, one byte per row, most significant of the low five bits on the left.
fn glyph(ch: char) -> [u8; 7] {
    match ch {
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'N' => [0b10001, 0b11001, 0b10101, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        _ => [0; 7],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &Rgba<u8>, rgb: [u8; 3]) -> bool {
        (0..3).all(|i| (a.0[i] as i16 - rgb[i] as i16).abs() <= 1)
    }

    #[test]
    fn fallback_has_fixed_size_and_gradient_corners() {
        let image = fallback_image(300);
        assert_eq!(image.dimensions(), (300, 300));
        assert!(close(image.get_pixel(0, 0), GRADIENT_START));
        assert!(close(image.get_pixel(299, 299), GRADIENT_END));
    }

    #[test]
    fn label_is_drawn_in_the_middle() {
        let image = fallback_image(300);
        let white = image
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == LABEL_COLOR)
            .collect::<Vec<_>>();
        assert!(!white.is_empty());
        for (x, y, _) in white {
            assert!((40..260).contains(&x), "x={x}");
            assert!((100..200).contains(&y), "y={y}");
        }
    }

    #[test]
    fn placeholder_is_deterministic() {
        let a = placeholder(64, 48, NO_PREVIEW_LABEL);
        let b = placeholder(64, 48, NO_PREVIEW_LABEL);
        assert_eq!(a, b);
        assert_ne!(a, placeholder(64, 48, FALLBACK_LABEL));
    }

    #[test]
    fn tiny_sizes_do_not_panic() {
        assert_eq!(placeholder(0, 0, "QR").dimensions(), (1, 1));
        assert_eq!(placeholder(3, 2, FALLBACK_LABEL).dimensions(), (3, 2));
    }
}
