use crate::{
    BoothError, BoothResult,
    filter::{Blend, ColorOp, FilterPipeline, Overlay},
};

/// Apply `pipeline` in place to a straight-alpha RGBA8 buffer of `width x height`.
///
/// Color ops run first, in order, each clamped to `[0, 1]`; overlays follow in order. Alpha is
/// left untouched.
pub fn apply_filter_rgba8(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    pipeline: &FilterPipeline,
) -> BoothResult<()> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| BoothError::render("filter buffer size overflow"))?;
    if pixels.len() != expected_len {
        return Err(BoothError::render(
            "apply_filter_rgba8 expects pixels matching width*height*4",
        ));
    }
    if pipeline.is_identity() || expected_len == 0 {
        return Ok(());
    }

    if !pipeline.color.is_empty() {
        apply_color_ops(pixels, &pipeline.color);
    }
    for overlay in &pipeline.overlays {
        match *overlay {
            Overlay::Border { rgb, side, bottom } => {
                border(pixels, width, height, rgb, side, bottom);
            }
            Overlay::Vignette {
                rgb,
                blend,
                start,
                max_alpha,
            } => vignette(pixels, width, height, rgb, blend, start, max_alpha),
            Overlay::Grain {
                opacity,
                cell,
                seed,
            } => grain(pixels, width, height, opacity, cell, seed),
            Overlay::Tint { rgb, alpha, blend } => {
                let o = rgb_to_unit(rgb);
                for px in pixels.chunks_exact_mut(4) {
                    blend_px(px, o, alpha, blend);
                }
            }
        }
    }
    Ok(())
}

fn apply_color_ops(pixels: &mut [u8], ops: &[ColorOp]) {
    let matrices: Vec<_> = ops.iter().map(|op| op.matrix()).collect();
    for px in pixels.chunks_exact_mut(4) {
        let mut c = [unit(px[0]), unit(px[1]), unit(px[2])];
        for m in &matrices {
            c = m.apply(c).map(|v| v.clamp(0.0, 1.0));
        }
        store(px, c);
    }
}

fn border(pixels: &mut [u8], width: u32, height: u32, rgb: [u8; 3], side: f32, bottom: f32) {
    let side_px = ((side * width as f32).round() as u32).min(width);
    let bottom_px = ((bottom * height as f32).round() as u32).min(height);
    let top_px = side_px.min(height);

    for y in 0..height {
        let row_is_border = y < top_px || y >= height.saturating_sub(bottom_px);
        for x in 0..width {
            if row_is_border || x < side_px || x >= width.saturating_sub(side_px) {
                let idx = ((y * width + x) as usize) * 4;
                pixels[idx..idx + 3].copy_from_slice(&rgb);
            }
        }
    }
}

fn vignette(
    pixels: &mut [u8],
    width: u32,
    height: u32,
    rgb: [u8; 3],
    blend: Blend,
    start: f32,
    max_alpha: f32,
) {
    let o = rgb_to_unit(rgb);
    let half_w = width as f32 / 2.0;
    let half_h = height as f32 / 2.0;
    let span = (1.0 - start).max(f32::EPSILON);

    for y in 0..height {
        let ny = (y as f32 + 0.5 - half_h) / half_h;
        for x in 0..width {
            let nx = (x as f32 + 0.5 - half_w) / half_w;
            // Farthest-corner ellipse: the corners sit at d == 1.
            let d = (nx * nx + ny * ny).sqrt() / std::f32::consts::SQRT_2;
            let t = ((d - start) / span).clamp(0.0, 1.0);
            if t <= 0.0 {
                continue;
            }
            let idx = ((y * width + x) as usize) * 4;
            blend_px(&mut pixels[idx..idx + 4], o, max_alpha * t, blend);
        }
    }
}

fn grain(pixels: &mut [u8], width: u32, height: u32, opacity: f32, cell: f32, seed: u64) {
    let cell_px = ((cell * width.max(height) as f32).round() as u32).max(1);
    let opacity = opacity.clamp(0.0, 1.0);

    for y in 0..height {
        let cy = u64::from(y / cell_px);
        for x in 0..width {
            let cx = u64::from(x / cell_px);
            let n = (mix64(seed ^ (cx << 32) ^ cy) >> 40) as f32 / (1u64 << 24) as f32;
            let idx = ((y * width + x) as usize) * 4;
            let px = &mut pixels[idx..idx + 4];
            let mut c = [unit(px[0]), unit(px[1]), unit(px[2])];
            for v in &mut c {
                let o = if *v < 0.5 {
                    2.0 * *v * n
                } else {
                    1.0 - 2.0 * (1.0 - *v) * (1.0 - n)
                };
                *v = *v * (1.0 - opacity) + o * opacity;
            }
            store(px, c);
        }
    }
}

fn blend_px(px: &mut [u8], o: [f32; 3], alpha: f32, blend: Blend) {
    let a = alpha.clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    let mut c = [unit(px[0]), unit(px[1]), unit(px[2])];
    for (v, s) in c.iter_mut().zip(o) {
        let mixed = match blend {
            Blend::Normal => s,
            Blend::Multiply => *v * s,
            Blend::SoftLight => soft_light(*v, s),
        };
        *v = *v * (1.0 - a) + mixed * a;
    }
    store(px, c);
}

fn soft_light(b: f32, s: f32) -> f32 {
    if s <= 0.5 {
        b - (1.0 - 2.0 * s) * b * (1.0 - b)
    } else {
        let d = if b <= 0.25 {
            ((16.0 * b - 12.0) * b + 4.0) * b
        } else {
            b.sqrt()
        };
        b + (2.0 * s - 1.0) * (d - b)
    }
}

fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn rgb_to_unit(rgb: [u8; 3]) -> [f32; 3] {
    rgb.map(unit)
}

fn unit(v: u8) -> f32 {
    f32::from(v) / 255.0
}

fn store(px: &mut [u8], c: [f32; 3]) {
    for (dst, v) in px.iter_mut().zip(c) {
        *dst = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSpec;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
        px.repeat((w * h) as usize)
    }

    fn at(buf: &[u8], w: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * w + x) * 4) as usize;
        [buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]
    }

    #[test]
    fn normal_leaves_pixels_untouched() {
        let mut buf = solid(4, 3, [10, 200, 30, 255]);
        let before = buf.clone();
        apply_filter_rgba8(&mut buf, 4, 3, &FilterSpec::Normal.pipeline()).unwrap();
        assert_eq!(buf, before);
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let mut buf = vec![0u8; 7];
        assert!(apply_filter_rgba8(&mut buf, 1, 2, &FilterSpec::Monochrome.pipeline()).is_err());
    }

    #[test]
    fn monochrome_produces_gray_pixels() {
        let mut buf = solid(2, 2, [200, 40, 90, 255]);
        apply_filter_rgba8(&mut buf, 2, 2, &FilterSpec::Monochrome.pipeline()).unwrap();
        let [r, g, b, a] = at(&buf, 2, 1, 1);
        assert_eq!((r, a), (g, 255));
        assert_eq!(g, b);
    }

    #[test]
    fn sepia_warms_neutral_gray() {
        let mut buf = solid(2, 2, [128, 128, 128, 255]);
        apply_filter_rgba8(&mut buf, 2, 2, &FilterSpec::SepiaTone.pipeline()).unwrap();
        let [r, g, b, _] = at(&buf, 2, 0, 0);
        assert!(r > g && g > b);
    }

    #[test]
    fn polaroid_border_is_white_and_thicker_at_bottom() {
        let (w, h) = (360u32, 270u32);
        let mut buf = solid(w, h, [0, 0, 0, 255]);
        apply_filter_rgba8(&mut buf, w, h, &FilterSpec::Polaroid.pipeline()).unwrap();
        assert_eq!(at(&buf, w, 0, 100), [255, 255, 255, 255]);
        assert_eq!(at(&buf, w, 11, 100), [255, 255, 255, 255]);
        assert_eq!(at(&buf, w, 12, 100), [0, 0, 0, 255]);
        assert_eq!(at(&buf, w, 180, 11), [255, 255, 255, 255]);
        assert_eq!(at(&buf, w, 180, 12), [0, 0, 0, 255]);
        assert_eq!(at(&buf, w, 180, h - 32), [255, 255, 255, 255]);
        assert_eq!(at(&buf, w, 180, h - 33), [0, 0, 0, 255]);
    }

    #[test]
    fn film_vignette_darkens_corners_more_than_center() {
        let (w, h) = (64u32, 48u32);
        let mut buf = solid(w, h, [180, 180, 180, 255]);
        let pipeline = FilterPipeline {
            color: vec![],
            overlays: vec![Overlay::Vignette {
                rgb: [0, 0, 0],
                blend: Blend::Multiply,
                start: 0.5,
                max_alpha: 0.28,
            }],
        };
        apply_filter_rgba8(&mut buf, w, h, &pipeline).unwrap();
        let center = at(&buf, w, w / 2, h / 2)[0];
        let corner = at(&buf, w, 0, 0)[0];
        assert_eq!(center, 180);
        assert!(corner < center);
    }

    #[test]
    fn old_photo_vignette_lightens_edges() {
        let (w, h) = (64u32, 48u32);
        let mut buf = solid(w, h, [60, 60, 60, 255]);
        let pipeline = FilterPipeline {
            color: vec![],
            overlays: FilterSpec::OldPhoto.pipeline().overlays,
        };
        apply_filter_rgba8(&mut buf, w, h, &pipeline).unwrap();
        assert!(at(&buf, w, 0, 0)[0] > at(&buf, w, w / 2, h / 2)[0]);
    }

    #[test]
    fn film_is_deterministic() {
        let (w, h) = (40u32, 30u32);
        let src: Vec<u8> = (0..w * h * 4).map(|i| (i * 7 % 251) as u8).collect();
        let mut a = src.clone();
        let mut b = src;
        let p = FilterSpec::Film.pipeline();
        apply_filter_rgba8(&mut a, w, h, &p).unwrap();
        apply_filter_rgba8(&mut b, w, h, &p).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn soft_light_with_mid_gray_is_noop() {
        for b in [0.0f32, 0.2, 0.5, 0.9, 1.0] {
            assert!((soft_light(b, 0.5) - b).abs() < 1e-6);
        }
    }
}
