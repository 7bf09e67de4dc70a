use std::sync::Arc;

use crate::{
    BoothError, BoothResult,
    assets::PreparedFrame,
    foundation::core::{Affine, Rect, Rgb8},
    label::LabelLayout,
    render::FrameRGBA,
};

/// Single-pass CPU drawing surface backed by `vello_cpu`.
///
/// Draw calls are recorded in order and rasterized once by [`CpuCanvas::finish`].
pub struct CpuCanvas {
    width: u16,
    height: u16,
    ctx: vello_cpu::RenderContext,
}

impl CpuCanvas {
    pub fn new(width: u32, height: u32) -> BoothResult<Self> {
        if width == 0 || height == 0 {
            return Err(BoothError::render("canvas width/height must be > 0"));
        }
        let width_u16: u16 = width
            .try_into()
            .map_err(|_| BoothError::render("canvas width exceeds drawing surface limit"))?;
        let height_u16: u16 = height
            .try_into()
            .map_err(|_| BoothError::render("canvas height exceeds drawing surface limit"))?;

        Ok(Self {
            width: width_u16,
            height: height_u16,
            ctx: vello_cpu::RenderContext::new(width_u16, height_u16),
        })
    }

    pub fn fill(&mut self, color: Rgb8) {
        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, 255,
        ));
        self.ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.width),
            f64::from(self.height),
        ));
    }

    /// Draw `frame` scaled into `dest`.
    pub fn draw_frame(&mut self, frame: &PreparedFrame, dest: Rect) -> BoothResult<()> {
        let pixmap = image_premul_bytes_to_pixmap(
            frame.rgba8_premul.as_slice(),
            frame.width,
            frame.height,
        )?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };

        let (w, h) = (f64::from(frame.width), f64::from(frame.height));
        let transform = Affine::translate((dest.x0, dest.y0))
            * Affine::scale_non_uniform(dest.width() / w, dest.height() / h);

        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx.set_transform(affine_to_cpu(transform));
        self.ctx.set_paint(paint);
        self.ctx
            .fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
        Ok(())
    }

    /// Draw `label` centered on `center_x` with its first baseline at `baseline_y`.
    pub fn draw_label(&mut self, label: &LabelLayout, center_x: f64, baseline_y: f64) {
        let mut runs = Vec::new();
        for line in label.layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs: Vec<vello_cpu::Glyph> = run
                    .positioned_glyphs()
                    .map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    })
                    .collect();
                runs.push((run.style().brush, run.run().font_size(), glyphs));
            }
        }

        let Some(first_baseline) = runs
            .iter()
            .find_map(|(_, _, glyphs)| glyphs.first().map(|g| g.y))
        else {
            return;
        };

        let dx = center_x - f64::from(label.width()) / 2.0;
        let dy = baseline_y - f64::from(first_baseline);
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(label.font.bytes().to_vec()),
            0,
        );

        self.ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        self.ctx
            .set_transform(vello_cpu::kurbo::Affine::translate((dx, dy)));
        if label.opacity < 1.0 {
            self.ctx.push_opacity_layer(label.opacity);
        }
        for (brush, font_size, glyphs) in runs {
            self.ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                brush.r, brush.g, brush.b, brush.a,
            ));
            self.ctx
                .glyph_run(&font)
                .font_size(font_size)
                .fill_glyphs(glyphs.into_iter());
        }
        if label.opacity < 1.0 {
            self.ctx.pop_layer();
        }
    }

    /// Rasterize everything drawn so far.
    pub fn finish(mut self) -> FrameRGBA {
        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        self.ctx.flush();
        self.ctx.render_to_pixmap(&mut pixmap);
        FrameRGBA {
            width: u32::from(self.width),
            height: u32::from(self.height),
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        }
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> BoothResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| BoothError::render("frame width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| BoothError::render("frame height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(BoothError::render("prepared frame byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(w: u32, h: u32, px: [u8; 4]) -> PreparedFrame {
        PreparedFrame {
            width: w,
            height: h,
            rgba8_premul: Arc::new(px.repeat((w * h) as usize)),
        }
    }

    #[test]
    fn oversized_canvas_has_no_drawing_surface() {
        assert!(matches!(
            CpuCanvas::new(70_000, 10),
            Err(BoothError::Render(_))
        ));
        assert!(CpuCanvas::new(0, 10).is_err());
    }

    #[test]
    fn fill_covers_every_pixel() {
        let mut c = CpuCanvas::new(8, 5).unwrap();
        c.fill(Rgb8::BLUSH);
        let f = c.finish();
        assert_eq!((f.width, f.height), (8, 5));
        assert!(f.data.chunks_exact(4).all(|px| px == [0xf8, 0xe8, 0xe8, 255]));
    }

    #[test]
    fn frame_lands_inside_destination_only() {
        let mut c = CpuCanvas::new(40, 40).unwrap();
        c.fill(Rgb8::WHITE);
        c.draw_frame(
            &solid_frame(4, 4, [0, 0, 255, 255]),
            Rect::new(10.0, 10.0, 30.0, 30.0),
        )
        .unwrap();
        let f = c.finish();
        assert_eq!(f.pixel(20, 20), Some([0, 0, 255, 255]));
        assert_eq!(f.pixel(5, 5), Some([255, 255, 255, 255]));
        assert_eq!(f.pixel(35, 20), Some([255, 255, 255, 255]));
    }

    #[test]
    fn rejects_short_frame_buffer() {
        let mut c = CpuCanvas::new(4, 4).unwrap();
        let bad = PreparedFrame {
            width: 2,
            height: 2,
            rgba8_premul: Arc::new(vec![0; 3]),
        };
        assert!(c.draw_frame(&bad, Rect::new(0.0, 0.0, 4.0, 4.0)).is_err());
    }
}
