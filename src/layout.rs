use crate::foundation::{
    core::{CaptureMode, Rect},
    error::{BoothError, BoothResult},
};

/// Pixel geometry shared by preview layout and export.
///
/// A composition of `n` photos is `frame_width` wide and
/// `n * frame_height + (n - 1) * gap + label_band` tall. Each photo sits inside its own
/// `frame_width x frame_height` cell, inset by `padding` on all sides.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Geometry {
    pub frame_width: u32,
    pub frame_height: u32,
    pub gap: u32,
    pub label_band: u32,
    pub padding: u32,
    /// Distance from the bottom edge of the canvas to the label baseline.
    pub label_baseline_inset: u32,
    pub label_font_size: f32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            frame_width: 228,
            frame_height: 200,
            gap: 12,
            label_band: 36,
            padding: 12,
            label_baseline_inset: 12,
            label_font_size: 16.0,
        }
    }
}

impl Geometry {
    pub fn validate(&self) -> BoothResult<()> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(BoothError::validation(
                "frame width/height must be > 0",
            ));
        }
        if self.padding.saturating_mul(2) >= self.frame_width
            || self.padding.saturating_mul(2) >= self.frame_height
        {
            return Err(BoothError::validation(
                "padding leaves no drawable area inside the frame",
            ));
        }
        let strip_height = self
            .frame_height
            .checked_mul(3)
            .zip(self.gap.checked_mul(2))
            .and_then(|(photos, gaps)| photos.checked_add(gaps))
            .and_then(|h| h.checked_add(self.label_band));
        let limit = u32::from(u16::MAX);
        if self.frame_width > limit || strip_height.is_none_or(|h| h > limit) {
            return Err(BoothError::validation(format!(
                "strip canvas exceeds the {limit} px drawing surface limit"
            )));
        }
        if self.label_baseline_inset > self.canvas_size(CaptureMode::Single).1 {
            return Err(BoothError::validation(
                "label baseline inset exceeds canvas height",
            ));
        }
        if !self.label_font_size.is_finite() || self.label_font_size <= 0.0 {
            return Err(BoothError::validation(
                "label font size must be finite and > 0",
            ));
        }
        Ok(())
    }

    /// Canvas `(width, height)` for a composition in `mode`.
    pub fn canvas_size(&self, mode: CaptureMode) -> (u32, u32) {
        let n = mode.shots_required() as u32;
        let height = n * self.frame_height + (n - 1) * self.gap + self.label_band;
        (self.frame_width, height)
    }

    /// Drawable rectangle for the photo in slot `index`, padding already applied.
    pub fn photo_rect(&self, index: usize) -> Rect {
        let p = f64::from(self.padding);
        let draw_w = f64::from(self.frame_width) - 2.0 * p;
        let draw_h = f64::from(self.frame_height) - 2.0 * p;
        let y = p + index as f64 * (f64::from(self.frame_height) + f64::from(self.gap));
        Rect::new(p, y, p + draw_w, y + draw_h)
    }

    /// Label anchor `(center_x, baseline_y)` for a canvas of `mode`.
    pub fn label_anchor(&self, mode: CaptureMode) -> (f64, f64) {
        let (w, h) = self.canvas_size(mode);
        (
            f64::from(w) / 2.0,
            f64::from(h) - f64::from(self.label_baseline_inset),
        )
    }
}

/// Fit a `src_width x src_height` image inside `target` without cropping or distortion.
///
/// Wider sources span the full target width and are centered vertically; all others span the
/// full target height and are centered horizontally.
pub fn aspect_fit_contain(src_width: u32, src_height: u32, target: Rect) -> BoothResult<Rect> {
    if src_width == 0 || src_height == 0 {
        return Err(BoothError::validation("source image has zero size"));
    }
    if target.width() <= 0.0 || target.height() <= 0.0 {
        return Err(BoothError::validation("target rectangle is empty"));
    }

    let src_aspect = f64::from(src_width) / f64::from(src_height);
    let target_aspect = target.width() / target.height();

    let (x, y, w, h) = if src_aspect > target_aspect {
        let w = target.width();
        let h = w / src_aspect;
        (target.x0, target.y0 + (target.height() - h) / 2.0, w, h)
    } else {
        let h = target.height();
        let w = h * src_aspect;
        (target.x0 + (target.width() - w) / 2.0, target.y0, w, h)
    };

    Ok(Rect::new(x, y, x + w, y + h))
}
