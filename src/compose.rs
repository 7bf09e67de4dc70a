use rayon::prelude::*;

use crate::{
    BoothError, BoothResult,
    assets::{PreparedFrame, decode::decode_frame},
    camera::RawFrame,
    encode::{FramedImage, encode_frame, suggested_filename},
    filter::FilterSpec,
    foundation::core::{CaptureMode, OutputFormat, Rgb8},
    label::{LabelFont, LabelStyle, TextLayoutEngine},
    layout::{Geometry, aspect_fit_contain},
    render::{FrameRGBA, cpu::CpuCanvas},
    sequencer::CompletedCapture,
};

/// Inputs to one compositing call.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositionConfig {
    pub filter: FilterSpec,
    pub frame_color: Rgb8,
    pub label_text: String,
    pub show_label: bool,
    pub format: OutputFormat,
    pub geometry: Geometry,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            filter: FilterSpec::Normal,
            frame_color: Rgb8::WHITE,
            label_text: "Photobooth".to_string(),
            show_label: true,
            format: OutputFormat::Jpg,
            geometry: Geometry::default(),
        }
    }
}

impl CompositionConfig {
    /// Text to draw, if the label is enabled and non-empty.
    pub fn visible_label(&self) -> Option<&str> {
        (self.show_label && !self.label_text.is_empty()).then_some(self.label_text.as_str())
    }
}

/// Renders slots into a framed image. Holds no state beyond its inputs.
#[derive(Clone, Debug)]
pub struct Compositor {
    config: CompositionConfig,
    font: LabelFont,
}

impl Compositor {
    pub fn new(config: CompositionConfig) -> BoothResult<Self> {
        config.geometry.validate()?;
        Ok(Self {
            config,
            font: LabelFont::builtin(),
        })
    }

    /// Replace the built-in label font.
    pub fn with_label_font(mut self, font: LabelFont) -> Self {
        self.font = font;
        self
    }

    pub fn config(&self) -> &CompositionConfig {
        &self.config
    }

    /// Render the canvas without encoding. Empty slots stay as background placeholders.
    #[tracing::instrument(skip_all, fields(slots = slots.len(), filter = ?self.config.filter))]
    pub fn render(&self, slots: &[Option<RawFrame>]) -> BoothResult<FrameRGBA> {
        let mode = CaptureMode::from_shot_count(slots.len())?;
        let geometry = &self.config.geometry;
        let (width, height) = geometry.canvas_size(mode);
        let mut canvas = CpuCanvas::new(width, height)?;

        let frames = self.decode_all(slots)?;

        canvas.fill(self.config.frame_color);
        for (index, frame) in frames.iter().enumerate() {
            let Some(frame) = frame else {
                tracing::debug!(slot = index, "empty slot left as placeholder");
                continue;
            };
            let dest = aspect_fit_contain(frame.width, frame.height, geometry.photo_rect(index))?;
            canvas.draw_frame(frame, dest)?;
        }

        if let Some(text) = self.config.visible_label() {
            let style = LabelStyle {
                size_px: geometry.label_font_size,
                ..LabelStyle::default()
            };
            match TextLayoutEngine::new().layout_label(text, &self.font, style) {
                Ok(label) => {
                    let (center_x, baseline_y) = geometry.label_anchor(mode);
                    canvas.draw_label(&label, center_x, baseline_y);
                }
                Err(err) => tracing::warn!(%err, "label font unusable; skipping label"),
            }
        }

        Ok(canvas.finish())
    }

    /// Render and encode. Refused while any slot is empty.
    #[tracing::instrument(skip_all, fields(slots = slots.len(), format = ?self.config.format))]
    pub fn export(&self, slots: &[Option<RawFrame>]) -> BoothResult<FramedImage> {
        if let Some(slot) = first_empty_slot(slots) {
            return Err(BoothError::IncompleteCapture {
                slot,
                total: slots.len(),
            });
        }

        let mode = CaptureMode::from_shot_count(slots.len())?;
        let frame = self.render(slots)?;
        let bytes = encode_frame(&frame, self.config.format)?;
        let image = FramedImage {
            width: frame.width,
            height: frame.height,
            mode,
            format: self.config.format,
            bytes,
            filename: suggested_filename(mode, self.config.format),
        };
        tracing::info!(
            filename = %image.filename,
            width = image.width,
            height = image.height,
            bytes = image.bytes.len(),
            "exported composite"
        );
        Ok(image)
    }

    pub fn export_capture(&self, capture: &CompletedCapture) -> BoothResult<FramedImage> {
        if capture.slots.len() != capture.mode.shots_required() {
            return Err(BoothError::validation(format!(
                "{:?} capture has {} slots",
                capture.mode,
                capture.slots.len()
            )));
        }
        self.export(&capture.slots)
    }

    // Every slot decodes as its own task; the collect is the join point, so nothing is drawn
    // until all decodes have finished.
    fn decode_all(&self, slots: &[Option<RawFrame>]) -> BoothResult<Vec<Option<PreparedFrame>>> {
        let pipeline = self.config.filter.pipeline();
        slots
            .par_iter()
            .map(|slot| {
                slot.as_ref()
                    .map(|frame| decode_frame(frame, &pipeline))
                    .transpose()
            })
            .collect()
    }
}

/// Whether `slots` can be exported, i.e. none is empty.
pub fn can_export(slots: &[Option<RawFrame>]) -> bool {
    !slots.is_empty() && first_empty_slot(slots).is_none()
}

fn first_empty_slot(slots: &[Option<RawFrame>]) -> Option<usize> {
    slots.iter().position(Option::is_none)
}
