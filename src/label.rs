use std::{path::Path, sync::Arc};

use anyhow::Context as _;

use crate::{BoothError, BoothResult, foundation::core::Rgb8};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Rgb8> for TextBrushRgba8 {
    fn from(c: Rgb8) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: 255,
        }
    }
}

/// DejaVu Sans, shipped so the label renders without a user-supplied font.
const BUILTIN_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// Raw TTF/OTF bytes used to draw the strip label.
#[derive(Clone, Debug)]
pub struct LabelFont {
    bytes: Arc<Vec<u8>>,
}

impl Default for LabelFont {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LabelFont {
    pub fn builtin() -> Self {
        Self {
            bytes: Arc::new(BUILTIN_FONT.to_vec()),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> BoothResult<Self> {
        if bytes.is_empty() {
            return Err(BoothError::validation("label font bytes are empty"));
        }
        Ok(Self {
            bytes: Arc::new(bytes),
        })
    }

    pub fn from_path(path: &Path) -> BoothResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            return Err(BoothError::validation(format!(
                "label font '{}' must be a .ttf, .otf or .ttc file",
                path.display()
            )));
        }
        let bytes =
            std::fs::read(path).with_context(|| format!("read label font '{}'", path.display()))?;
        Self::from_bytes(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }
}

/// Fixed styling of the label line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelStyle {
    pub size_px: f32,
    pub color: Rgb8,
    pub opacity: f32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            size_px: 16.0,
            color: Rgb8::new(0x88, 0x88, 0x88),
            opacity: 0.7,
        }
    }
}

/// Shaped label text plus the font needed to draw it.
pub struct LabelLayout {
    pub layout: parley::Layout<TextBrushRgba8>,
    pub font: LabelFont,
    pub opacity: f32,
}

impl LabelLayout {
    /// Widest line advance in pixels.
    pub fn width(&self) -> f32 {
        self.layout
            .lines()
            .map(|line| line.metrics().advance)
            .fold(0.0f32, f32::max)
    }
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    pub fn layout_label(
        &mut self,
        text: &str,
        font: &LabelFont,
        style: LabelStyle,
    ) -> BoothResult<LabelLayout> {
        let layout = self.layout_plain(text, font.bytes(), style.size_px, style.color.into())?;
        Ok(LabelLayout {
            layout,
            font: font.clone(),
            opacity: style.opacity,
        })
    }

    /// Shape and lay out plain text using provided font bytes and styling.
    pub fn layout_plain(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> BoothResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(BoothError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            BoothError::validation("no font families registered from font bytes")
        })?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| BoothError::validation("registered font family has no name"))?
            .to_string();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}
