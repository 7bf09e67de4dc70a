use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use crate::{
    BoothError, BoothResult,
    compose::CompositionConfig,
    filter::FilterSpec,
    foundation::core::{CaptureMode, OutputFormat, Rgb8},
    label::LabelFont,
    layout::Geometry,
    sequencer::Timing,
};

/// Booth settings as stored in a JSON file. Every field is optional; missing fields take the
/// defaults below.
///
/// ```json
/// { "mode": "single", "filter": "sepia-tone", "frame_color": "mint", "format": "png" }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoothConfig {
    pub mode: CaptureMode,
    pub filter: FilterSpec,
    pub frame_color: Rgb8,
    pub label_text: String,
    pub show_label: bool,
    pub format: OutputFormat,
    pub geometry: Geometry,
    pub timing: Timing,
    /// TTF/OTF font used for the label. Without one the built-in DejaVu Sans is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_font: Option<PathBuf>,
}

impl Default for BoothConfig {
    fn default() -> Self {
        Self {
            mode: CaptureMode::Strip,
            filter: FilterSpec::Normal,
            frame_color: Rgb8::WHITE,
            label_text: "Photobooth".to_string(),
            show_label: true,
            format: OutputFormat::Jpg,
            geometry: Geometry::default(),
            timing: Timing::default(),
            label_font: None,
        }
    }
}

impl BoothConfig {
    pub fn from_reader<R: std::io::Read>(r: R) -> BoothResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| BoothError::validation(format!("parse booth config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> BoothResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            BoothError::validation(format!("open booth config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn validate(&self) -> BoothResult<()> {
        self.geometry.validate()?;
        self.timing.validate()?;
        Ok(())
    }

    pub fn composition(&self) -> CompositionConfig {
        CompositionConfig {
            filter: self.filter,
            frame_color: self.frame_color,
            label_text: self.label_text.clone(),
            show_label: self.show_label,
            format: self.format,
            geometry: self.geometry,
        }
    }

    /// Load the configured label font, if any.
    pub fn load_label_font(&self) -> BoothResult<Option<LabelFont>> {
        self.label_font
            .as_deref()
            .map(LabelFont::from_path)
            .transpose()
    }
}
