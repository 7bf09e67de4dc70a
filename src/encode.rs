use std::io::Cursor;

use anyhow::Context as _;

use crate::{
    BoothError, BoothResult,
    foundation::core::{CaptureMode, OutputFormat},
    render::FrameRGBA,
};

/// Quality used for JPEG export, matching the common browser canvas default of 0.92.
pub const JPEG_QUALITY: u8 = 92;

/// Final encoded composite, ready for delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramedImage {
    pub width: u32,
    pub height: u32,
    pub mode: CaptureMode,
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl FramedImage {
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }
}

pub fn suggested_filename(mode: CaptureMode, format: OutputFormat) -> String {
    format!("{}.{}", mode.file_stem(), format.extension())
}

/// Encode an opaque canvas as JPEG or PNG.
pub fn encode_frame(frame: &FrameRGBA, format: OutputFormat) -> BoothResult<Vec<u8>> {
    let rgba = image::RgbaImage::from_raw(frame.width, frame.height, frame.to_straight_rgba8())
        .ok_or_else(|| BoothError::encode("canvas buffer does not match its dimensions"))?;
    let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();

    let mut buf = Vec::new();
    match format {
        OutputFormat::Png => {
            rgb.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
                .context("encode png")?;
        }
        OutputFormat::Jpg => {
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
                .encode_image(&rgb)
                .context("encode jpeg")?;
        }
    }
    Ok(buf)
}
