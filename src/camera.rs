use std::{
    io::Cursor,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;

use crate::{BoothError, BoothResult};

/// An immutable captured still, kept in its encoded form until compositing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    width: u32,
    height: u32,
    encoded: Arc<[u8]>,
}

impl RawFrame {
    /// Wrap encoded image bytes, probing the header for pixel dimensions.
    pub fn from_encoded(bytes: impl Into<Arc<[u8]>>) -> BoothResult<Self> {
        let encoded: Arc<[u8]> = bytes.into();
        let (width, height) = image::ImageReader::new(Cursor::new(&encoded[..]))
            .with_guessed_format()
            .context("guess frame image format")?
            .into_dimensions()
            .context("read frame dimensions")?;
        if width == 0 || height == 0 {
            return Err(BoothError::validation("captured frame has zero size"));
        }
        Ok(Self {
            width,
            height,
            encoded,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }
}

/// Source of still frames, typically a live camera feed.
///
/// Returns `None` when no frame is available (camera not ready). Must be cheap to call
/// repeatedly.
pub trait CameraSource {
    fn still_frame(&mut self) -> Option<Vec<u8>>;
}

impl<C: CameraSource + ?Sized> CameraSource for Box<C> {
    fn still_frame(&mut self) -> Option<Vec<u8>> {
        (**self).still_frame()
    }
}

/// Camera backed by a closure.
pub struct FnCamera<F>(pub F);

impl<F> CameraSource for FnCamera<F>
where
    F: FnMut() -> Option<Vec<u8>>,
{
    fn still_frame(&mut self) -> Option<Vec<u8>> {
        (self.0)()
    }
}

/// Camera that replays image files from a directory in name order, wrapping around.
#[derive(Debug)]
pub struct DirectoryCamera {
    files: Vec<PathBuf>,
    next: usize,
}

impl DirectoryCamera {
    const EXTENSIONS: [&'static str; 3] = ["png", "jpg", "jpeg"];

    pub fn open(dir: &Path) -> BoothResult<Self> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("read camera directory '{}'", dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| format!("list camera directory '{}'", dir.display()))?
                .path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| Self::EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_image {
                files.push(path);
            }
        }
        files.sort();

        tracing::debug!(dir = %dir.display(), frames = files.len(), "opened directory camera");
        Ok(Self { files, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl CameraSource for DirectoryCamera {
    fn still_frame(&mut self) -> Option<Vec<u8>> {
        if self.files.is_empty() {
            return None;
        }
        let path = &self.files[self.next % self.files.len()];
        self.next = self.next.wrapping_add(1);
        match std::fs::read(path) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "camera frame unreadable");
                None
            }
        }
    }
}

/// Ask `camera` for a frame; a missing or undecodable frame yields `None`.
pub fn snapshot(camera: &mut dyn CameraSource) -> Option<RawFrame> {
    let Some(bytes) = camera.still_frame() else {
        tracing::warn!("camera returned no frame");
        return None;
    };
    match RawFrame::from_encoded(bytes) {
        Ok(frame) => Some(frame),
        Err(err) => {
            tracing::warn!(%err, "camera frame could not be decoded");
            None
        }
    }
}
