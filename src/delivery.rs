use std::path::PathBuf;

use anyhow::Context as _;

use crate::{BoothResult, encode::FramedImage};

/// Destination for an exported composite.
pub trait FileDelivery {
    fn deliver(&mut self, image: &FramedImage) -> BoothResult<()>;
}

impl<D: FileDelivery + ?Sized> FileDelivery for &mut D {
    fn deliver(&mut self, image: &FramedImage) -> BoothResult<()> {
        (**self).deliver(image)
    }
}

/// Writes each composite into a directory under its suggested filename, replacing any previous
/// file with the same name.
#[derive(Clone, Debug)]
pub struct DirectoryDelivery {
    dir: PathBuf,
    delivered: Vec<PathBuf>,
}

impl DirectoryDelivery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            delivered: Vec::new(),
        }
    }

    pub fn path_for(&self, image: &FramedImage) -> PathBuf {
        self.dir.join(&image.filename)
    }

    /// Paths written so far, oldest first.
    pub fn delivered(&self) -> &[PathBuf] {
        &self.delivered
    }
}

impl FileDelivery for DirectoryDelivery {
    fn deliver(&mut self, image: &FramedImage) -> BoothResult<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output dir '{}'", self.dir.display()))?;
        let path = self.path_for(image);
        std::fs::write(&path, &image.bytes)
            .with_context(|| format!("write {} '{}'", image.mime(), path.display()))?;
        tracing::info!(path = %path.display(), bytes = image.bytes.len(), "delivered");
        self.delivered.push(path);
        Ok(())
    }
}

/// In-memory delivery for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryDelivery {
    pub(crate) images: Vec<FramedImage>,
}

impl InMemoryDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn images(&self) -> &[FramedImage] {
        &self.images
    }
}

impl FileDelivery for InMemoryDelivery {
    fn deliver(&mut self, image: &FramedImage) -> BoothResult<()> {
        self.images.push(image.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{CaptureMode, OutputFormat};

    fn image(bytes: &[u8]) -> FramedImage {
        FramedImage {
            width: 1,
            height: 1,
            mode: CaptureMode::Single,
            format: OutputFormat::Png,
            bytes: bytes.to_vec(),
            filename: "photo.png".to_string(),
        }
    }

    #[test]
    fn directory_delivery_creates_dir_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let mut d = DirectoryDelivery::new(tmp.path().join("out"));
        d.deliver(&image(b"first")).unwrap();
        d.deliver(&image(b"second")).unwrap();

        let path = tmp.path().join("out").join("photo.png");
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        assert_eq!(d.delivered(), &[path.clone(), path]);
    }

    #[test]
    fn in_memory_keeps_order() {
        fn send(mut to: impl FileDelivery, bytes: &[u8]) {
            to.deliver(&image(bytes)).unwrap();
        }

        let mut d = InMemoryDelivery::new();
        send(&mut d, b"a");
        send(&mut d, b"b");
        let bytes: Vec<&[u8]> = d.images().iter().map(|i| i.bytes.as_slice()).collect();
        assert_eq!(bytes, vec![b"a".as_slice(), b"b".as_slice()]);
    }
}
