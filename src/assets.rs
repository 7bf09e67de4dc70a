use std::sync::Arc;

pub mod decode;

/// A decoded, filtered frame ready to be drawn.
#[derive(Clone, Debug)]
pub struct PreparedFrame {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    pub rgba8_premul: Arc<Vec<u8>>,
}
