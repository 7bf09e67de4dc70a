use std::sync::Arc;

use anyhow::Context;

use crate::{
    BoothError, BoothResult, assets::PreparedFrame, camera::RawFrame, filter::FilterPipeline,
    filter_cpu::apply_filter_rgba8,
};

/// Decode a captured frame and run `filter` over its pixels.
pub fn decode_frame(frame: &RawFrame, filter: &FilterPipeline) -> BoothResult<PreparedFrame> {
    let dyn_img = image::load_from_memory(frame.encoded()).context("decode frame from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if (width, height) != (frame.width(), frame.height()) {
        return Err(BoothError::render(format!(
            "decoded frame is {width}x{height}, capture reported {}x{}",
            frame.width(),
            frame.height()
        )));
    }

    let mut pixels = rgba.into_raw();
    apply_filter_rgba8(&mut pixels, width, height, filter)?;
    premultiply_rgba8_in_place(&mut pixels);

    Ok(PreparedFrame {
        width,
        height,
        rgba8_premul: Arc::new(pixels),
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}
