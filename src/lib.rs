//! Photobooth: timed multi-shot capture and deterministic photo-strip compositing.
//!
//! The crate has two halves:
//!
//! - [`sequencer`] runs the countdown/capture state machine and fills slots from a
//!   [`CameraSource`]
//! - [`compose`] turns filled slots into a framed, labeled, filtered image and encodes it as
//!   JPEG or PNG
//!
//! Rendering is CPU-only and deterministic: the same slots and settings always produce the same
//! pixels.
#![forbid(unsafe_code)]

mod foundation;

pub mod assets;
pub mod camera;
pub mod compose;
pub mod config;
pub mod delivery;
pub mod encode;
pub mod filter;
pub mod filter_cpu;
pub mod label;
pub mod layout;
pub mod render;
pub mod sequencer;

pub use crate::foundation::core::{Affine, CaptureMode, OutputFormat, Rect, Rgb8};
pub use crate::foundation::error::{BoothError, BoothResult};

pub use crate::camera::{CameraSource, DirectoryCamera, FnCamera, RawFrame};
pub use crate::compose::{CompositionConfig, Compositor, can_export};
pub use crate::config::BoothConfig;
pub use crate::delivery::{DirectoryDelivery, FileDelivery, InMemoryDelivery};
pub use crate::encode::{FramedImage, JPEG_QUALITY};
pub use crate::filter::FilterSpec;
pub use crate::label::LabelFont;
pub use crate::layout::{Geometry, aspect_fit_contain};
pub use crate::render::FrameRGBA;
pub use crate::sequencer::{
    CaptureSequencer, Clock, CompletedCapture, ManualClock, Progress, Status, SystemClock,
    TimerQueue, Timing, drive,
};
