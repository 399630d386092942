//! Capture process supervision
//!
//! The recording itself is produced by an external process (ffmpeg). This
//! module builds its argument vector, launches it, and stops it gracefully
//! so the output file is fully written before anyone reads it.

mod process;
mod settings;
mod supervisor;

pub use process::{CaptureChild, CaptureLauncher, ProcessLauncher};
pub use settings::CaptureSettings;
pub use supervisor::CaptureSupervisor;
