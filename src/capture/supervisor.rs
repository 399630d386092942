use std::path::Path;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::process::{CaptureChild, CaptureLauncher};
use super::settings::CaptureSettings;
use crate::error::CaptureError;

/// Owns the lifecycle of the single capture process of a session.
///
/// Driven only from the session's control flow, so the handle check in
/// `start` is enough to guarantee one process at a time.
pub struct CaptureSupervisor {
    settings: CaptureSettings,
    launcher: Box<dyn CaptureLauncher>,
    handle: Option<Box<dyn CaptureChild>>,
    started_at: Option<Instant>,
    launches: usize,
}

impl CaptureSupervisor {
    pub fn new(settings: CaptureSettings, launcher: Box<dyn CaptureLauncher>) -> Self {
        Self {
            settings,
            launcher,
            handle: None,
            started_at: None,
            launches: 0,
        }
    }

    /// Launch the capture process; a no-op if one is already running
    pub async fn start(&mut self) -> Result<(), CaptureError> {
        if self.handle.is_some() {
            warn!("Recording already started");
            return Ok(());
        }

        info!(
            "Starting capture: {} -> {}",
            self.settings.program,
            self.settings.output_path.display()
        );

        let args = self.settings.args();
        let child = self.launcher.launch(&self.settings.program, &args).await?;

        self.handle = Some(child);
        self.started_at = Some(Instant::now());
        self.launches += 1;

        info!("Capture started");
        Ok(())
    }

    /// Gracefully stop the capture process and wait until it has exited.
    ///
    /// Once this returns the output file is complete. A no-op if nothing is
    /// running.
    pub async fn stop(&mut self) -> Result<Option<i32>, CaptureError> {
        let Some(mut child) = self.handle.take() else {
            warn!("No recording process to stop");
            return Ok(None);
        };

        info!("Stopping capture process (pid {:?})", child.id());

        if let Err(e) = child.interrupt() {
            warn!("Failed to interrupt capture process, killing it: {}", e);
            child.kill()?;
        }

        let grace = self.settings.stop_grace();
        let waited = tokio::time::timeout(grace, child.wait()).await;
        let code = match waited {
            Ok(result) => result?,
            Err(_) => {
                error!(
                    "Capture process did not exit within {:?} of SIGINT, killing it",
                    grace
                );
                child.kill()?;
                child.wait().await?
            }
        };

        info!(
            "Capture process exited with code {:?}; recording saved to {}",
            code,
            self.settings.output_path.display()
        );

        Ok(code)
    }

    /// Detect a capture process that died on its own.
    ///
    /// Releases the handle so a later `stop` is a no-op.
    pub fn check_health(&mut self) -> Result<(), CaptureError> {
        let Some(child) = self.handle.as_mut() else {
            return Ok(());
        };

        match child.try_wait()? {
            Some(code) => {
                self.handle = None;
                Err(CaptureError::UnexpectedExit(code))
            }
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Capture epoch: when the current (or last) process was launched
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Milliseconds since the capture epoch, 0 before capture started
    pub fn elapsed_ms(&self) -> u64 {
        self.offset_ms(Instant::now())
    }

    /// Position of `at` on the recording timeline in ms; instants before the
    /// epoch clamp to 0
    pub fn offset_ms(&self, at: Instant) -> u64 {
        self.started_at
            .map(|t| at.saturating_duration_since(t).as_millis() as u64)
            .unwrap_or(0)
    }

    /// Number of processes launched over the supervisor's lifetime
    pub fn launches(&self) -> usize {
        self.launches
    }

    pub fn output_path(&self) -> &Path {
        &self.settings.output_path
    }

    pub fn content_type(&self) -> &str {
        &self.settings.content_type
    }
}
