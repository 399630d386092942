// Capture process backends
//
// The supervisor talks to the recording process through these traits so the
// session can be driven against a real ffmpeg or a test double.

use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::error::CaptureError;

/// A running capture process
#[async_trait::async_trait]
pub trait CaptureChild: Send {
    /// OS process id, if still known
    fn id(&self) -> Option<u32>;

    /// Ask the process to finish writing and exit
    fn interrupt(&mut self) -> Result<(), CaptureError>;

    /// Forcefully terminate the process
    fn kill(&mut self) -> Result<(), CaptureError>;

    /// Non-blocking exit check; `Some(code)` once the process has exited
    fn try_wait(&mut self) -> Result<Option<Option<i32>>, CaptureError>;

    /// Wait for the process to exit and return its exit code
    async fn wait(&mut self) -> Result<Option<i32>, CaptureError>;
}

/// Spawns capture processes
#[async_trait::async_trait]
pub trait CaptureLauncher: Send + Sync {
    async fn launch(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<Box<dyn CaptureChild>, CaptureError>;
}

/// Launches real OS processes via tokio
#[derive(Debug, Default, Clone)]
pub struct ProcessLauncher;

#[async_trait::async_trait]
impl CaptureLauncher for ProcessLauncher {
    async fn launch(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<Box<dyn CaptureChild>, CaptureError> {
        debug!("Spawning {} {}", program, args.join(" "));

        // ffmpeg floods stdout/stderr; nothing downstream reads them
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: program.to_string(),
                source,
            })?;

        info!("Capture process started (pid {:?})", child.id());

        Ok(Box::new(OsCaptureChild { child }))
    }
}

struct OsCaptureChild {
    child: Child,
}

#[async_trait::async_trait]
impl CaptureChild for OsCaptureChild {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    #[cfg(unix)]
    fn interrupt(&mut self) -> Result<(), CaptureError> {
        let Some(pid) = self.child.id() else {
            // Already reaped
            return Ok(());
        };

        // SAFETY: pid belongs to a child this struct owns and has not reaped.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGINT) };
        if rc != 0 {
            return Err(CaptureError::Signal(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn interrupt(&mut self) -> Result<(), CaptureError> {
        self.kill()
    }

    fn kill(&mut self) -> Result<(), CaptureError> {
        self.child.start_kill().map_err(CaptureError::Signal)
    }

    fn try_wait(&mut self) -> Result<Option<Option<i32>>, CaptureError> {
        let status = self.child.try_wait().map_err(CaptureError::Wait)?;
        Ok(status.map(|s| s.code()))
    }

    async fn wait(&mut self) -> Result<Option<i32>, CaptureError> {
        let status = self.child.wait().await.map_err(CaptureError::Wait)?;
        Ok(status.code())
    }
}
