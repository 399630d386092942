// Test doubles shared by the integration tests
//
// A scripted automation surface, a reporter that records every event, and a
// capture launcher whose fake process can be told to crash or to ignore the
// graceful-stop signal.

#![allow(dead_code)]

use anyhow::Result;
use meeting_bot::{
    CaptureChild, CaptureError, CaptureLauncher, EventCode, EventReporter, MeetSelectors,
    Observation, SurfaceCapabilities, SurfaceError,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const PAGE_HTML: &str = "<html><body>meeting</body></html>";

pub struct ScriptedSurface {
    capabilities: SurfaceCapabilities,
    selectors: MeetSelectors,
    calls: Mutex<Vec<String>>,
    observations: Mutex<Option<mpsc::Receiver<Observation>>>,
    refuse_admission: AtomicBool,
    fail_open: AtomicBool,
    fail_probes: AtomicBool,
    kicked_count: AtomicUsize,
    leave_hidden: AtomicBool,
    removed_visible: AtomicBool,
    leave_check_delay: Mutex<Duration>,
    hang_evaluate: AtomicBool,
}

impl ScriptedSurface {
    /// Surface plus the sender feeding its observation channel
    pub fn new(capabilities: SurfaceCapabilities) -> (Arc<Self>, mpsc::Sender<Observation>) {
        let (tx, rx) = mpsc::channel(64);
        let surface = Self {
            capabilities,
            selectors: MeetSelectors::default(),
            calls: Mutex::new(Vec::new()),
            observations: Mutex::new(Some(rx)),
            refuse_admission: AtomicBool::new(false),
            fail_open: AtomicBool::new(false),
            fail_probes: AtomicBool::new(false),
            kicked_count: AtomicUsize::new(0),
            leave_hidden: AtomicBool::new(false),
            removed_visible: AtomicBool::new(false),
            leave_check_delay: Mutex::new(Duration::ZERO),
            hang_evaluate: AtomicBool::new(false),
        };
        (Arc::new(surface), tx)
    }

    pub fn incremental() -> (Arc<Self>, mpsc::Sender<Observation>) {
        Self::new(SurfaceCapabilities::default())
    }

    pub fn refuse_admission(&self) {
        self.refuse_admission.store(true, Ordering::SeqCst);
    }

    pub fn fail_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    pub fn fail_probes(&self) {
        self.fail_probes.store(true, Ordering::SeqCst);
    }

    pub fn set_kicked_count(&self, n: usize) {
        self.kicked_count.store(n, Ordering::SeqCst);
    }

    pub fn set_leave_hidden(&self, hidden: bool) {
        self.leave_hidden.store(hidden, Ordering::SeqCst);
    }

    pub fn set_removed_visible(&self, visible: bool) {
        self.removed_visible.store(visible, Ordering::SeqCst);
    }

    /// Make the leave-button visibility check take this long
    pub fn set_leave_check_delay(&self, delay: Duration) {
        *self.leave_check_delay.lock().unwrap() = delay;
    }

    /// Make page script evaluation never return
    pub fn hang_evaluate(&self) {
        self.hang_evaluate.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls().iter().any(|c| c == call)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn probe_error(&self) -> Option<SurfaceError> {
        self.fail_probes
            .load(Ordering::SeqCst)
            .then(|| SurfaceError::Transport("sidecar went away".to_string()))
    }
}

#[async_trait::async_trait]
impl meeting_bot::AutomationSurface for ScriptedSurface {
    fn capabilities(&self) -> SurfaceCapabilities {
        self.capabilities
    }

    async fn open(&self, url: &str) -> Result<(), SurfaceError> {
        self.record(format!("open {}", url));
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(SurfaceError::Remote("net::ERR_NAME_NOT_RESOLVED".to_string()));
        }
        Ok(())
    }

    async fn count(&self, selector: &str) -> Result<usize, SurfaceError> {
        self.record(format!("count {}", selector));
        if let Some(e) = self.probe_error() {
            return Err(e);
        }
        if selector == self.selectors.kicked_detector {
            return Ok(self.kicked_count.load(Ordering::SeqCst));
        }
        Ok(0)
    }

    async fn is_visible(&self, selector: &str, _timeout: Duration) -> Result<bool, SurfaceError> {
        self.record(format!("is_visible {}", selector));
        if let Some(e) = self.probe_error() {
            return Err(e);
        }
        if selector == self.selectors.removed_notice {
            return Ok(self.removed_visible.load(Ordering::SeqCst));
        }
        Ok(true)
    }

    async fn is_hidden(&self, selector: &str, _timeout: Duration) -> Result<bool, SurfaceError> {
        self.record(format!("is_hidden {}", selector));
        let delay = *self.leave_check_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(e) = self.probe_error() {
            return Err(e);
        }
        if selector == self.selectors.leave_button {
            return Ok(self.leave_hidden.load(Ordering::SeqCst));
        }
        Ok(false)
    }

    async fn click(&self, selector: &str, _timeout: Duration) -> Result<(), SurfaceError> {
        self.record(format!("click {}", selector));
        Ok(())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), SurfaceError> {
        self.record(format!("fill {} {}", selector, text));
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), SurfaceError> {
        self.record(format!("wait_for {}", selector));
        if selector == self.selectors.leave_button && self.refuse_admission.load(Ordering::SeqCst)
        {
            tokio::time::sleep(timeout).await;
            return Err(SurfaceError::Timeout {
                selector: selector.to_string(),
                timeout,
            });
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, SurfaceError> {
        self.record(format!("evaluate {}", script));
        if self.hang_evaluate.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(serde_json::Value::String(PAGE_HTML.to_string()))
    }

    async fn observe(&self, _capacity: usize) -> Result<mpsc::Receiver<Observation>, SurfaceError> {
        self.record("observe".to_string());
        self.observations
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| SurfaceError::Remote("observers already installed".to_string()))
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        self.record("close".to_string());
        Ok(())
    }
}

/// Keeps every reported event in order
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<(EventCode, Option<serde_json::Value>)>>,
    heartbeats: AtomicUsize,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn codes(&self) -> Vec<EventCode> {
        self.events.lock().unwrap().iter().map(|(c, _)| *c).collect()
    }

    /// Payload of the last event with this code
    pub fn payload(&self, code: EventCode) -> Option<serde_json::Value> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(c, _)| *c == code)
            .and_then(|(_, p)| p.clone())
    }

    pub fn heartbeats(&self) -> usize {
        self.heartbeats.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EventReporter for RecordingReporter {
    async fn report(&self, code: EventCode, payload: Option<serde_json::Value>) -> Result<()> {
        self.events.lock().unwrap().push((code, payload));
        Ok(())
    }

    async fn heartbeat(&self) -> Result<()> {
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Counters and switches shared between a `FakeLauncher` and its children
#[derive(Default)]
pub struct FakeProcess {
    pub launches: AtomicUsize,
    pub interrupts: AtomicUsize,
    pub kills: AtomicUsize,
    pub fail_launch: AtomicBool,
    pub ignore_interrupt: AtomicBool,
    pub crashed: AtomicBool,
    pub last_args: Mutex<Vec<String>>,
}

impl FakeProcess {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn interrupts(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct FakeLauncher {
    pub process: Arc<FakeProcess>,
}

impl FakeLauncher {
    pub fn new() -> (Self, Arc<FakeProcess>) {
        let launcher = Self::default();
        let process = launcher.process.clone();
        (launcher, process)
    }
}

#[async_trait::async_trait]
impl CaptureLauncher for FakeLauncher {
    async fn launch(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<Box<dyn CaptureChild>, CaptureError> {
        if self.process.fail_launch.load(Ordering::SeqCst) {
            return Err(CaptureError::Spawn {
                program: program.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such program"),
            });
        }

        self.process.launches.fetch_add(1, Ordering::SeqCst);
        *self.process.last_args.lock().unwrap() = args.to_vec();

        Ok(Box::new(FakeChild {
            process: self.process.clone(),
            killed: false,
        }))
    }
}

struct FakeChild {
    process: Arc<FakeProcess>,
    killed: bool,
}

#[async_trait::async_trait]
impl CaptureChild for FakeChild {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    fn interrupt(&mut self) -> Result<(), CaptureError> {
        self.process.interrupts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn kill(&mut self) -> Result<(), CaptureError> {
        self.process.kills.fetch_add(1, Ordering::SeqCst);
        self.killed = true;
        Ok(())
    }

    fn try_wait(&mut self) -> Result<Option<Option<i32>>, CaptureError> {
        if self.process.crashed.load(Ordering::SeqCst) {
            return Ok(Some(Some(1)));
        }
        Ok(None)
    }

    async fn wait(&mut self) -> Result<Option<i32>, CaptureError> {
        if self.killed {
            return Ok(None);
        }
        if self.process.ignore_interrupt.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(Some(0))
    }
}
