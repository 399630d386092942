use crate::session::SessionStatusHandle;

/// Shared application state for HTTP handlers
#[derive(Clone, Default)]
pub struct AppState {
    /// Status of the bot session run by this process
    pub status: SessionStatusHandle,
}

impl AppState {
    pub fn new(status: SessionStatusHandle) -> Self {
        Self { status }
    }
}
