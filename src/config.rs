use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::CaptureSettings;
use crate::session::{AutomaticLeaveConfig, SessionConfig};
use crate::surface::{MeetSelectors, SurfaceCapabilities};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub selectors: MeetSelectors,
    #[serde(default)]
    pub surface: SurfaceCapabilities,
    /// Per-session settings; may instead come from `BOT_DATA`
    pub bot: Option<BotSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "meeting-bot".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "127.0.0.1".to_string(),
            port: 8088,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL, used for telemetry and the surface sidecar
    pub url: String,
    pub subject_prefix: String,
    /// Publish events to NATS; when off they are only logged
    pub publish_events: bool,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            subject_prefix: "meetbot".to_string(),
            publish_events: true,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_ms: u64,
    pub observation_capacity: usize,
    pub leave_click_timeout_ms: u64,
    /// Page snapshots are written here when set
    pub debug_dir: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            observation_capacity: 256,
            leave_click_timeout_ms: 1000,
            debug_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingInfo {
    #[serde(alias = "meetingUrl")]
    pub meeting_url: Option<String>,
}

/// Settings of the one session this process runs
#[derive(Debug, Clone, Deserialize)]
pub struct BotSettings {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default, alias = "meetingUrl")]
    pub meeting_url: Option<String>,

    #[serde(default, alias = "meetingInfo")]
    pub meeting_info: Option<MeetingInfo>,

    #[serde(default = "default_display_name", alias = "botDisplayName")]
    pub display_name: String,

    #[serde(default = "default_heartbeat_interval", alias = "heartbeatInterval")]
    pub heartbeat_interval_ms: u64,

    #[serde(default, alias = "automaticLeave")]
    pub automatic_leave: AutomaticLeaveConfig,
}

fn default_display_name() -> String {
    "MeetingBot".to_string()
}

fn default_heartbeat_interval() -> u64 {
    5000
}

impl BotSettings {
    /// Meeting URL, either top-level or under `meeting_info`
    pub fn meeting_url(&self) -> Option<&str> {
        self.meeting_url
            .as_deref()
            .or_else(|| self.meeting_info.as_ref()?.meeting_url.as_deref())
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl Config {
    /// Load from an optional config file plus `MEETBOT__*` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("MEETBOT").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Replace the `bot` section with a JSON document
    pub fn apply_bot_data(&mut self, json: &str) -> Result<()> {
        let bot: BotSettings =
            serde_json::from_str(json).context("Failed to parse bot data")?;
        self.bot = Some(bot);
        Ok(())
    }

    pub fn bot(&self) -> Result<&BotSettings> {
        match &self.bot {
            Some(bot) => Ok(bot),
            None => bail!("No bot settings: provide a [bot] section or BOT_DATA"),
        }
    }

    /// Build the session configuration and validate it
    pub fn session_config(&self) -> Result<SessionConfig> {
        let bot = self.bot()?;
        let Some(meeting_url) = bot.meeting_url() else {
            bail!("Bot settings have no meeting url");
        };

        let mut session = SessionConfig {
            meeting_url: meeting_url.to_string(),
            display_name: bot.display_name.clone(),
            automatic_leave: bot.automatic_leave,
            poll_interval: Duration::from_millis(self.monitor.poll_interval_ms),
            observation_capacity: self.monitor.observation_capacity,
            leave_click_timeout: Duration::from_millis(self.monitor.leave_click_timeout_ms),
            debug_dir: self.monitor.debug_dir.clone(),
            ..Default::default()
        };
        if let Some(id) = &bot.id {
            session.session_id = id.clone();
        }

        session.validate()?;
        Ok(session)
    }
}
