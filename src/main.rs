use anyhow::{Context, Result};
use clap::Parser;
use meeting_bot::telemetry::spawn_heartbeat;
use meeting_bot::{
    create_router, AppState, CaptureSupervisor, Config, EventCode, EventReporter, MeetingSession,
    NatsReporter, NatsSurface, ProcessLauncher, SessionStatusHandle, TracingReporter,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "meeting-bot", version, about = "Join a meeting, record it, and leave on cue")]
struct Args {
    /// Config file, without extension
    #[arg(long, default_value = "config/meeting-bot")]
    config: String,

    /// Bot settings as JSON, replacing the [bot] config section
    #[arg(long, env = "BOT_DATA")]
    bot_data: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if let Some(data) = &args.bot_data {
        cfg.apply_bot_data(data)?;
    }

    info!("Meeting Bot v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let session_config = cfg.session_config()?;
    let heartbeat_interval = cfg.bot()?.heartbeat_interval();
    let session_id = session_config.session_id.clone();

    let nats = NatsReporter::connect(&cfg.nats.url, &cfg.nats.subject_prefix, session_id.clone())
        .await?;
    let client = nats.client().clone();

    let reporter: Arc<dyn EventReporter> = if cfg.nats.publish_events {
        Arc::new(nats)
    } else {
        info!("Event publishing disabled; events are only logged");
        Arc::new(TracingReporter::new(session_id.clone()))
    };

    let surface = Arc::new(NatsSurface::new(
        client,
        &cfg.nats.subject_prefix,
        &session_id,
        cfg.surface,
    ));

    if let Err(e) = reporter.report(EventCode::ReadyToDeploy, None).await {
        error!("Failed to report {}: {:#}", EventCode::ReadyToDeploy.as_str(), e);
    }
    let heartbeat = spawn_heartbeat(reporter.clone(), heartbeat_interval);

    let status = SessionStatusHandle::default();
    if cfg.service.http.enabled {
        let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind status API to {}", addr))?;
        info!("Status API listening on {}", addr);

        let app = create_router(AppState::new(status.clone()));
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("Status API stopped: {}", e);
            }
        });
    }

    let capture = CaptureSupervisor::new(cfg.capture.clone(), Box::new(ProcessLauncher));
    let session = MeetingSession::new(
        session_config,
        cfg.selectors.clone(),
        surface,
        reporter.clone(),
        capture,
    )?
    .with_status(status);

    let code = match session.run().await {
        Ok(artifact) => {
            info!(
                "Recording saved to {} ({})",
                artifact.recording_path.display(),
                artifact.content_type
            );
            0
        }
        Err(e) => {
            error!("Session ended without joining: {}", e);
            e.exit_code()
        }
    };

    heartbeat.abort();
    std::process::exit(code);
}
