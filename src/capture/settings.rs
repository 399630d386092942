use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the external capture process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Capture executable (looked up on PATH)
    pub program: String,

    /// X display grabbed for video
    pub display: String,

    /// PulseAudio source recorded for audio
    pub audio_source: String,

    pub width: u32,
    pub height: u32,
    pub framerate: u32,

    pub video_codec: String,
    pub preset: String,
    pub crf: u32,

    pub audio_codec: String,
    pub audio_bitrate: String,

    /// Where the recording is written
    pub output_path: PathBuf,

    /// MIME type of the recording
    pub content_type: String,

    /// How long to wait after SIGINT before force-killing
    pub stop_grace_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            display: ":99.0".to_string(),
            audio_source: "VirtualSink.monitor".to_string(),
            width: 1280,
            height: 720,
            framerate: 15,
            video_codec: "libx264".to_string(),
            preset: "medium".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            output_path: PathBuf::from("./recording.mp4"),
            content_type: "video/mp4".to_string(),
            stop_grace_ms: 30_000,
        }
    }
}

impl CaptureSettings {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    /// Argument vector for the capture process. Deterministic for a given
    /// configuration.
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = Vec::with_capacity(32);

        // Video: X11 screen grab
        args.extend(
            [
                "-thread_queue_size",
                "512",
                "-video_size",
            ]
            .map(String::from),
        );
        args.push(format!("{}x{}", self.width, self.height));
        args.push("-framerate".to_string());
        args.push(self.framerate.to_string());
        args.extend(["-f", "x11grab", "-i"].map(String::from));
        args.push(self.display.clone());

        // Audio: PulseAudio monitor
        args.extend(["-thread_queue_size", "512", "-f", "pulse", "-i"].map(String::from));
        args.push(self.audio_source.clone());

        // Encoding
        args.push("-c:v".to_string());
        args.push(self.video_codec.clone());
        args.push("-preset".to_string());
        args.push(self.preset.clone());
        args.push("-crf".to_string());
        args.push(self.crf.to_string());
        args.push("-c:a".to_string());
        args.push(self.audio_codec.clone());
        args.push("-b:a".to_string());
        args.push(self.audio_bitrate.clone());
        args.extend(["-vsync", "2", "-y"].map(String::from));

        args.push(self.output_path.display().to_string());
        args
    }
}
