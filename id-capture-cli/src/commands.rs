use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use id_capture_core::{
    CommandOutcome, DeviceDescriptor, MediaDeviceProvider, SessionConfiguration,
    SessionOrchestrator, SessionPhase, SessionSnapshot,
};
use id_capture_linux::{TesseractEngine, V4lDeviceProvider};

use crate::cli::Args;
use crate::delegate::ConsoleDelegate;

type Session = SessionOrchestrator<V4lDeviceProvider, TesseractEngine>;

/// Result of one session, printed with `--json`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub text: Option<String>,
    pub snapshot: SessionSnapshot,
}

/// Load the session configuration, then apply command-line overrides.
pub fn load_configuration(args: &Args) -> Result<SessionConfiguration, String> {
    let mut config = match &args.config {
        Some(path) => read_configuration(path)?,
        None => SessionConfiguration::default(),
    };
    if let Some(language) = &args.language {
        config.language_hint = language.clone();
    }
    config.validate()?;
    Ok(config)
}

fn read_configuration(path: &Path) -> Result<SessionConfiguration, String> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    serde_json::from_str(&raw).map_err(|e| format!("invalid configuration {}: {}", path.display(), e))
}

pub async fn list_devices() -> Result<Vec<DeviceDescriptor>, String> {
    let provider = V4lDeviceProvider::new();
    let devices = provider
        .enumerate_devices()
        .await
        .map_err(|e| e.to_string())?;
    Ok(devices.into_iter().map(DeviceDescriptor::from).collect())
}

/// Run begin → (select) → warm-up → capture → recognize.
pub async fn run_session(args: &Args, config: SessionConfiguration) -> Result<SessionReport, String> {
    let engine = match &args.tesseract {
        Some(program) => TesseractEngine::with_program(program.as_os_str()),
        None => TesseractEngine::new(),
    };

    let mut session: Session = SessionOrchestrator::new(
        Arc::new(V4lDeviceProvider::new()),
        Arc::new(engine),
        config,
    )
    .map_err(|e| e.to_string())?;
    session.set_delegate(Arc::new(ConsoleDelegate::new(args.json)));

    session.begin().await;

    if let Some(device_id) = &args.device {
        if session.select_device(device_id).await == CommandOutcome::Ignored
            && session.selected_device_id().as_deref() != Some(device_id.as_str())
        {
            return Err(format!("cannot use device {}", device_id));
        }
    }

    if session.phase() != SessionPhase::Previewing {
        return Err(failure_message(&session));
    }

    // Let auto-exposure settle before taking the still.
    tokio::time::sleep(Duration::from_millis(args.warmup_ms)).await;

    session.capture().await;
    if session.phase() != SessionPhase::Captured {
        return Err(failure_message(&session));
    }

    session.recognize().await;

    Ok(SessionReport {
        text: session.recognized_text(),
        snapshot: session.snapshot(),
    })
}

fn failure_message(session: &Session) -> String {
    session
        .last_notice()
        .map(|notice| notice.message)
        .unwrap_or_else(|| format!("session stopped in {:?}", session.phase()))
}
