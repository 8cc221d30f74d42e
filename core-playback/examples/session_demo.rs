//! Session controller walkthrough
//!
//! Two presenters share one engine, the first frame arrives late, and the
//! bound presenter goes away. A toy engine logs every command it receives.
//!
//! Run with:
//! ```bash
//! cargo run -p core-playback --example session_demo
//!
//! # JSON output
//! cargo run -p core-playback --example session_demo -- json
//! ```

use anyhow::{Context, Result};
use bridge_traits::{
    BoxFit, ControllerId, Cue, EngineCapabilities, EngineEvent, EngineEventSink, EngineFactory,
    EngineState, LoadErrorPolicy, LogLevel, MediaEngine, MediaItem, Presenter, PresenterId,
    TrackGroup, TrackSelectionParameters, VideoSize,
};
use core_playback::{AcquireRequest, CommandContext, InitArgs, SessionController};
use core_runtime::config::ControllerConfig;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

// ============================================================================
// Toy Engine
// ============================================================================

#[derive(Default)]
struct ToyState {
    state: Option<EngineState>,
    play_when_ready: bool,
    volume: f32,
    position: Duration,
}

struct ToyEngine {
    state: Mutex<ToyState>,
}

impl ToyEngine {
    fn new() -> Self {
        Self {
            state: Mutex::new(ToyState {
                volume: 1.0,
                ..ToyState::default()
            }),
        }
    }
}

impl MediaEngine for ToyEngine {
    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities::default()
    }

    fn set_media_items(&self, items: Vec<MediaItem>) {
        info!(count = items.len(), "engine: set_media_items");
    }

    fn prepare(&self) -> bridge_traits::Result<()> {
        info!("engine: prepare");
        self.state.lock().state = Some(EngineState::Buffering);
        Ok(())
    }

    fn play(&self) {
        info!("engine: play");
        self.state.lock().play_when_ready = true;
    }

    fn pause(&self) {
        info!("engine: pause");
        self.state.lock().play_when_ready = false;
    }

    fn set_play_when_ready(&self, play_when_ready: bool) {
        self.state.lock().play_when_ready = play_when_ready;
    }

    fn seek_to(&self, position: Duration) {
        info!(position_ms = position.as_millis() as u64, "engine: seek");
        self.state.lock().position = position;
    }

    fn set_speed(&self, _speed: f32) {}

    fn set_repeat(&self, _repeat: bool) {}

    fn set_volume(&self, volume: f32) {
        info!(volume, "engine: set_volume");
        self.state.lock().volume = volume;
    }

    fn apply_track_selection(&self, _parameters: &TrackSelectionParameters) {}

    fn release(&self) {
        info!("engine: release");
    }

    fn state(&self) -> EngineState {
        self.state.lock().state.unwrap_or(EngineState::Idle)
    }

    fn is_playing(&self) -> bool {
        let state = self.state.lock();
        state.play_when_ready && state.state == Some(EngineState::Ready)
    }

    fn play_when_ready(&self) -> bool {
        self.state.lock().play_when_ready
    }

    fn volume(&self) -> f32 {
        self.state.lock().volume
    }

    fn speed(&self) -> f32 {
        1.0
    }

    fn position(&self) -> Duration {
        self.state.lock().position
    }

    fn duration(&self) -> Option<Duration> {
        Some(Duration::from_secs(60))
    }

    fn buffered_position(&self) -> Duration {
        self.state.lock().position
    }

    fn track_groups(&self) -> Vec<TrackGroup> {
        Vec::new()
    }

    fn current_cues(&self) -> Vec<Cue> {
        Vec::new()
    }

    fn video_size(&self) -> Option<VideoSize> {
        Some(VideoSize::new(1280, 720))
    }
}

#[derive(Default)]
struct ToyFactory {
    sink: Mutex<Option<Arc<dyn EngineEventSink>>>,
}

impl EngineFactory for ToyFactory {
    fn create(
        &self,
        controller_id: &ControllerId,
        events: Arc<dyn EngineEventSink>,
        _load_policy: Arc<dyn LoadErrorPolicy>,
    ) -> bridge_traits::Result<Box<dyn MediaEngine>> {
        info!(%controller_id, "factory: creating engine");
        *self.sink.lock() = Some(events);
        Ok(Box::new(ToyEngine::new()))
    }
}

struct ToyPresenter(PresenterId);

impl Presenter for ToyPresenter {
    fn id(&self) -> PresenterId {
        self.0
    }

    fn bind(&self, _engine: &dyn MediaEngine) {
        info!(presenter = %self.0, "presenter: bind");
    }

    fn unbind(&self) {
        info!(presenter = %self.0, "presenter: unbind");
    }

    fn set_box_fit(&self, fit: BoxFit) {
        info!(presenter = %self.0, ?fit, "presenter: box fit");
    }
}

// ============================================================================
// Walkthrough
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let format = match std::env::args().nth(1).as_deref() {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };
    init_logging(
        LoggingConfig::default()
            .with_format(format)
            .with_level(LogLevel::Debug)
            .with_filter("core_playback=debug,session_demo=info"),
    )
    .context("initializing logging")?;

    let factory = Arc::new(ToyFactory::default());
    let config = ControllerConfig::builder()
        .engine_factory(factory.clone())
        .build()
        .context("building controller config")?;
    let controller = SessionController::spawn(config);

    let id = ControllerId::from("hero-banner");
    let init = InitArgs::from_json(&json!({
        "autoPlay": true,
        "playlist": [{ "url": "https://cdn.example.com/hero.m3u8?token=secret" }],
        "playbackOptions": { "maxRetryCount": 5 },
    }))?;

    let first: Arc<dyn Presenter> = Arc::new(ToyPresenter(PresenterId(1)));
    let second: Arc<dyn Presenter> = Arc::new(ToyPresenter(PresenterId(2)));

    controller
        .acquire(AcquireRequest::new(id.clone(), first.clone(), init.clone()))
        .await?;
    controller
        .acquire(AcquireRequest::new(id.clone(), second.clone(), init))
        .await?;

    let mut progress = controller.subscribe_progress(id.clone()).await?;
    info!(snapshot = ?progress.recv().await?, "Initial progress");

    // The engine becomes ready but never reports a first frame
    let sink = factory
        .sink
        .lock()
        .clone()
        .context("engine was not created")?;
    sink.deliver(EngineEvent::StateChanged(EngineState::Ready));
    tokio::time::sleep(Duration::from_millis(800)).await;

    controller
        .execute_method(
            id.clone(),
            CommandContext::new(PresenterId(2)),
            "setBoxFit",
            &json!({ "fit": "cover" }),
        )
        .await?;

    info!(snapshot = ?progress.recv().await?, "Progress after fallback");

    // The bound presenter goes away; the first one takes over
    controller.release(id.clone(), PresenterId(2)).await?;
    let session = controller.inspect(id.clone()).await?;
    info!(?session, "After releasing the bound presenter");

    controller.release(id, PresenterId(1)).await?;
    controller.shutdown().await?;
    Ok(())
}
