//! Shared fakes for the session integration tests.
//!
//! - [`FakeEngine`] records every command and lets tests steer its state
//! - [`FakeEngineFactory`] hands out fake engines and keeps their handles
//! - [`FakePresenter`] records bind / unbind / box fit calls
//! - [`ManualScheduler`] collects timers so tests fire them explicitly

#![allow(dead_code)]

use bridge_traits::{
    BoxFit, ControllerId, Cue, EngineCapabilities, EngineEvent, EngineEventSink, EngineFactory,
    EngineState, LoadErrorPolicy, MediaEngine, MediaItem, Presenter, PresenterId, TrackFormat,
    TrackGroup, TrackKind, TrackSelectionParameters, VideoSize,
};
use core_playback::{Scheduler, SessionKey, TaskId, TimerHandle, TimerKind, TimerMessage};
use core_runtime::config::ControllerConfig;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetMediaItems(Vec<String>),
    Prepare,
    Play,
    Pause,
    SetPlayWhenReady(bool),
    SeekTo(Duration),
    SetSpeed(f32),
    SetRepeat(bool),
    SetVolume(f32),
    ApplyTrackSelection(TrackSelectionParameters),
    Release,
}

#[derive(Debug)]
pub struct EngineRecord {
    pub calls: Vec<Call>,
    pub state: EngineState,
    pub is_playing: bool,
    pub play_when_ready: bool,
    pub volume: f32,
    pub speed: f32,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub groups: Vec<TrackGroup>,
    pub cues: Vec<Cue>,
    pub video_size: Option<VideoSize>,
    pub fail_prepare: bool,
}

impl Default for EngineRecord {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            state: EngineState::Idle,
            is_playing: false,
            play_when_ready: false,
            volume: 1.0,
            speed: 1.0,
            position: Duration::ZERO,
            duration: None,
            groups: Vec::new(),
            cues: Vec::new(),
            video_size: None,
            fail_prepare: false,
        }
    }
}

#[derive(Clone)]
pub struct FakeEngine {
    capabilities: EngineCapabilities,
    record: Arc<Mutex<EngineRecord>>,
}

impl FakeEngine {
    pub fn new(capabilities: EngineCapabilities, groups: Vec<TrackGroup>) -> Self {
        Self {
            capabilities,
            record: Arc::new(Mutex::new(EngineRecord {
                groups,
                ..EngineRecord::default()
            })),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.record.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.record.lock().calls.clear();
    }

    pub fn count(&self, call: &Call) -> usize {
        self.record.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn volume_now(&self) -> f32 {
        self.record.lock().volume
    }

    pub fn last_selection(&self) -> Option<TrackSelectionParameters> {
        self.record.lock().calls.iter().rev().find_map(|c| match c {
            Call::ApplyTrackSelection(params) => Some(params.clone()),
            _ => None,
        })
    }

    pub fn set_state(&self, state: EngineState) {
        self.record.lock().state = state;
    }

    pub fn set_playing(&self, playing: bool) {
        self.record.lock().is_playing = playing;
    }

    pub fn set_video_size(&self, size: VideoSize) {
        self.record.lock().video_size = Some(size);
    }

    pub fn set_position(&self, position: Duration) {
        self.record.lock().position = position;
    }

    pub fn fail_prepare(&self, fail: bool) {
        self.record.lock().fail_prepare = fail;
    }

    fn push(&self, call: Call) {
        self.record.lock().calls.push(call);
    }
}

impl MediaEngine for FakeEngine {
    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }

    fn set_media_items(&self, items: Vec<MediaItem>) {
        self.push(Call::SetMediaItems(items.into_iter().map(|i| i.uri).collect()));
    }

    fn prepare(&self) -> bridge_traits::Result<()> {
        self.push(Call::Prepare);
        let mut record = self.record.lock();
        if record.fail_prepare {
            return Err(bridge_traits::BridgeError::OperationFailed(
                "decoder unavailable".to_string(),
            ));
        }
        record.state = EngineState::Buffering;
        Ok(())
    }

    fn play(&self) {
        self.push(Call::Play);
        self.record.lock().play_when_ready = true;
    }

    fn pause(&self) {
        self.push(Call::Pause);
        let mut record = self.record.lock();
        record.play_when_ready = false;
        record.is_playing = false;
    }

    fn set_play_when_ready(&self, play_when_ready: bool) {
        self.push(Call::SetPlayWhenReady(play_when_ready));
        self.record.lock().play_when_ready = play_when_ready;
    }

    fn seek_to(&self, position: Duration) {
        self.push(Call::SeekTo(position));
        self.record.lock().position = position;
    }

    fn set_speed(&self, speed: f32) {
        self.push(Call::SetSpeed(speed));
        self.record.lock().speed = speed;
    }

    fn set_repeat(&self, repeat: bool) {
        self.push(Call::SetRepeat(repeat));
    }

    fn set_volume(&self, volume: f32) {
        self.push(Call::SetVolume(volume));
        self.record.lock().volume = volume;
    }

    fn apply_track_selection(&self, parameters: &TrackSelectionParameters) {
        self.push(Call::ApplyTrackSelection(parameters.clone()));
    }

    fn release(&self) {
        self.push(Call::Release);
    }

    fn state(&self) -> EngineState {
        self.record.lock().state
    }

    fn is_playing(&self) -> bool {
        self.record.lock().is_playing
    }

    fn play_when_ready(&self) -> bool {
        self.record.lock().play_when_ready
    }

    fn volume(&self) -> f32 {
        self.record.lock().volume
    }

    fn speed(&self) -> f32 {
        self.record.lock().speed
    }

    fn position(&self) -> Duration {
        self.record.lock().position
    }

    fn duration(&self) -> Option<Duration> {
        self.record.lock().duration
    }

    fn buffered_position(&self) -> Duration {
        self.record.lock().position
    }

    fn track_groups(&self) -> Vec<TrackGroup> {
        self.record.lock().groups.clone()
    }

    fn current_cues(&self) -> Vec<Cue> {
        self.record.lock().cues.clone()
    }

    fn video_size(&self) -> Option<VideoSize> {
        self.record.lock().video_size
    }
}

/// Creates [`FakeEngine`]s and remembers them with their event sinks.
pub struct FakeEngineFactory {
    capabilities: EngineCapabilities,
    groups: Vec<TrackGroup>,
    engines: Mutex<Vec<FakeEngine>>,
    sinks: Mutex<Vec<Arc<dyn EngineEventSink>>>,
    policies: Mutex<Vec<Arc<dyn LoadErrorPolicy>>>,
}

impl FakeEngineFactory {
    pub fn new() -> Self {
        Self::with_capabilities(EngineCapabilities::default())
    }

    pub fn with_capabilities(capabilities: EngineCapabilities) -> Self {
        Self {
            capabilities,
            groups: Vec::new(),
            engines: Mutex::new(Vec::new()),
            sinks: Mutex::new(Vec::new()),
            policies: Mutex::new(Vec::new()),
        }
    }

    pub fn with_groups(mut self, groups: Vec<TrackGroup>) -> Self {
        self.groups = groups;
        self
    }

    pub fn created(&self) -> usize {
        self.engines.lock().len()
    }

    /// The most recently created engine.
    pub fn engine(&self) -> FakeEngine {
        self.engines
            .lock()
            .last()
            .cloned()
            .expect("no engine created yet")
    }

    pub fn sink(&self) -> Arc<dyn EngineEventSink> {
        self.sinks
            .lock()
            .last()
            .cloned()
            .expect("no engine created yet")
    }

    pub fn load_policy(&self) -> Arc<dyn LoadErrorPolicy> {
        self.policies
            .lock()
            .last()
            .cloned()
            .expect("no engine created yet")
    }

    pub fn released(&self) -> usize {
        self.engines
            .lock()
            .iter()
            .map(|engine| engine.count(&Call::Release))
            .sum()
    }
}

impl EngineFactory for FakeEngineFactory {
    fn create(
        &self,
        _controller_id: &ControllerId,
        events: Arc<dyn EngineEventSink>,
        load_policy: Arc<dyn LoadErrorPolicy>,
    ) -> bridge_traits::Result<Box<dyn MediaEngine>> {
        let engine = FakeEngine::new(self.capabilities, self.groups.clone());
        self.engines.lock().push(engine.clone());
        self.sinks.lock().push(events);
        self.policies.lock().push(load_policy);
        Ok(Box::new(engine))
    }
}

// ============================================================================
// Presenter
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PresenterCall {
    Bind,
    Unbind,
    BoxFit(BoxFit),
}

pub struct FakePresenter {
    id: PresenterId,
    calls: Mutex<Vec<PresenterCall>>,
}

impl FakePresenter {
    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id: PresenterId(id),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<PresenterCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: PresenterCall) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    pub fn last(&self) -> Option<PresenterCall> {
        self.calls.lock().last().copied()
    }
}

impl Presenter for FakePresenter {
    fn id(&self) -> PresenterId {
        self.id
    }

    fn bind(&self, _engine: &dyn MediaEngine) {
        self.calls.lock().push(PresenterCall::Bind);
    }

    fn unbind(&self) {
        self.calls.lock().push(PresenterCall::Unbind);
    }

    fn set_box_fit(&self, fit: BoxFit) {
        self.calls.lock().push(PresenterCall::BoxFit(fit));
    }
}

/// Upcast for APIs taking `Arc<dyn Presenter>`.
pub fn presenter(p: &Arc<FakePresenter>) -> Arc<dyn Presenter> {
    Arc::clone(p) as Arc<dyn Presenter>
}

// ============================================================================
// Scheduler
// ============================================================================

#[derive(Debug, Clone)]
pub struct ScheduledTimer {
    pub delay: Duration,
    pub message: TimerMessage,
    pub handle: TimerHandle,
}

/// Collects timers; nothing fires until a test asks for it.
#[derive(Default)]
pub struct ManualScheduler {
    next_task: AtomicU64,
    timers: Mutex<Vec<ScheduledTimer>>,
    events: Arc<Mutex<Vec<(SessionKey, EngineEvent)>>>,
}

impl ManualScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Timers of `kind` that were neither cancelled nor fired.
    pub fn pending(&self, kind: TimerKind) -> Vec<ScheduledTimer> {
        self.timers
            .lock()
            .iter()
            .filter(|t| t.message.kind == kind && !t.handle.is_cancelled())
            .cloned()
            .collect()
    }

    /// Every timer of `kind` ever scheduled.
    pub fn scheduled(&self, kind: TimerKind) -> Vec<ScheduledTimer> {
        self.timers
            .lock()
            .iter()
            .filter(|t| t.message.kind == kind)
            .cloned()
            .collect()
    }

    /// Fire the oldest pending timer of `kind`: it leaves the pending set and
    /// its message is returned for the registry.
    pub fn fire(&self, kind: TimerKind) -> Option<TimerMessage> {
        let mut timers = self.timers.lock();
        let index = timers
            .iter()
            .position(|t| t.message.kind == kind && !t.handle.is_cancelled())?;
        Some(timers.remove(index).message)
    }

    pub fn engine_events(&self) -> Vec<(SessionKey, EngineEvent)> {
        self.events.lock().clone()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, key: SessionKey, kind: TimerKind) -> TimerHandle {
        let task = TaskId(self.next_task.fetch_add(1, Ordering::Relaxed) + 1);
        let handle = TimerHandle::new(task, CancellationToken::new());
        self.timers.lock().push(ScheduledTimer {
            delay,
            message: TimerMessage { key, kind, task },
            handle: handle.clone(),
        });
        handle
    }

    fn engine_sink(&self, key: SessionKey) -> Arc<dyn EngineEventSink> {
        Arc::new(RecordingSink {
            key,
            events: Arc::clone(&self.events),
        })
    }
}

struct RecordingSink {
    key: SessionKey,
    events: Arc<Mutex<Vec<(SessionKey, EngineEvent)>>>,
}

impl EngineEventSink for RecordingSink {
    fn deliver(&self, event: EngineEvent) {
        self.events.lock().push((self.key.clone(), event));
    }
}

// ============================================================================
// Fixtures
// ============================================================================

static NEXT_TEST_LOG: AtomicUsize = AtomicUsize::new(0);

pub fn init_tracing() {
    if NEXT_TEST_LOG.fetch_add(1, Ordering::SeqCst) == 0 {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("core_playback=trace")
            .with_test_writer()
            .try_init();
    }
}

pub fn config(factory: &Arc<FakeEngineFactory>) -> ControllerConfig {
    ControllerConfig::builder()
        .engine_factory(Arc::clone(factory) as Arc<dyn EngineFactory>)
        .build()
        .expect("valid config")
}

fn video(height: u32, width: u32, bitrate: u32, selected: bool) -> TrackFormat {
    TrackFormat {
        width: Some(width),
        height: Some(height),
        bitrate: Some(bitrate),
        supported: true,
        selected,
        ..TrackFormat::default()
    }
}

/// One adaptive video group, one audio group with two languages and one
/// subtitle group.
pub fn sample_groups() -> Vec<TrackGroup> {
    vec![
        TrackGroup {
            kind: TrackKind::Video,
            supported: true,
            tracks: vec![
                video(360, 640, 800_000, false),
                video(720, 1280, 2_500_000, true),
                video(1080, 1920, 5_000_000, false),
            ],
        },
        TrackGroup {
            kind: TrackKind::Audio,
            supported: true,
            tracks: vec![
                TrackFormat {
                    label: Some("English".to_string()),
                    language: Some("en".to_string()),
                    supported: true,
                    selected: true,
                    ..TrackFormat::default()
                },
                TrackFormat {
                    language: Some("vi".to_string()),
                    codecs: Some("mp4a.40.2".to_string()),
                    supported: true,
                    ..TrackFormat::default()
                },
            ],
        },
        TrackGroup {
            kind: TrackKind::Subtitle,
            supported: true,
            tracks: vec![TrackFormat {
                language: Some("en".to_string()),
                supported: true,
                ..TrackFormat::default()
            }],
        },
    ]
}
