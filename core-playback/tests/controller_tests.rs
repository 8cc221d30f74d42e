//! Session controller tests
//!
//! Runs the real control task and tokio timers on a paused clock.

mod common;

use bridge_traits::{ControllerId, EngineEvent, EngineState, Presenter, PresenterId};
use common::*;
use core_playback::{
    AcquireRequest, CommandContext, InitArgs, MediaSource, PlaybackError, SessionController,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn id() -> ControllerId {
    ControllerId::Numeric(11)
}

fn spawn() -> (SessionController, Arc<FakeEngineFactory>) {
    init_tracing();
    let factory = Arc::new(FakeEngineFactory::new().with_groups(sample_groups()));
    let controller = SessionController::spawn(config(&factory));
    (controller, factory)
}

async fn acquire(controller: &SessionController, presenter: &Arc<FakePresenter>, init: InitArgs) {
    controller
        .acquire(AcquireRequest::new(id(), common::presenter(presenter), init))
        .await
        .expect("acquire");
}

fn playlist() -> InitArgs {
    let args = json!({
        "autoPlay": true,
        "playlist": [{ "url": "https://cdn.example.com/live.m3u8", "isLive": true }],
    });
    InitArgs::from_json(&args).expect("valid init args")
}

#[tokio::test(start_paused = true)]
async fn test_progress_ticks_every_interval() {
    let (controller, factory) = spawn();
    let p = FakePresenter::new(1);
    acquire(&controller, &p, playlist()).await;

    let mut progress = controller.subscribe_progress(id()).await.unwrap();
    let initial = progress.recv().await.unwrap();
    assert_eq!(initial.position_ms, 0);

    factory.engine().set_position(Duration::from_millis(2_000));
    let start = Instant::now();
    let tick = progress.recv().await.unwrap();

    assert_eq!(tick.position_ms, 2_000);
    assert!(start.elapsed() >= Duration::from_millis(500));
    assert!(start.elapsed() < Duration::from_millis(600));
}

#[tokio::test(start_paused = true)]
async fn test_fallback_fires_after_700ms() {
    let (controller, factory) = spawn();
    let p = FakePresenter::new(1);
    acquire(&controller, &p, playlist()).await;

    let engine = factory.engine();
    engine.set_state(EngineState::Ready);
    factory
        .sink()
        .deliver(EngineEvent::StateChanged(EngineState::Ready));

    tokio::time::sleep(Duration::from_millis(690)).await;
    controller.inspect(id()).await.unwrap();
    assert_eq!(engine.count(&Call::Play), 0);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let info = controller.inspect(id()).await.unwrap().unwrap();
    assert_eq!(engine.count(&Call::Play), 1);
    assert!(!info.audio_suppressed);
    assert!(!info.pending_play_once_ready);
}

#[tokio::test(start_paused = true)]
async fn test_first_frame_beats_fallback() {
    let (controller, factory) = spawn();
    let p = FakePresenter::new(1);
    acquire(&controller, &p, playlist()).await;

    let engine = factory.engine();
    engine.set_state(EngineState::Ready);
    let sink = factory.sink();
    sink.deliver(EngineEvent::StateChanged(EngineState::Ready));
    tokio::time::sleep(Duration::from_millis(100)).await;
    sink.deliver(EngineEvent::FirstFrameRendered);

    tokio::time::sleep(Duration::from_secs(2)).await;
    controller.inspect(id()).await.unwrap();
    assert_eq!(engine.count(&Call::Play), 1);
}

#[tokio::test(start_paused = true)]
async fn test_execute_method_wire_forms() {
    let (controller, _factory) = spawn();
    let p = FakePresenter::new(1);
    acquire(&controller, &p, playlist()).await;
    let ctx = || CommandContext::new(p.id());

    let tracks = controller
        .execute_method(id(), ctx(), "getAudioTracks", &Value::Null)
        .await
        .unwrap();
    assert_eq!(tracks[0]["id"], "1:0");
    assert_eq!(tracks[0]["label"], "English");

    let ack = controller
        .execute_method(id(), ctx(), "seekTo", &json!({ "millis": 1200 }))
        .await
        .unwrap();
    assert_eq!(ack, Value::Null);

    let pip = controller
        .execute_method(id(), ctx(), "enterPip", &Value::Null)
        .await
        .unwrap();
    assert_eq!(pip, Value::Bool(false));

    let err = controller
        .execute_method(id(), ctx(), "toggleFullscreen", &Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_IMPLEMENTED");

    let err = controller
        .execute_method(id(), ctx(), "seekTo", &json!({ "millis": "soon" }))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_ARGUMENT");

    let err = controller
        .execute_method(ControllerId::Numeric(99), ctx(), "play", &Value::Null)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "UNKNOWN_CONTROLLER");
}

#[tokio::test(start_paused = true)]
async fn test_engine_events_reach_subscribers() {
    let (controller, factory) = spawn();
    let p = FakePresenter::new(1);
    acquire(&controller, &p, playlist()).await;

    let mut tracks = controller.subscribe_tracks(id()).await.unwrap();
    tracks.recv().await.unwrap();

    factory.sink().deliver(EngineEvent::TracksChanged);
    let update = tracks.recv().await.unwrap();
    assert_eq!(update.video.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_release_destroys_and_closes_channels() {
    let (controller, factory) = spawn();
    let p = FakePresenter::new(1);
    acquire(&controller, &p, playlist()).await;
    let mut cues = controller.subscribe_cues(id()).await.unwrap();
    cues.recv().await.unwrap();

    assert!(controller.release(id(), p.id()).await.unwrap());
    assert_eq!(factory.released(), 1);
    assert!(cues.recv().await.is_err());
    assert!(controller.inspect(id()).await.unwrap().is_none());

    // Stale callbacks from the released engine are harmless
    factory.sink().deliver(EngineEvent::FirstFrameRendered);
    assert!(controller.inspect(id()).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_remaining_subscriber_keeps_ticking() {
    let (controller, factory) = spawn();
    let p = FakePresenter::new(1);
    acquire(&controller, &p, playlist()).await;

    let first = controller.subscribe_progress(id()).await.unwrap();
    let mut second = controller.subscribe_progress(id()).await.unwrap();
    second.recv().await.unwrap();
    drop(first);

    factory.engine().set_position(Duration::from_millis(750));
    let tick = second.recv().await.unwrap();
    assert_eq!(tick.position_ms, 750);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_everything() {
    let (controller, factory) = spawn();
    let (p1, p2) = (FakePresenter::new(1), FakePresenter::new(2));
    acquire(&controller, &p1, playlist()).await;
    controller
        .acquire(AcquireRequest::new(
            ControllerId::from("other"),
            common::presenter(&p2),
            InitArgs::default()
                .with_playlist(vec![MediaSource::new("https://cdn.example.com/b.mp4")]),
        ))
        .await
        .unwrap();

    controller.shutdown().await.unwrap();
    assert_eq!(factory.released(), 2);

    let err = controller
        .acquire(AcquireRequest::new(id(), common::presenter(&p1), InitArgs::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, PlaybackError::ControllerClosed));
}

#[tokio::test(start_paused = true)]
async fn test_clone_shares_control_task() {
    let (controller, factory) = spawn();
    let other = controller.clone();
    let p = FakePresenter::new(1);
    acquire(&controller, &p, playlist()).await;

    drop(controller);
    let info = other.inspect(id()).await.unwrap().unwrap();
    assert_eq!(info.ref_count, 1);

    other.release_detached(id(), PresenterId(1));
    other.inspect(id()).await.unwrap();
    assert_eq!(factory.released(), 1);
}
