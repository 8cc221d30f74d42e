//! # Playback Session
//!
//! One [`Session`] exists per controller id while at least one presenter
//! holds it. It owns the engine and every piece of state layered on top of
//! it: the presenter backlog, the suppression machine, the track selection,
//! the timers and the event channels.
//!
//! Sessions are only ever touched from the control context (see
//! [`crate::controller`]), so nothing here is synchronized.

use bridge_traits::{
    AspectRatio, BoxFit, EngineCapabilities, EngineError, EngineEvent, EngineState, HostWindow,
    MediaEngine, Presenter, PresenterId, TrackKind, TrackSelectionParameters,
};
use core_runtime::config::{ControllerConfig, PlaybackOptions};
use core_runtime::events::{CueEvent, ProgressEvent, TrackInfo, TrackListEvent};
use core_runtime::logging::redact_url;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{PlaybackError, Result};
use crate::fanout::{self, Channel, FanOut, Subscription, SubscriptionId};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::scheduler::{Scheduler, SessionKey, TaskId, TimerHandle, TimerKind};
use crate::source::{InitArgs, MediaSource};
use crate::suppression::{Effect, EngineSnapshot, Suppression};
use crate::tracks::{self, VideoSelection, VideoTrackId};

/// Weak reference to a presenter, compared by id.
#[derive(Clone)]
struct PresenterSlot {
    id: PresenterId,
    handle: Weak<dyn Presenter>,
}

impl PresenterSlot {
    fn new(presenter: &Arc<dyn Presenter>) -> Self {
        Self {
            id: presenter.id(),
            handle: Arc::downgrade(presenter),
        }
    }

    fn upgrade(&self) -> Option<Arc<dyn Presenter>> {
        self.handle.upgrade()
    }

    fn is_alive(&self) -> bool {
        self.handle.strong_count() > 0
    }
}

pub struct Session {
    key: SessionKey,
    engine: Box<dyn MediaEngine>,
    capabilities: EngineCapabilities,
    config: Arc<ControllerConfig>,
    scheduler: Arc<dyn Scheduler>,
    retry_policy: RetryPolicy,
    /// Outstanding acquisitions per presenter. The session lives while any
    /// entry remains.
    holds: HashMap<PresenterId, usize>,
    initialized: bool,

    /// Every presenter that attached and is not detached yet, oldest first.
    presenters: Vec<PresenterSlot>,
    attached: Option<PresenterSlot>,

    suppression: Suppression,
    last_sources: Vec<MediaSource>,
    track_selection: TrackSelectionParameters,
    manual_video: Option<VideoTrackId>,
    data_saver: bool,
    looping: bool,

    retry_attempts: u32,
    resume_after_retry: bool,

    fallback_timer: Option<TimerHandle>,
    progress_timer: Option<TimerHandle>,
    retry_timer: Option<TimerHandle>,
    track_refresh_timers: Vec<TimerHandle>,

    fanout: FanOut,
}

impl Session {
    pub(crate) fn new(
        key: SessionKey,
        holder: PresenterId,
        engine: Box<dyn MediaEngine>,
        retry_policy: RetryPolicy,
        config: Arc<ControllerConfig>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let capabilities = engine.capabilities();
        let fanout = FanOut::new(config.event_buffer_size);
        Self {
            key,
            engine,
            capabilities,
            config,
            scheduler,
            retry_policy,
            holds: HashMap::from([(holder, 1)]),
            initialized: false,
            presenters: Vec::new(),
            attached: None,
            suppression: Suppression::new(),
            last_sources: Vec::new(),
            track_selection: TrackSelectionParameters::default(),
            manual_video: None,
            data_saver: false,
            looping: false,
            retry_attempts: 0,
            resume_after_retry: false,
            fallback_timer: None,
            progress_timer: None,
            retry_timer: None,
            track_refresh_timers: Vec::new(),
            fanout,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn ref_count(&self) -> usize {
        self.holds.values().sum()
    }

    pub fn is_held_by(&self, presenter: PresenterId) -> bool {
        self.holds.contains_key(&presenter)
    }

    pub fn engine(&self) -> &dyn MediaEngine {
        self.engine.as_ref()
    }

    pub fn suppression(&self) -> &Suppression {
        &self.suppression
    }

    pub fn track_selection(&self) -> &TrackSelectionParameters {
        &self.track_selection
    }

    pub fn bound_presenter(&self) -> Option<PresenterId> {
        self.attached.as_ref().map(|slot| slot.id)
    }

    /// Live presenters, oldest first.
    pub fn presenter_ids(&self) -> Vec<PresenterId> {
        self.presenters
            .iter()
            .filter(|slot| slot.is_alive())
            .map(|slot| slot.id)
            .collect()
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn data_saver(&self) -> bool {
        self.data_saver
    }

    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    pub fn playback_options(&self) -> PlaybackOptions {
        self.retry_policy.options()
    }

    pub fn has_pending_retry(&self) -> bool {
        self.retry_timer.is_some()
    }

    pub fn is_progress_ticking(&self) -> bool {
        self.progress_timer.is_some()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub(crate) fn retain(&mut self, presenter: PresenterId, options: PlaybackOptions) {
        *self.holds.entry(presenter).or_insert(0) += 1;
        self.retry_policy.replace(options);
    }

    /// Drop one of `presenter`'s references. Returns the remaining total, or
    /// `None` if `presenter` holds nothing.
    pub(crate) fn release_ref(&mut self, presenter: PresenterId) -> Option<usize> {
        let held = self.holds.get_mut(&presenter)?;
        *held -= 1;
        if *held == 0 {
            self.holds.remove(&presenter);
        }
        Some(self.ref_count())
    }

    /// Apply the creation arguments of the first acquirer. Later calls are
    /// ignored.
    pub(crate) fn ensure_initialized(&mut self, init: &InitArgs) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        self.data_saver = init.data_saver;
        self.last_sources = init.playlist.clone();

        if !init.playlist.is_empty() {
            let items = init.playlist.iter().map(MediaSource::to_media_item).collect();
            self.engine.set_media_items(items);

            let snapshot = self.snapshot();
            let effects = self.suppression.load(&snapshot, init.start_auto_play);
            if let Err(e) = self.prepare_with(effects) {
                warn!(session = %self.key, error = %e, "Initial prepare failed");
            }

            if init.start_position_ms > 0 {
                self.engine
                    .seek_to(Duration::from_millis(init.start_position_ms));
            }
        }

        self.set_looping(init.looping);
        self.apply_data_saver();

        info!(
            session = %self.key,
            items = init.playlist.len(),
            autoplay = init.start_auto_play,
            "Session initialized"
        );
    }

    /// Tear the session down. Nothing reaches the engine afterwards.
    pub(crate) fn destroy(mut self) {
        self.cancel_all_timers();

        let effects = self.suppression.release();
        self.run(effects);

        if let Some(presenter) = self.attached.take().and_then(|slot| slot.upgrade()) {
            presenter.unbind();
        }
        self.presenters.clear();

        if let Some(media_session) = &self.config.media_session {
            media_session.deactivate(&self.key.controller_id);
        }

        self.engine.release();
        info!(session = %self.key, "Session destroyed");
    }

    fn cancel_all_timers(&mut self) {
        let timers = self
            .fallback_timer
            .take()
            .into_iter()
            .chain(self.progress_timer.take())
            .chain(self.retry_timer.take())
            .chain(self.track_refresh_timers.drain(..));
        for timer in timers {
            timer.cancel();
        }
    }

    // ========================================================================
    // Presenters
    // ========================================================================

    /// Bind `presenter`, unbinding the current one if it differs.
    pub fn attach_presenter(&mut self, presenter: &Arc<dyn Presenter>) {
        let id = presenter.id();
        self.presenters
            .retain(|slot| slot.id != id && slot.is_alive());

        if let Some(current) = self.attached.take() {
            if current.id != id {
                if let Some(previous) = current.upgrade() {
                    previous.unbind();
                }
            }
        }

        let slot = PresenterSlot::new(presenter);
        self.presenters.push(slot.clone());
        self.attached = Some(slot);
        presenter.bind(self.engine.as_ref());

        debug!(session = %self.key, presenter = %id, "Presenter attached");
    }

    /// Remove `id` from the backlog. If it was bound, the most recently
    /// attached live presenter takes over; with none left the engine keeps
    /// running headless.
    pub fn detach_presenter(&mut self, id: PresenterId) {
        let was_bound = self.is_bound(id);
        let detached = if was_bound {
            self.attached.take().and_then(|slot| slot.upgrade())
        } else {
            None
        };

        self.presenters
            .retain(|slot| slot.id != id && slot.is_alive());

        if was_bound {
            let successor = self
                .presenters
                .iter()
                .rev()
                .find_map(|slot| slot.upgrade().map(|p| (slot.clone(), p)));
            if let Some((slot, presenter)) = successor {
                presenter.bind(self.engine.as_ref());
                debug!(session = %self.key, presenter = %slot.id, "Presenter rebound");
                self.attached = Some(slot);
            } else {
                debug!(session = %self.key, "No presenter left, engine running headless");
            }
        }

        if let Some(presenter) = detached {
            presenter.unbind();
        }
    }

    pub fn is_bound(&self, id: PresenterId) -> bool {
        self.bound_presenter() == Some(id)
    }

    /// The bound presenter is going away.
    pub(crate) fn surface_lost(&mut self) {
        let effects = self.suppression.surface_lost();
        self.run(effects);
    }

    pub fn set_box_fit(&self, presenter: PresenterId, fit: BoxFit) -> bool {
        let target = self
            .attached
            .iter()
            .chain(self.presenters.iter())
            .find(|slot| slot.id == presenter)
            .and_then(PresenterSlot::upgrade);
        match target {
            Some(target) => {
                target.set_box_fit(fit);
                true
            }
            None => {
                debug!(session = %self.key, %presenter, "setBoxFit for unknown presenter");
                false
            }
        }
    }

    // ========================================================================
    // Effects
    // ========================================================================

    fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot::of(self.engine.as_ref())
    }

    fn apply(&mut self, effects: Vec<Effect>) -> bridge_traits::Result<()> {
        for effect in effects {
            trace!(session = %self.key, ?effect, "Applying effect");
            match effect {
                Effect::SetVolume(volume) => self.engine.set_volume(volume),
                Effect::SetPlayWhenReady(value) => self.engine.set_play_when_ready(value),
                Effect::Play => self.engine.play(),
                Effect::Pause => self.engine.pause(),
                Effect::SeekTo(position) => self.engine.seek_to(position),
                Effect::Prepare => self.engine.prepare()?,
                Effect::ArmFallback => self.arm_fallback_timer(),
                Effect::CancelFallback => cancel(&mut self.fallback_timer),
            }
        }
        Ok(())
    }

    /// Apply effects that cannot fail.
    fn run(&mut self, effects: Vec<Effect>) {
        if let Err(e) = self.apply(effects) {
            warn!(session = %self.key, error = %e, "Engine rejected effect");
        }
    }

    /// Apply a load/retry sequence; on a failed `Prepare` give the audio back.
    fn prepare_with(&mut self, effects: Vec<Effect>) -> bridge_traits::Result<()> {
        if let Err(e) = self.apply(effects) {
            let effects = self.suppression.on_prepare_failed();
            self.run(effects);
            return Err(e);
        }
        Ok(())
    }

    // ========================================================================
    // Transport Commands
    // ========================================================================

    pub fn play(&mut self) {
        let snapshot = self.snapshot();
        let effects = self.suppression.play(&snapshot);
        self.run(effects);
    }

    pub fn pause(&mut self) {
        let effects = self.suppression.pause();
        self.run(effects);
    }

    pub fn seek_to(&mut self, position: Duration) {
        let snapshot = self.snapshot();
        let effects = self.suppression.seek(&snapshot, position);
        self.run(effects);
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.engine.set_speed(speed);
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        if self.capabilities.native_repeat {
            self.engine.set_repeat(looping);
        }
    }

    /// Prepare the current media again, keeping the intent to play.
    #[instrument(skip(self), fields(session = %self.key))]
    pub fn retry(&mut self) -> Result<()> {
        if self.last_sources.is_empty() {
            return Err(PlaybackError::NoSource);
        }
        cancel(&mut self.retry_timer);

        let snapshot = self.snapshot();
        let effects = self.suppression.retry(&snapshot);
        self.prepare_with(effects)
            .map_err(|e| PlaybackError::RetryFailed(e.to_string()))?;
        info!("Retrying playback");
        Ok(())
    }

    /// Replace the media with `source`, resetting track choices and the
    /// retry counter. The data saver cap survives.
    #[instrument(skip(self, source), fields(session = %self.key, url = %redact_url(&source.url)))]
    pub fn load_media_source(&mut self, source: MediaSource, autoplay: bool) -> Result<()> {
        cancel(&mut self.retry_timer);
        self.retry_attempts = 0;

        self.manual_video = None;
        self.track_selection = TrackSelectionParameters::default();
        self.track_selection
            .set_max_video_bitrate(self.data_saver_cap());
        self.engine.apply_track_selection(&self.track_selection);

        self.engine.set_media_items(vec![source.to_media_item()]);
        self.last_sources = vec![source];

        let snapshot = self.snapshot();
        let effects = self.suppression.load(&snapshot, autoplay);
        self.prepare_with(effects)?;

        info!(autoplay, "Loaded new media source");
        Ok(())
    }

    // ========================================================================
    // Tracks
    // ========================================================================

    pub fn video_tracks(&self) -> Vec<TrackInfo> {
        tracks::video_tracks(&self.engine.track_groups(), self.manual_video.as_ref())
    }

    pub fn audio_tracks(&self) -> Vec<TrackInfo> {
        tracks::audio_tracks(&self.engine.track_groups())
    }

    pub fn subtitle_tracks(&self) -> Vec<TrackInfo> {
        tracks::subtitle_tracks(&self.engine.track_groups())
    }

    pub fn track_list(&self) -> TrackListEvent {
        tracks::track_list(&self.engine.track_groups(), self.manual_video.as_ref())
    }

    pub fn select_video_track(&mut self, id: Option<&str>) {
        let groups = self.engine.track_groups();
        let cap = self.data_saver_cap();
        let selection = tracks::select_video(
            &mut self.track_selection,
            &groups,
            id,
            self.capabilities.video_selection,
            cap,
        );

        match selection {
            VideoSelection::Selected(track) => {
                debug!(session = %self.key, %track, "Video track selected");
                self.manual_video = Some(track);
                self.engine.apply_track_selection(&self.track_selection);
                self.schedule_track_refresh();
            }
            VideoSelection::Cleared => {
                debug!(session = %self.key, "Video track selection cleared");
                self.manual_video = None;
                self.engine.apply_track_selection(&self.track_selection);
                self.emit_tracks();
            }
            VideoSelection::Ignored => {
                debug!(session = %self.key, id = ?id, "Ignoring unknown video track");
            }
        }
    }

    pub fn select_audio_track(&mut self, id: Option<&str>) {
        self.select_positional(TrackKind::Audio, id);
    }

    pub fn select_subtitle_track(&mut self, id: Option<&str>) {
        self.select_positional(TrackKind::Subtitle, id);
    }

    fn select_positional(&mut self, kind: TrackKind, id: Option<&str>) {
        let groups = self.engine.track_groups();
        if tracks::select_positional(&mut self.track_selection, &groups, kind, id) {
            self.engine.apply_track_selection(&self.track_selection);
        } else {
            debug!(session = %self.key, ?kind, id = ?id, "Ignoring unknown track");
        }
    }

    fn data_saver_cap(&self) -> Option<u32> {
        self.data_saver.then_some(self.config.data_saver_bitrate)
    }

    pub fn set_data_saver(&mut self, enable: bool) {
        self.data_saver = enable;
        self.apply_data_saver();
    }

    fn apply_data_saver(&mut self) {
        if self.data_saver {
            self.manual_video = None;
            self.track_selection
                .clear_overrides_of_kind(TrackKind::Video)
                .set_max_video_size(None);
        }
        self.track_selection
            .set_max_video_bitrate(self.data_saver_cap());
        self.engine.apply_track_selection(&self.track_selection);
    }

    fn schedule_track_refresh(&mut self) {
        for timer in self.track_refresh_timers.drain(..) {
            timer.cancel();
        }
        for delay in self.config.track_refresh_delays.clone() {
            let timer = self
                .scheduler
                .schedule(delay, self.key.clone(), TimerKind::TrackRefresh);
            self.track_refresh_timers.push(timer);
        }
    }

    // ========================================================================
    // Picture-in-Picture
    // ========================================================================

    /// Ask the host window to enter picture-in-picture, framed to the video.
    pub fn enter_picture_in_picture(&self, host: Option<&Arc<dyn HostWindow>>) -> bool {
        let Some(host) = host else {
            debug!(session = %self.key, "No host window for picture-in-picture");
            return false;
        };
        if !self.capabilities.picture_in_picture || !host.supports_picture_in_picture() {
            return false;
        }

        let ratio = self
            .engine
            .video_size()
            .filter(|size| size.width > 0 && size.height > 0)
            .map(|size| AspectRatio::new(size.width, size.height))
            .unwrap_or_default();

        match host.enter_picture_in_picture(ratio) {
            Ok(entered) => entered,
            Err(e) => {
                warn!(session = %self.key, error = %e, "Picture-in-picture request failed");
                false
            }
        }
    }

    // ========================================================================
    // Engine Events
    // ========================================================================

    pub(crate) fn handle_engine_event(&mut self, event: EngineEvent) {
        trace!(session = %self.key, ?event, "Engine event");
        match event {
            EngineEvent::StateChanged(state) => {
                let snapshot = self.snapshot();
                let effects = self.suppression.on_state(&snapshot, state);
                self.run(effects);

                if state == EngineState::Ended && self.looping && !self.capabilities.native_repeat {
                    debug!(session = %self.key, "Looping from the start");
                    self.engine.seek_to(Duration::ZERO);
                    self.engine.play();
                }
                self.emit_progress();
            }
            EngineEvent::IsPlayingChanged(is_playing) => {
                let snapshot = self.snapshot();
                let effects = self.suppression.on_is_playing_changed(&snapshot, is_playing);
                self.run(effects);
                self.emit_progress();
            }
            EngineEvent::FirstFrameRendered => {
                if self.retry_attempts > 0 {
                    debug!(
                        session = %self.key,
                        attempts = self.retry_attempts,
                        "Recovered, retry budget restored"
                    );
                    self.retry_attempts = 0;
                }
                let effects = self.suppression.on_first_frame();
                self.run(effects);
                self.emit_progress();
            }
            EngineEvent::TracksChanged => self.emit_tracks(),
            EngineEvent::CuesChanged(cues) => {
                self.fanout.emit_cues(CueEvent {
                    text: tracks::cue_text(&cues),
                });
            }
            EngineEvent::Error(error) => self.on_engine_error(error),
        }
    }

    fn on_engine_error(&mut self, error: EngineError) {
        let message = error.display_message();
        warn!(session = %self.key, error = %message, "Playback error");

        let snapshot = self.snapshot();
        let wanted_playback = self.suppression.pending_play_once_ready()
            || snapshot.play_when_ready
            || snapshot.is_playing;

        self.fanout
            .emit_progress(fanout::error_snapshot(self.engine.as_ref(), message));

        let effects = self.suppression.on_error();
        self.run(effects);

        if self.config.session_auto_retry {
            self.resume_after_retry = wanted_playback;
            self.schedule_auto_retry();
        }
    }

    fn schedule_auto_retry(&mut self) {
        if self.last_sources.is_empty() {
            return;
        }
        self.retry_attempts = self.retry_attempts.saturating_add(1);

        match self.retry_policy.decide(self.retry_attempts) {
            RetryDecision::RetryAfter(delay) => {
                cancel(&mut self.retry_timer);
                self.retry_timer =
                    Some(self.scheduler.schedule(delay, self.key.clone(), TimerKind::Retry));
                info!(
                    session = %self.key,
                    attempt = self.retry_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling automatic retry"
                );
            }
            RetryDecision::Stop => {
                info!(
                    session = %self.key,
                    attempts = self.retry_attempts,
                    "Giving up automatic retries"
                );
            }
        }
    }

    // ========================================================================
    // Timers
    // ========================================================================

    fn arm_fallback_timer(&mut self) {
        cancel(&mut self.fallback_timer);
        self.fallback_timer = Some(self.scheduler.schedule(
            self.config.first_frame_fallback,
            self.key.clone(),
            TimerKind::Fallback,
        ));
    }

    pub(crate) fn handle_timer(&mut self, kind: TimerKind, task: TaskId) {
        match kind {
            TimerKind::Fallback => {
                if !take_if_current(&mut self.fallback_timer, task) {
                    return;
                }
                debug!(session = %self.key, "No first frame in time, starting anyway");
                let effects = self.suppression.on_fallback_fired();
                self.run(effects);
                self.emit_progress();
            }
            TimerKind::ProgressTick => {
                if !take_if_current(&mut self.progress_timer, task) {
                    return;
                }
                self.emit_progress();
                self.ensure_progress_ticking();
            }
            TimerKind::Retry => {
                if !take_if_current(&mut self.retry_timer, task) {
                    return;
                }
                let snapshot = self.snapshot();
                let effects = self.suppression.load(&snapshot, self.resume_after_retry);
                match self.prepare_with(effects) {
                    Ok(()) => info!(session = %self.key, attempt = self.retry_attempts, "Automatic retry"),
                    Err(e) => warn!(session = %self.key, error = %e, "Automatic retry failed"),
                }
            }
            TimerKind::TrackRefresh => {
                let Some(index) = self
                    .track_refresh_timers
                    .iter()
                    .position(|timer| timer.task() == task)
                else {
                    return;
                };
                self.track_refresh_timers.remove(index);
                self.emit_tracks();
            }
        }
    }

    // ========================================================================
    // Event Fan-Out
    // ========================================================================

    fn progress_snapshot(&self) -> ProgressEvent {
        let snapshot = self.snapshot();
        fanout::progress_snapshot(
            self.engine.as_ref(),
            self.suppression.reported_is_playing(&snapshot),
        )
    }

    fn publish_media_session(&self, progress: &ProgressEvent) {
        if let Some(media_session) = &self.config.media_session {
            let state = fanout::media_session_state(progress, self.engine.speed());
            media_session.update(&self.key.controller_id, state);
        }
    }

    fn emit_progress(&mut self) {
        if !self.fanout.has_progress_listeners() {
            return;
        }
        let progress = self.progress_snapshot();
        self.publish_media_session(&progress);
        self.fanout.emit_progress(progress);
    }

    fn emit_tracks(&self) {
        if self.fanout.listener_count(Channel::Tracks) == 0 {
            return;
        }
        self.fanout.emit_tracks(self.track_list());
    }

    fn ensure_progress_ticking(&mut self) {
        if self.progress_timer.is_some() || !self.fanout.has_progress_listeners() {
            return;
        }
        self.progress_timer = Some(self.scheduler.schedule(
            self.config.progress_interval,
            self.key.clone(),
            TimerKind::ProgressTick,
        ));
    }

    pub fn subscribe_progress(&mut self) -> Subscription<ProgressEvent> {
        let initial = self.progress_snapshot();
        self.publish_media_session(&initial);
        let subscription = self.fanout.subscribe_progress(initial);
        self.ensure_progress_ticking();
        subscription
    }

    pub fn subscribe_tracks(&mut self) -> Subscription<TrackListEvent> {
        let initial = self.track_list();
        self.fanout.subscribe_tracks(initial)
    }

    pub fn subscribe_cues(&mut self) -> Subscription<CueEvent> {
        let initial = CueEvent {
            text: tracks::cue_text(&self.engine.current_cues()),
        };
        self.fanout.subscribe_cues(initial)
    }

    /// Forget a subscription; polling stops with the last progress listener.
    pub fn unsubscribe(&mut self, id: &SubscriptionId) -> bool {
        let known = self.fanout.unsubscribe(id).is_some();
        if !self.fanout.has_progress_listeners() {
            cancel(&mut self.progress_timer);
        }
        known
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("ref_count", &self.ref_count())
            .field("bound_presenter", &self.bound_presenter())
            .field("suppression", &self.suppression)
            .field("looping", &self.looping)
            .field("data_saver", &self.data_saver)
            .finish_non_exhaustive()
    }
}

fn cancel(slot: &mut Option<TimerHandle>) {
    if let Some(timer) = slot.take() {
        timer.cancel();
    }
}

fn take_if_current(slot: &mut Option<TimerHandle>, task: TaskId) -> bool {
    if slot.as_ref().map(TimerHandle::task) == Some(task) {
        *slot = None;
        true
    } else {
        trace!(?task, "Ignoring stale timer");
        false
    }
}
