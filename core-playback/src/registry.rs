//! # Session Registry
//!
//! Maps controller ids to their shared [`Session`].
//!
//! Presenters *acquire* a session when they appear and *release* it when they
//! go away. The first acquisition creates the engine and applies the
//! creation arguments; the last release destroys the session together with
//! its engine. Reference counting is the only teardown trigger.
//!
//! The registry is a plain synchronous state machine. It is driven from the
//! control loop in [`crate::controller`], which serializes every mutation;
//! tests drive it directly with a manual [`Scheduler`].

use bridge_traits::{ControllerId, EngineEvent, Presenter, PresenterId};
use core_runtime::config::ControllerConfig;
use core_runtime::events::{CueEvent, ProgressEvent, TrackListEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, trace};

use crate::commands::{CommandContext, CommandReply, PlayerCommand};
use crate::error::{PlaybackError, Result};
use crate::fanout::{Subscription, SubscriptionId};
use crate::retry::RetryPolicy;
use crate::scheduler::{Scheduler, SessionKey, TimerMessage};
use crate::session::Session;
use crate::source::InitArgs;

/// A presenter asking for the session of `controller_id`.
#[derive(Clone)]
pub struct AcquireRequest {
    pub controller_id: ControllerId,
    pub presenter: Arc<dyn Presenter>,
    pub init: InitArgs,
}

impl AcquireRequest {
    pub fn new(controller_id: ControllerId, presenter: Arc<dyn Presenter>, init: InitArgs) -> Self {
        Self {
            controller_id,
            presenter,
            init,
        }
    }
}

impl std::fmt::Debug for AcquireRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquireRequest")
            .field("controller_id", &self.controller_id)
            .field("presenter", &self.presenter.id())
            .field("init", &self.init)
            .finish()
    }
}

/// Point-in-time view of a session, for hosts and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub key: SessionKey,
    pub ref_count: usize,
    pub bound_presenter: Option<PresenterId>,
    pub presenters: Vec<PresenterId>,
    pub audio_suppressed: bool,
    pub pending_play_once_ready: bool,
    pub has_rendered_first_frame: bool,
    pub looping: bool,
    pub data_saver: bool,
    pub retry_attempts: u32,
}

impl SessionInfo {
    fn of(session: &Session) -> Self {
        Self {
            key: session.key().clone(),
            ref_count: session.ref_count(),
            bound_presenter: session.bound_presenter(),
            presenters: session.presenter_ids(),
            audio_suppressed: session.suppression().audio_suppressed(),
            pending_play_once_ready: session.suppression().pending_play_once_ready(),
            has_rendered_first_frame: session.suppression().has_rendered_first_frame(),
            looping: session.is_looping(),
            data_saver: session.data_saver(),
            retry_attempts: session.retry_attempts(),
        }
    }
}

pub struct SessionRegistry {
    config: Arc<ControllerConfig>,
    scheduler: Arc<dyn Scheduler>,
    sessions: HashMap<ControllerId, Session>,
    next_epoch: u64,
}

impl SessionRegistry {
    pub fn new(config: ControllerConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            config: Arc::new(config),
            scheduler,
            sessions: HashMap::new(),
            next_epoch: 0,
        }
    }

    // ========================================================================
    // Acquisition
    // ========================================================================

    /// Take a reference on the session of `request.controller_id`, creating
    /// it (and its engine) on first use, and attach the presenter.
    ///
    /// Every acquisition replaces the session's playback options.
    #[instrument(skip(self, request), fields(controller_id = %request.controller_id, presenter = %request.presenter.id()))]
    pub fn acquire(&mut self, request: AcquireRequest) -> Result<SessionKey> {
        let AcquireRequest {
            controller_id,
            presenter,
            init,
        } = request;

        match self.sessions.get_mut(&controller_id) {
            Some(session) => {
                session.retain(presenter.id(), init.playback_options.clone());
                debug!(ref_count = session.ref_count(), "Session shared");
            }
            None => {
                let session = self.create_session(&controller_id, presenter.id(), &init)?;
                self.sessions.insert(controller_id.clone(), session);
            }
        }

        let session = self
            .sessions
            .get_mut(&controller_id)
            .ok_or_else(|| PlaybackError::Internal("session vanished during acquire".into()))?;

        if let Some(media_session) = &self.config.media_session {
            media_session.activate(&controller_id);
        }
        session.ensure_initialized(&init);
        session.attach_presenter(&presenter);

        Ok(session.key().clone())
    }

    fn create_session(
        &mut self,
        controller_id: &ControllerId,
        holder: PresenterId,
        init: &InitArgs,
    ) -> Result<Session> {
        self.next_epoch += 1;
        let key = SessionKey::new(controller_id.clone(), self.next_epoch);

        let policy = RetryPolicy::new(init.playback_options.clone());
        let engine = self
            .config
            .engine_factory
            .create(
                controller_id,
                self.scheduler.engine_sink(key.clone()),
                Arc::new(policy.clone()),
            )
            .map_err(PlaybackError::EngineCreation)?;

        info!(session = %key, "Session created");
        Ok(Session::new(
            key,
            holder,
            engine,
            policy,
            Arc::clone(&self.config),
            Arc::clone(&self.scheduler),
        ))
    }

    /// Drop one of `presenter`'s references. Returns `true` if the session
    /// was destroyed. Unknown sessions and presenters holding no reference
    /// are ignored.
    #[instrument(skip(self), fields(controller_id = %controller_id, presenter = %presenter))]
    pub fn release(&mut self, controller_id: &ControllerId, presenter: PresenterId) -> bool {
        let Some(session) = self.sessions.get_mut(controller_id) else {
            debug!("Release for unknown session ignored");
            return false;
        };

        let Some(remaining) = session.release_ref(presenter) else {
            debug!(ref_count = session.ref_count(), "Release without a held reference ignored");
            return false;
        };

        if !session.is_held_by(presenter) {
            if session.is_bound(presenter) {
                session.surface_lost();
            }
            session.detach_presenter(presenter);
        }

        if remaining > 0 {
            debug!(ref_count = remaining, "Session released");
            return false;
        }

        if let Some(session) = self.sessions.remove(controller_id) {
            session.destroy();
        }
        true
    }

    pub fn attach_presenter(
        &mut self,
        controller_id: &ControllerId,
        presenter: Arc<dyn Presenter>,
    ) -> Result<()> {
        self.session_mut(controller_id)?.attach_presenter(&presenter);
        Ok(())
    }

    pub fn detach_presenter(&mut self, controller_id: &ControllerId, presenter: PresenterId) -> Result<()> {
        self.session_mut(controller_id)?.detach_presenter(presenter);
        Ok(())
    }

    // ========================================================================
    // Commands and Callbacks
    // ========================================================================

    #[instrument(skip(self, ctx, command), fields(controller_id = %controller_id, method = command.method()))]
    pub fn execute(
        &mut self,
        controller_id: &ControllerId,
        ctx: &CommandContext,
        command: PlayerCommand,
    ) -> Result<CommandReply> {
        if matches!(command, PlayerCommand::Dispose) {
            if !self.sessions.contains_key(controller_id) {
                return Err(PlaybackError::UnknownController(controller_id.clone()));
            }
            self.release(controller_id, ctx.presenter);
            return Ok(CommandReply::Ack);
        }

        let session = self.session_mut(controller_id)?;
        command.apply(session, ctx)
    }

    /// Route an engine callback. Callbacks from a destroyed session are
    /// dropped.
    pub fn handle_engine_event(&mut self, key: &SessionKey, event: EngineEvent) {
        match self.live_session(key) {
            Some(session) => session.handle_engine_event(event),
            None => trace!(session = %key, ?event, "Dropping engine event for stale session"),
        }
    }

    pub fn handle_timer(&mut self, message: TimerMessage) {
        match self.live_session(&message.key) {
            Some(session) => session.handle_timer(message.kind, message.task),
            None => trace!(session = %message.key, kind = ?message.kind, "Dropping stale timer"),
        }
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub fn subscribe_progress(&mut self, controller_id: &ControllerId) -> Result<Subscription<ProgressEvent>> {
        Ok(self.session_mut(controller_id)?.subscribe_progress())
    }

    pub fn subscribe_tracks(&mut self, controller_id: &ControllerId) -> Result<Subscription<TrackListEvent>> {
        Ok(self.session_mut(controller_id)?.subscribe_tracks())
    }

    pub fn subscribe_cues(&mut self, controller_id: &ControllerId) -> Result<Subscription<CueEvent>> {
        Ok(self.session_mut(controller_id)?.subscribe_cues())
    }

    pub fn unsubscribe(&mut self, key: &SessionKey, subscription: &SubscriptionId) -> bool {
        self.live_session(key)
            .map(|session| session.unsubscribe(subscription))
            .unwrap_or(false)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn contains(&self, controller_id: &ControllerId) -> bool {
        self.sessions.contains_key(controller_id)
    }

    pub fn ref_count(&self, controller_id: &ControllerId) -> Option<usize> {
        self.sessions.get(controller_id).map(Session::ref_count)
    }

    pub fn session(&self, controller_id: &ControllerId) -> Option<&Session> {
        self.sessions.get(controller_id)
    }

    pub fn session_key(&self, controller_id: &ControllerId) -> Option<SessionKey> {
        self.sessions.get(controller_id).map(|s| s.key().clone())
    }

    pub fn info(&self, controller_id: &ControllerId) -> Option<SessionInfo> {
        self.sessions.get(controller_id).map(SessionInfo::of)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Destroy every session regardless of reference counts.
    pub fn shutdown(&mut self) {
        let count = self.sessions.len();
        for (_, session) in self.sessions.drain() {
            session.destroy();
        }
        if count > 0 {
            info!(sessions = count, "Registry shut down");
        }
    }

    fn session_mut(&mut self, controller_id: &ControllerId) -> Result<&mut Session> {
        self.sessions
            .get_mut(controller_id)
            .ok_or_else(|| PlaybackError::UnknownController(controller_id.clone()))
    }

    fn live_session(&mut self, key: &SessionKey) -> Option<&mut Session> {
        self.sessions
            .get_mut(&key.controller_id)
            .filter(|session| session.key() == key)
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("next_epoch", &self.next_epoch)
            .finish()
    }
}
