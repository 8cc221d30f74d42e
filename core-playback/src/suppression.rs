//! # First-Frame Suppression
//!
//! Keeps the engine silent and paused until it has something to show.
//!
//! Native engines happily start audio before the first video frame reaches
//! the surface, and on a seek they play a burst of stale audio. The
//! [`Suppression`] machine sits between commands / engine callbacks and the
//! engine: a requested start is remembered as *pending*, the volume is
//! parked at zero, and playback only begins once the first frame has been
//! rendered (or a short fallback timer gives up waiting).
//!
//! The machine is pure. Every input returns the [`Effect`]s to apply to the
//! engine, in order. The session applies them and owns the fallback timer.
//!
//! ## Phases
//!
//! ```text
//!          load/retry/seek            Ready (no frame)
//!  Idle ──────────────────> Preparing ───────────────> ReadyWaitingFirstFrame
//!   ^                          │                          │         │
//!   │ engine idle              │ first frame              │ frame   │ 700 ms
//!   │                          v                          v         v
//!   └──────────────── Playing / PausedOrEnded <────────── start playback
//! ```

use bridge_traits::EngineState;
use std::time::Duration;

/// What the machine needs to know about the engine at the time of an input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSnapshot {
    pub state: EngineState,
    pub is_playing: bool,
    pub play_when_ready: bool,
    pub volume: f32,
}

impl EngineSnapshot {
    pub fn of(engine: &dyn bridge_traits::MediaEngine) -> Self {
        Self {
            state: engine.state(),
            is_playing: engine.is_playing(),
            play_when_ready: engine.play_when_ready(),
            volume: engine.volume(),
        }
    }
}

/// An engine mutation requested by the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    SetVolume(f32),
    SetPlayWhenReady(bool),
    Play,
    Pause,
    SeekTo(Duration),
    Prepare,
    /// Start the first-frame fallback timer.
    ArmFallback,
    /// Cancel the outstanding fallback timer.
    CancelFallback,
}

/// Derived view of where a session is in its start-up sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Preparing,
    Buffering,
    ReadyWaitingFirstFrame,
    Playing,
    PausedOrEnded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suppression {
    pending_play_once_ready: bool,
    has_rendered_first_frame: bool,
    audio_suppressed: bool,
    stored_volume: f32,
    fallback_armed: bool,
}

impl Default for Suppression {
    fn default() -> Self {
        Self {
            pending_play_once_ready: false,
            has_rendered_first_frame: false,
            audio_suppressed: false,
            stored_volume: 1.0,
            fallback_armed: false,
        }
    }
}

impl Suppression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_play_once_ready(&self) -> bool {
        self.pending_play_once_ready
    }

    pub fn has_rendered_first_frame(&self) -> bool {
        self.has_rendered_first_frame
    }

    pub fn audio_suppressed(&self) -> bool {
        self.audio_suppressed
    }

    pub fn fallback_armed(&self) -> bool {
        self.fallback_armed
    }

    /// `is_playing` as reported to listeners: a running engine with parked
    /// audio is still "not playing" from the user's point of view.
    pub fn reported_is_playing(&self, engine: &EngineSnapshot) -> bool {
        engine.is_playing && !self.audio_suppressed
    }

    pub fn phase(&self, engine: &EngineSnapshot) -> Phase {
        match engine.state {
            EngineState::Idle => Phase::Idle,
            EngineState::Buffering if !self.has_rendered_first_frame => Phase::Preparing,
            EngineState::Buffering => Phase::Buffering,
            EngineState::Ready if self.pending_play_once_ready && !self.has_rendered_first_frame => {
                Phase::ReadyWaitingFirstFrame
            }
            EngineState::Ready if engine.is_playing => Phase::Playing,
            EngineState::Ready | EngineState::Ended => Phase::PausedOrEnded,
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub fn play(&mut self, engine: &EngineSnapshot) -> Vec<Effect> {
        let mut fx = Vec::new();
        if self.has_rendered_first_frame {
            self.pending_play_once_ready = false;
            self.restore(&mut fx);
            fx.push(Effect::Play);
        } else {
            self.pending_play_once_ready = true;
            fx.push(Effect::SetPlayWhenReady(false));
            self.suppress(engine, &mut fx);
            if engine.state == EngineState::Ready {
                self.arm_fallback(&mut fx);
            }
        }
        fx
    }

    pub fn pause(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.pending_play_once_ready = false;
        self.cancel_fallback(&mut fx);
        self.restore(&mut fx);
        fx.push(Effect::Pause);
        fx
    }

    pub fn seek(&mut self, engine: &EngineSnapshot, position: Duration) -> Vec<Effect> {
        let mut fx = Vec::new();
        let was_playing =
            self.pending_play_once_ready || engine.is_playing || engine.play_when_ready;
        self.pending_play_once_ready = was_playing;
        self.has_rendered_first_frame = false;
        self.cancel_fallback(&mut fx);
        if was_playing {
            fx.push(Effect::SetPlayWhenReady(false));
            self.suppress(engine, &mut fx);
        } else {
            self.restore(&mut fx);
        }
        fx.push(Effect::SeekTo(position));
        if !was_playing {
            fx.push(Effect::Pause);
        }
        fx
    }

    /// Re-prepare the current media, resuming if anything wanted playback.
    pub fn retry(&mut self, engine: &EngineSnapshot) -> Vec<Effect> {
        let autoplay =
            self.pending_play_once_ready || engine.play_when_ready || engine.is_playing;
        self.restart(engine, autoplay)
    }

    /// Prepare freshly installed media. The caller replaces the playlist
    /// before applying the effects.
    pub fn load(&mut self, engine: &EngineSnapshot, autoplay: bool) -> Vec<Effect> {
        self.restart(engine, autoplay)
    }

    fn restart(&mut self, engine: &EngineSnapshot, autoplay: bool) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.pending_play_once_ready = autoplay;
        self.has_rendered_first_frame = false;
        self.cancel_fallback(&mut fx);
        fx.push(Effect::SetPlayWhenReady(false));
        self.suppress(engine, &mut fx);
        fx.push(Effect::Prepare);
        if !autoplay {
            fx.push(Effect::Pause);
            self.restore(&mut fx);
        }
        fx
    }

    /// `Prepare` failed: nothing will start, give the audio back.
    pub fn on_prepare_failed(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.pending_play_once_ready = false;
        self.cancel_fallback(&mut fx);
        self.restore(&mut fx);
        fx
    }

    /// The bound presenter went away.
    pub fn surface_lost(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.cancel_fallback(&mut fx);
        self.restore(&mut fx);
        self.pending_play_once_ready = false;
        fx
    }

    /// Restore audio unconditionally, used on teardown.
    pub fn release(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.cancel_fallback(&mut fx);
        self.restore(&mut fx);
        self.pending_play_once_ready = false;
        fx
    }

    // ========================================================================
    // Engine Callbacks
    // ========================================================================

    pub fn on_state(&mut self, engine: &EngineSnapshot, state: EngineState) -> Vec<Effect> {
        let mut fx = Vec::new();
        match state {
            EngineState::Buffering => {
                if !self.has_rendered_first_frame && self.pending_play_once_ready {
                    self.suppress(engine, &mut fx);
                }
            }
            EngineState::Ready => {
                if self.has_rendered_first_frame {
                    self.restore(&mut fx);
                    self.attempt_start(false, &mut fx);
                } else {
                    self.arm_fallback(&mut fx);
                }
            }
            EngineState::Ended => {
                self.pending_play_once_ready = false;
                self.cancel_fallback(&mut fx);
                self.restore(&mut fx);
            }
            EngineState::Idle => {
                self.has_rendered_first_frame = false;
                self.cancel_fallback(&mut fx);
                self.restore(&mut fx);
            }
        }
        fx
    }

    pub fn on_first_frame(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.has_rendered_first_frame = true;
        self.cancel_fallback(&mut fx);
        self.restore(&mut fx);
        self.attempt_start(false, &mut fx);
        fx
    }

    /// The fallback timer fired without being cancelled.
    pub fn on_fallback_fired(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.fallback_armed = false;
        if !self.has_rendered_first_frame {
            self.restore(&mut fx);
            self.attempt_start(true, &mut fx);
        }
        fx
    }

    pub fn on_is_playing_changed(&mut self, engine: &EngineSnapshot, is_playing: bool) -> Vec<Effect> {
        let mut fx = Vec::new();
        if !is_playing && engine.state != EngineState::Buffering {
            self.cancel_fallback(&mut fx);
        }
        fx
    }

    pub fn on_error(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.cancel_fallback(&mut fx);
        self.pending_play_once_ready = false;
        self.restore(&mut fx);
        fx
    }

    // ========================================================================
    // Primitives
    // ========================================================================

    fn suppress(&mut self, engine: &EngineSnapshot, fx: &mut Vec<Effect>) {
        if self.audio_suppressed {
            return;
        }
        self.stored_volume = engine.volume;
        self.audio_suppressed = true;
        fx.push(Effect::SetVolume(0.0));
    }

    fn restore(&mut self, fx: &mut Vec<Effect>) {
        if !self.audio_suppressed {
            return;
        }
        self.audio_suppressed = false;
        fx.push(Effect::SetVolume(self.stored_volume));
    }

    fn arm_fallback(&mut self, fx: &mut Vec<Effect>) {
        if self.has_rendered_first_frame || !self.pending_play_once_ready || self.fallback_armed {
            return;
        }
        self.fallback_armed = true;
        fx.push(Effect::ArmFallback);
    }

    fn cancel_fallback(&mut self, fx: &mut Vec<Effect>) {
        if self.fallback_armed {
            self.fallback_armed = false;
            fx.push(Effect::CancelFallback);
        }
    }

    fn attempt_start(&mut self, force: bool, fx: &mut Vec<Effect>) {
        if !self.pending_play_once_ready {
            return;
        }
        if !self.has_rendered_first_frame && !force {
            return;
        }
        self.pending_play_once_ready = false;
        fx.push(Effect::Play);
    }
}
