//! # Session Controller
//!
//! The async front door of the playback core.
//!
//! A [`SessionController`] owns a background tokio task that holds the
//! [`SessionRegistry`] and drains one unbounded queue of [`ControlMessage`]s:
//! UI commands, acquisitions, engine callbacks and timer firings all go
//! through the same queue, so every session mutation happens on a single
//! control context in arrival order.
//!
//! ```text
//!   UI transport ──┐
//!   engine sinks ──┼──> mpsc queue ──> control task ──> SessionRegistry
//!   timers ────────┘                        │
//!                                           └──> event channels ──> UI
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let controller = SessionController::spawn(config);
//!
//! let key = controller
//!     .acquire(AcquireRequest::new(id.clone(), presenter, InitArgs::from_json(&args)?))
//!     .await?;
//! let mut progress = controller.subscribe_progress(id.clone()).await?;
//!
//! controller
//!     .execute_method(id, CommandContext::new(presenter_id), "play", &Value::Null)
//!     .await?;
//! ```

use bridge_traits::{ControllerId, EngineEvent, Presenter, PresenterId};
use core_runtime::config::ControllerConfig;
use core_runtime::events::{CueEvent, ProgressEvent, TrackListEvent};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::commands::{CommandContext, CommandReply, PlayerCommand};
use crate::error::{PlaybackError, Result};
use crate::fanout::{Subscription, SubscriptionId};
use crate::registry::{AcquireRequest, SessionInfo, SessionRegistry};
use crate::scheduler::{SessionKey, TimerMessage, TokioScheduler};

/// Everything the control task reacts to.
pub enum ControlMessage {
    Acquire {
        request: AcquireRequest,
        reply: oneshot::Sender<Result<SessionKey>>,
    },
    Release {
        controller_id: ControllerId,
        presenter: PresenterId,
        reply: Option<oneshot::Sender<bool>>,
    },
    AttachPresenter {
        controller_id: ControllerId,
        presenter: Arc<dyn Presenter>,
        reply: oneshot::Sender<Result<()>>,
    },
    DetachPresenter {
        controller_id: ControllerId,
        presenter: PresenterId,
        reply: oneshot::Sender<Result<()>>,
    },
    Command {
        controller_id: ControllerId,
        context: CommandContext,
        command: PlayerCommand,
        reply: oneshot::Sender<Result<CommandReply>>,
    },
    Engine {
        key: SessionKey,
        event: EngineEvent,
    },
    Timer(TimerMessage),
    SubscribeProgress {
        controller_id: ControllerId,
        reply: oneshot::Sender<Result<Subscription<ProgressEvent>>>,
    },
    SubscribeTracks {
        controller_id: ControllerId,
        reply: oneshot::Sender<Result<Subscription<TrackListEvent>>>,
    },
    SubscribeCues {
        controller_id: ControllerId,
        reply: oneshot::Sender<Result<Subscription<CueEvent>>>,
    },
    Unsubscribe {
        key: SessionKey,
        subscription: SubscriptionId,
    },
    Inspect {
        controller_id: ControllerId,
        reply: oneshot::Sender<Option<SessionInfo>>,
    },
    Shutdown {
        reply: Option<oneshot::Sender<()>>,
    },
}

impl fmt::Debug for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMessage::Acquire { request, .. } => {
                f.debug_struct("Acquire").field("request", request).finish()
            }
            ControlMessage::Release {
                controller_id,
                presenter,
                ..
            } => f
                .debug_struct("Release")
                .field("controller_id", controller_id)
                .field("presenter", presenter)
                .finish(),
            ControlMessage::AttachPresenter {
                controller_id,
                presenter,
                ..
            } => f
                .debug_struct("AttachPresenter")
                .field("controller_id", controller_id)
                .field("presenter", &presenter.id())
                .finish(),
            ControlMessage::DetachPresenter {
                controller_id,
                presenter,
                ..
            } => f
                .debug_struct("DetachPresenter")
                .field("controller_id", controller_id)
                .field("presenter", presenter)
                .finish(),
            ControlMessage::Command {
                controller_id,
                command,
                ..
            } => f
                .debug_struct("Command")
                .field("controller_id", controller_id)
                .field("command", command)
                .finish(),
            ControlMessage::Engine { key, event } => f
                .debug_struct("Engine")
                .field("key", key)
                .field("event", event)
                .finish(),
            ControlMessage::Timer(message) => f.debug_tuple("Timer").field(message).finish(),
            ControlMessage::SubscribeProgress { controller_id, .. }
            | ControlMessage::SubscribeTracks { controller_id, .. }
            | ControlMessage::SubscribeCues { controller_id, .. } => f
                .debug_struct("Subscribe")
                .field("controller_id", controller_id)
                .finish(),
            ControlMessage::Unsubscribe { key, subscription } => f
                .debug_struct("Unsubscribe")
                .field("key", key)
                .field("subscription", subscription)
                .finish(),
            ControlMessage::Inspect { controller_id, .. } => f
                .debug_struct("Inspect")
                .field("controller_id", controller_id)
                .finish(),
            ControlMessage::Shutdown { .. } => f.write_str("Shutdown"),
        }
    }
}

/// Sends `Shutdown` when the last controller handle goes away.
struct ShutdownGuard {
    tx: mpsc::UnboundedSender<ControlMessage>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(ControlMessage::Shutdown { reply: None });
    }
}

/// Cloneable handle to the control task.
#[derive(Clone)]
pub struct SessionController {
    tx: mpsc::UnboundedSender<ControlMessage>,
    _guard: Arc<ShutdownGuard>,
}

impl SessionController {
    /// Start the control task on the current tokio runtime.
    pub fn spawn(config: ControllerConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Arc::new(TokioScheduler::new(tx.clone()));
        let registry = SessionRegistry::new(config, scheduler);

        tokio::spawn(control_loop(registry, rx, tx.clone()));
        info!("Session controller started");

        Self {
            tx: tx.clone(),
            _guard: Arc::new(ShutdownGuard { tx }),
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ControlMessage,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| PlaybackError::ControllerClosed)?;
        rx.await.map_err(|_| PlaybackError::ControllerClosed)
    }

    pub async fn acquire(&self, request: AcquireRequest) -> Result<SessionKey> {
        self.request(|reply| ControlMessage::Acquire { request, reply })
            .await?
    }

    /// Returns `true` if this release destroyed the session.
    pub async fn release(&self, controller_id: ControllerId, presenter: PresenterId) -> Result<bool> {
        self.request(|reply| ControlMessage::Release {
            controller_id,
            presenter,
            reply: Some(reply),
        })
        .await
    }

    /// Fire-and-forget release for `Drop` impls of host presenters.
    pub fn release_detached(&self, controller_id: ControllerId, presenter: PresenterId) {
        let _ = self.tx.send(ControlMessage::Release {
            controller_id,
            presenter,
            reply: None,
        });
    }

    pub async fn attach_presenter(
        &self,
        controller_id: ControllerId,
        presenter: Arc<dyn Presenter>,
    ) -> Result<()> {
        self.request(|reply| ControlMessage::AttachPresenter {
            controller_id,
            presenter,
            reply,
        })
        .await?
    }

    pub async fn detach_presenter(&self, controller_id: ControllerId, presenter: PresenterId) -> Result<()> {
        self.request(|reply| ControlMessage::DetachPresenter {
            controller_id,
            presenter,
            reply,
        })
        .await?
    }

    pub async fn execute(
        &self,
        controller_id: ControllerId,
        context: CommandContext,
        command: PlayerCommand,
    ) -> Result<CommandReply> {
        self.request(|reply| ControlMessage::Command {
            controller_id,
            context,
            command,
            reply,
        })
        .await?
    }

    /// Parse and execute a raw method call, answering in wire form.
    pub async fn execute_method(
        &self,
        controller_id: ControllerId,
        context: CommandContext,
        method: &str,
        args: &Value,
    ) -> Result<Value> {
        let command = PlayerCommand::from_method_call(method, args)?;
        let reply = self.execute(controller_id, context, command).await?;
        Ok(reply.to_json())
    }

    pub async fn subscribe_progress(&self, controller_id: ControllerId) -> Result<Subscription<ProgressEvent>> {
        self.request(|reply| ControlMessage::SubscribeProgress {
            controller_id,
            reply,
        })
        .await?
    }

    pub async fn subscribe_tracks(&self, controller_id: ControllerId) -> Result<Subscription<TrackListEvent>> {
        self.request(|reply| ControlMessage::SubscribeTracks {
            controller_id,
            reply,
        })
        .await?
    }

    pub async fn subscribe_cues(&self, controller_id: ControllerId) -> Result<Subscription<CueEvent>> {
        self.request(|reply| ControlMessage::SubscribeCues {
            controller_id,
            reply,
        })
        .await?
    }

    pub async fn inspect(&self, controller_id: ControllerId) -> Result<Option<SessionInfo>> {
        self.request(|reply| ControlMessage::Inspect {
            controller_id,
            reply,
        })
        .await
    }

    /// Destroy every session and stop the control task.
    pub async fn shutdown(&self) -> Result<()> {
        self.request(|reply| ControlMessage::Shutdown { reply: Some(reply) })
            .await
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Make a subscription report its own drop back to the control task.
fn unsubscribe_on_drop<T: Clone>(
    tx: &mpsc::UnboundedSender<ControlMessage>,
    registry: &SessionRegistry,
    controller_id: &ControllerId,
    subscription: Subscription<T>,
) -> Subscription<T> {
    let Some(key) = registry.session_key(controller_id) else {
        return subscription;
    };
    let tx = tx.clone();
    subscription.on_drop(move |id| {
        let _ = tx.send(ControlMessage::Unsubscribe {
            key,
            subscription: id,
        });
    })
}

async fn control_loop(
    mut registry: SessionRegistry,
    mut rx: mpsc::UnboundedReceiver<ControlMessage>,
    tx: mpsc::UnboundedSender<ControlMessage>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            ControlMessage::Acquire { request, reply } => {
                let _ = reply.send(registry.acquire(request));
            }
            ControlMessage::Release {
                controller_id,
                presenter,
                reply,
            } => {
                let destroyed = registry.release(&controller_id, presenter);
                if let Some(reply) = reply {
                    let _ = reply.send(destroyed);
                }
            }
            ControlMessage::AttachPresenter {
                controller_id,
                presenter,
                reply,
            } => {
                let _ = reply.send(registry.attach_presenter(&controller_id, presenter));
            }
            ControlMessage::DetachPresenter {
                controller_id,
                presenter,
                reply,
            } => {
                let _ = reply.send(registry.detach_presenter(&controller_id, presenter));
            }
            ControlMessage::Command {
                controller_id,
                context,
                command,
                reply,
            } => {
                let _ = reply.send(registry.execute(&controller_id, &context, command));
            }
            ControlMessage::Engine { key, event } => registry.handle_engine_event(&key, event),
            ControlMessage::Timer(message) => registry.handle_timer(message),
            ControlMessage::SubscribeProgress {
                controller_id,
                reply,
            } => {
                let result = registry
                    .subscribe_progress(&controller_id)
                    .map(|sub| unsubscribe_on_drop(&tx, &registry, &controller_id, sub));
                let _ = reply.send(result);
            }
            ControlMessage::SubscribeTracks {
                controller_id,
                reply,
            } => {
                let result = registry
                    .subscribe_tracks(&controller_id)
                    .map(|sub| unsubscribe_on_drop(&tx, &registry, &controller_id, sub));
                let _ = reply.send(result);
            }
            ControlMessage::SubscribeCues {
                controller_id,
                reply,
            } => {
                let result = registry
                    .subscribe_cues(&controller_id)
                    .map(|sub| unsubscribe_on_drop(&tx, &registry, &controller_id, sub));
                let _ = reply.send(result);
            }
            ControlMessage::Unsubscribe { key, subscription } => {
                registry.unsubscribe(&key, &subscription);
            }
            ControlMessage::Inspect {
                controller_id,
                reply,
            } => {
                let _ = reply.send(registry.info(&controller_id));
            }
            ControlMessage::Shutdown { reply } => {
                registry.shutdown();
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                break;
            }
        }
    }
    debug!("Session control loop stopped");
}
