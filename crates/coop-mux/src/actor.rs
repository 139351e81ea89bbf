//! Coordinator Actor
//!
//! Runs the [`Coordinator`] engine on a single tokio task. Radio payloads,
//! fixture discovery and queries arrive on a command channel; the engine's
//! timers are serviced by sleeping until its next deadline. Because every
//! mutation happens on this task, events are handled strictly in arrival
//! order and no timer can interleave with an event half-way through.
//!
//! # Example
//!
//! ```rust,ignore
//! use coop_mux::{run_coordinator, CoordinatorCommand, CoordinatorConfig, EventSink};
//! use tokio::sync::mpsc;
//!
//! let (cmd_tx, cmd_rx) = mpsc::channel(64);
//! let (radio_tx, mut radio_rx) = mpsc::channel(16);
//!
//! tokio::spawn(run_coordinator(
//!     CoordinatorConfig::default(),
//!     cmd_rx,
//!     radio_tx,
//!     Box::new(driver),
//!     EventSink::default(),
//! ));
//!
//! cmd_tx
//!     .send(CoordinatorCommand::RadioPayload { payload: "FINAL|C59|0|120".into() })
//!     .await?;
//! ```

use coop_protocol::ControllerId;
use coop_render::{BulbDriver, Channel};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::engine::{Coordinator, CoordinatorOutput, CoordinatorSnapshot};
use crate::error::{ConfigError, CoordinatorError};
use crate::history::{EventSink, Subscription};

/// Commands sent to the coordinator actor
#[derive(Debug)]
pub enum CoordinatorCommand {
    /// A payload received over the radio
    RadioPayload {
        payload: String,
    },

    /// A fixture announced itself (new or back online)
    FixtureDiscovered {
        id: String,
    },

    /// A fixture went offline
    FixtureLost {
        id: String,
    },

    /// Reassign a channel to another controller
    AssignChannel {
        channel: Channel,
        controller: Option<ControllerId>,
    },

    /// Request a snapshot of the coordinator state
    QuerySnapshot {
        response: oneshot::Sender<CoordinatorSnapshot>,
    },

    /// Subscribe to controller events
    Subscribe {
        response: oneshot::Sender<Subscription>,
    },

    /// Shut down the actor
    Shutdown,
}

/// Cloneable sender side of the actor's command channel
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<CoordinatorCommand>,
}

impl CoordinatorHandle {
    pub fn new(tx: mpsc::Sender<CoordinatorCommand>) -> Self {
        Self { tx }
    }

    async fn send(&self, cmd: CoordinatorCommand) -> Result<(), CoordinatorError> {
        self.tx.send(cmd).await.map_err(|_| CoordinatorError::Stopped)
    }

    /// Forward a payload received over the radio
    pub async fn radio_payload(&self, payload: impl Into<String>) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::RadioPayload {
            payload: payload.into(),
        })
        .await
    }

    pub async fn fixture_discovered(&self, id: impl Into<String>) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::FixtureDiscovered { id: id.into() })
            .await
    }

    pub async fn fixture_lost(&self, id: impl Into<String>) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::FixtureLost { id: id.into() })
            .await
    }

    pub async fn snapshot(&self) -> Result<CoordinatorSnapshot, CoordinatorError> {
        let (response, rx) = oneshot::channel();
        self.send(CoordinatorCommand::QuerySnapshot { response })
            .await?;
        rx.await.map_err(|_| CoordinatorError::Stopped)
    }

    pub async fn subscribe(&self) -> Result<Subscription, CoordinatorError> {
        let (response, rx) = oneshot::channel();
        self.send(CoordinatorCommand::Subscribe { response }).await?;
        rx.await.map_err(|_| CoordinatorError::Stopped)
    }

    pub async fn shutdown(&self) -> Result<(), CoordinatorError> {
        self.send(CoordinatorCommand::Shutdown).await
    }
}

/// Run the coordinator actor
///
/// Broadcast payloads are pushed to `radio_tx` without waiting; if the radio
/// task is not keeping up the payload is dropped with a warning, and the next
/// change is sent on a later poll. Returns once [`CoordinatorCommand::Shutdown`]
/// is received or every command sender is dropped.
///
/// # Arguments
///
/// * `config` - Coordinator configuration, validated before the loop starts
/// * `cmd_rx` - Receiver for commands sent to the actor
/// * `radio_tx` - Sender for outbound radio payloads
/// * `bulbs` - Driver the fixture color commands are delivered to
/// * `sink` - Event sink that decoded frames are published to
pub async fn run_coordinator(
    config: CoordinatorConfig,
    mut cmd_rx: mpsc::Receiver<CoordinatorCommand>,
    radio_tx: mpsc::Sender<String>,
    mut bulbs: Box<dyn BulbDriver>,
    mut sink: EventSink,
) -> Result<(), ConfigError> {
    let mut coordinator = Coordinator::new(config, Instant::now())?;
    info!("Coordinator actor started");

    loop {
        let deadline = coordinator.next_deadline();

        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else { break; };
                match cmd {
                    CoordinatorCommand::RadioPayload { payload } => {
                        let _ = coordinator.handle_payload(&payload, Instant::now());
                    }

                    CoordinatorCommand::FixtureDiscovered { id } => {
                        if let Err(e) = coordinator.fixture_discovered(&id) {
                            debug!("Fixture {} not registered: {}", id, e);
                        }
                    }

                    CoordinatorCommand::FixtureLost { id } => {
                        coordinator.fixture_lost(&id);
                    }

                    CoordinatorCommand::AssignChannel { channel, controller } => {
                        coordinator.assign_channel(channel, controller);
                    }

                    CoordinatorCommand::QuerySnapshot { response } => {
                        let _ = response.send(coordinator.snapshot());
                    }

                    CoordinatorCommand::Subscribe { response } => {
                        let _ = response.send(sink.subscribe());
                    }

                    CoordinatorCommand::Shutdown => {
                        info!("Coordinator actor shutting down");
                        break;
                    }
                }
            }

            _ = sleep_until(deadline) => {
                coordinator.on_timer(Instant::now());
            }
        }

        deliver(
            coordinator.drain_outputs(),
            &radio_tx,
            bulbs.as_mut(),
            &mut sink,
        );
    }

    info!("Coordinator actor stopped");
    Ok(())
}

/// Hand engine outputs to the radio, the bulbs and the sink
///
/// Delivery is fire-and-forget: failures are logged and never retried.
fn deliver(
    outputs: Vec<CoordinatorOutput>,
    radio_tx: &mpsc::Sender<String>,
    bulbs: &mut dyn BulbDriver,
    sink: &mut EventSink,
) {
    for output in outputs {
        match output {
            CoordinatorOutput::Broadcast(frame) => match frame.to_payload() {
                Ok(payload) => {
                    if let Err(e) = radio_tx.try_send(payload) {
                        warn!("Dropping broadcast {}: {}", frame, e);
                    }
                }
                Err(e) => warn!("Dropping broadcast {}: {}", frame, e),
            },

            CoordinatorOutput::SetColor {
                fixture,
                color,
                fade,
            } => {
                if let Err(e) = bulbs.set_color(&fixture, color, fade) {
                    warn!("Color command to {} failed: {}", fixture, e);
                }
            }

            CoordinatorOutput::Event(event) => sink.publish(event),
        }
    }
}
