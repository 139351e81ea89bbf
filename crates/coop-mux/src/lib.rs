//! Cooperative Slider Coordinator
//!
//! This crate decides which slider controller owns the shared position,
//! when a released slider's value becomes authoritative, and how often the
//! coordinator may broadcast on the shared radio channel.
//!
//! # Architecture
//!
//! - [`PositionStore`] maps channels to their controllers and holds the
//!   per-channel targets and the single broadcast position
//! - [`SettleScheduler`] debounces final positions and follows a struggle
//!   with a fallback re-sync; only one timer is ever pending
//! - [`FlowController`] rate-limits outbound broadcasts with a backoff table
//!   and re-broadcasts after a long idle period
//! - [`Coordinator`] ties these to the animator from `coop-render`; it takes
//!   the current time on every call and buffers its outputs, so it can be
//!   driven deterministically in tests
//! - [`run_coordinator`] runs the engine on a tokio task behind a command
//!   channel
//! - [`EventSink`] retains the last few decoded frames and pushes new ones to
//!   dashboard subscribers
//!
//! # Example
//!
//! ```rust
//! use coop_mux::{Coordinator, CoordinatorConfig, CoordinatorOutput};
//! use std::time::Duration;
//! use tokio::time::Instant;
//!
//! let t0 = Instant::now();
//! let mut coordinator = Coordinator::new(CoordinatorConfig::default(), t0).unwrap();
//!
//! coordinator.handle_payload("FINAL|C59|0|120", t0).unwrap();
//!
//! // Drive the engine from one deadline to the next, as the actor does
//! let mut sent = false;
//! while coordinator.next_deadline() <= t0 + Duration::from_millis(800) {
//!     let at = coordinator.next_deadline();
//!     coordinator.on_timer(at);
//!     sent |= coordinator
//!         .drain_outputs()
//!         .into_iter()
//!         .any(|o| matches!(o, CoordinatorOutput::Broadcast(f) if f.encode() == "CON|C59|120"));
//! }
//! assert!(sent);
//! ```

pub mod actor;
pub mod config;
pub mod engine;
pub mod error;
pub mod flow;
pub mod history;
pub mod resolver;
pub mod store;

pub use actor::{run_coordinator, CoordinatorCommand, CoordinatorHandle};
pub use config::{ChannelMap, CoordinatorConfig, FlowConfig};
pub use engine::{Coordinator, CoordinatorOutput, CoordinatorSnapshot, CoordinatorStats};
pub use error::{ConfigError, CoordinatorError};
pub use flow::FlowController;
pub use history::{ControllerEvent, EventSink, History, Subscription, HISTORY_LEN};
pub use resolver::{PendingSettle, SettleKind, SettleScheduler, SettleState};
pub use store::{ChannelState, PositionStore, SliderPosition};
