//! Fixture registry
//!
//! Fixtures announce themselves by hardware id (a MAC address for most bulb
//! drivers) in whatever order discovery happens to find them. The registry
//! keeps the present fixtures sorted by their configured installation order;
//! a fixture's rank among the present ones, not its id, decides which part
//! of the slider range it renders.

use std::fmt;

use tracing::{debug, info, warn};

use crate::color::Rgb;
use crate::error::RenderError;

/// Stable hardware identifier of a fixture
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureId(String);

impl FixtureId {
    /// Create a fixture id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FixtureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A present fixture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureSlot {
    /// Hardware id
    pub id: FixtureId,
    /// Index in the configured installation order
    pub position: usize,
    /// Last color sent to this fixture
    pub last_sent: Option<Rgb>,
}

/// Present fixtures, sorted by installation order
#[derive(Debug, Clone, Default)]
pub struct FixtureRegistry {
    order: Vec<FixtureId>,
    slots: Vec<FixtureSlot>,
}

impl FixtureRegistry {
    /// Create a registry for fixtures installed in `order`
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: order.into_iter().map(FixtureId::new).collect(),
            slots: Vec::new(),
        }
    }

    /// Installation position of a hardware id
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|known| known.as_str() == id)
    }

    /// Register a discovered fixture
    ///
    /// Returns the slot's installation position. A fixture that is already
    /// present (a repeated discovery announcement) keeps its slot; its last
    /// sent color is forgotten so the next frame repaints it.
    pub fn register(&mut self, id: &str) -> Result<usize, RenderError> {
        let Some(position) = self.position_of(id) else {
            warn!("Unknown fixture on the network: {}", id);
            return Err(RenderError::UnknownFixture(id.to_string()));
        };

        if let Some(slot) = self.slots.iter_mut().find(|s| s.position == position) {
            debug!("Fixture {} re-announced", id);
            slot.last_sent = None;
            return Ok(position);
        }

        self.slots.push(FixtureSlot {
            id: FixtureId::new(id),
            position,
            last_sent: None,
        });
        self.slots.sort_by_key(|s| s.position);

        info!("Fixture {} registered at position {}", id, position + 1);
        Ok(position)
    }

    /// Remove a fixture that went offline
    pub fn deregister(&mut self, id: &str) -> Option<FixtureSlot> {
        let index = self.slots.iter().position(|s| s.id.as_str() == id)?;
        let slot = self.slots.remove(index);
        info!("Fixture {} (position {}) disconnected", id, slot.position + 1);
        Some(slot)
    }

    /// Present fixtures in installation order
    pub fn slots(&self) -> &[FixtureSlot] {
        &self.slots
    }

    /// Mutable access for the animator's change tracking
    pub(crate) fn slots_mut(&mut self) -> &mut [FixtureSlot] {
        &mut self.slots
    }

    /// Look up a present fixture
    pub fn get(&self, id: &str) -> Option<&FixtureSlot> {
        self.slots.iter().find(|s| s.id.as_str() == id)
    }

    /// Number of present fixtures
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no fixture is present
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of fixtures in the installation order
    pub fn configured(&self) -> usize {
        self.order.len()
    }
}
