//! Recording bulb driver

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use coop_render::{BulbDriver, DriverError, FixtureId, Rgb};

/// One command seen by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedColor {
    pub fixture: FixtureId,
    pub color: Rgb,
    pub fade: Duration,
}

#[derive(Debug, Default)]
struct Recording {
    commands: Vec<RecordedColor>,
    offline: HashSet<String>,
}

/// Bulb driver that records commands instead of sending them
///
/// Clones share the same recording, so a test can keep one clone while the
/// coordinator owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingDriver {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        // A poisoned lock still holds a usable recording
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every delivered command, oldest first
    pub fn commands(&self) -> Vec<RecordedColor> {
        self.lock().commands.clone()
    }

    /// Colors delivered to one fixture, oldest first
    pub fn colors_for(&self, fixture: &str) -> Vec<Rgb> {
        self.lock()
            .commands
            .iter()
            .filter(|c| c.fixture.as_str() == fixture)
            .map(|c| c.color)
            .collect()
    }

    /// Most recent color delivered to a fixture
    pub fn last_color(&self, fixture: &str) -> Option<Rgb> {
        self.colors_for(fixture).last().copied()
    }

    pub fn len(&self) -> usize {
        self.lock().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().commands.clear();
    }

    /// Make a fixture reject commands, or accept them again
    pub fn set_offline(&self, fixture: &str, offline: bool) {
        let mut rec = self.lock();
        if offline {
            rec.offline.insert(fixture.to_string());
        } else {
            rec.offline.remove(fixture);
        }
    }
}

impl BulbDriver for RecordingDriver {
    fn set_color(
        &mut self,
        fixture: &FixtureId,
        color: Rgb,
        fade: Duration,
    ) -> Result<(), DriverError> {
        let mut rec = self.lock();
        if rec.offline.contains(fixture.as_str()) {
            return Err(DriverError::Unreachable(fixture.to_string()));
        }
        rec.commands.push(RecordedColor {
            fixture: fixture.clone(),
            color,
            fade,
        });
        Ok(())
    }
}
