//! Bulb driver used when no fixture network is attached

use std::time::Duration;

use coop_render::{BulbDriver, DriverError, FixtureId, Rgb};
use tracing::{debug, info};

/// Logs every color command instead of sending it
#[derive(Debug, Default)]
pub struct LoggingDriver {
    sent: u64,
}

impl LoggingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands logged so far
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

/// `#rrggbb` form of a color
pub fn hex(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

impl BulbDriver for LoggingDriver {
    fn set_color(
        &mut self,
        fixture: &FixtureId,
        color: Rgb,
        fade: Duration,
    ) -> Result<(), DriverError> {
        self.sent += 1;
        debug!("Fixture {} -> {} over {:?}", fixture, hex(color), fade);
        Ok(())
    }
}

impl Drop for LoggingDriver {
    fn drop(&mut self) {
        info!("Bulb driver stopped after {} color commands", self.sent());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(hex(Rgb::new(255, 8, 0)), "#ff0800");
        assert_eq!(hex(Rgb::grey(0)), "#000000");
    }

    #[test]
    fn test_counts_commands() {
        let mut driver = LoggingDriver::new();
        let id = FixtureId::new("d073d52bb7d9");
        driver
            .set_color(&id, Rgb::grey(10), Duration::from_millis(125))
            .unwrap();
        driver
            .set_color(&id, Rgb::grey(20), Duration::from_millis(125))
            .unwrap();
        assert_eq!(driver.sent(), 2);
    }
}
