// src/pacing.rs
//
// Timing for the probe conversation. All waits are expressed in whole
// "units" (one second against real hardware) so the loop can be run with a
// zero unit under test.

use std::time::Duration;

use crate::settings::TimingSettings;

#[derive(Clone, Debug, PartialEq)]
pub struct Pacing {
    /// Length of one time unit.
    pub unit: Duration,
    /// Wait after opening the port; boards that reset on open need to boot.
    pub port_settle: u32,
    /// Wait after the startup directive.
    pub mode_settle: u32,
    /// Wait between `sample` and the first read.
    pub sample_settle: u32,
    /// Empty polls tolerated before a read gives up.
    pub poll_max_wait: u32,
    /// Sleep after each drain before the next `sample`.
    pub sample_period: u32,
}

impl Pacing {
    pub fn units(&self, n: u32) -> Duration {
        self.unit * n
    }

    /// Zero-length units. Every wait returns immediately.
    #[cfg(test)]
    pub fn immediate() -> Self {
        Pacing {
            unit: Duration::ZERO,
            ..Pacing::default()
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing::from(&TimingSettings::default())
    }
}

impl From<&TimingSettings> for Pacing {
    fn from(t: &TimingSettings) -> Self {
        Pacing {
            unit: Duration::from_millis(t.unit_ms),
            port_settle: t.port_settle,
            mode_settle: t.mode_settle,
            sample_settle: t.sample_settle,
            poll_max_wait: t.poll_max_wait,
            sample_period: t.sample_period,
        }
    }
}
