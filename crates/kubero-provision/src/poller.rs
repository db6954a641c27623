//! Readiness polling

use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::runner::{CommandLine, CommandRunner};

/// Interval between readiness probes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long a step may wait for its resources to become ready
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(180);

/// A command whose result tells whether a resource is ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    /// Ready once the command exits 0
    Succeeds(CommandLine),
    /// Ready once the command prints something
    NonEmpty(CommandLine),
}

impl Probe {
    /// Underlying command
    pub fn command(&self) -> &CommandLine {
        match self {
            Probe::Succeeds(cmd) | Probe::NonEmpty(cmd) => cmd,
        }
    }

    /// Run the probe once
    pub fn check(&self, runner: &dyn CommandRunner) -> std::result::Result<(), String> {
        match self {
            Probe::Succeeds(cmd) => runner.run(cmd).map(|_| ()).map_err(|e| e.to_string()),
            Probe::NonEmpty(cmd) => match runner.run(cmd) {
                Ok(output) if !output.is_empty() => Ok(()),
                Ok(_) => Err(format!("`{cmd}` returned no output")),
                Err(e) => Err(e.to_string()),
            },
        }
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command())
    }
}

/// Repeats a check at a fixed interval until it passes or a deadline expires
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until `check` succeeds.
    ///
    /// The check runs immediately and then once per interval, and is handed
    /// the time left before the deadline. A check that blocks no longer
    /// than that keeps the whole wait between `timeout` and
    /// `timeout + interval`. Returns the time spent waiting.
    pub fn wait_until<F>(&self, what: &str, timeout: Duration, mut check: F) -> Result<Duration>
    where
        F: FnMut(Duration) -> std::result::Result<(), String>,
    {
        let start = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let last_error = match check(timeout.saturating_sub(start.elapsed())) {
                Ok(()) => {
                    debug!(what, attempt, elapsed = ?start.elapsed(), "ready");
                    return Ok(start.elapsed());
                }
                Err(e) => {
                    trace!(what, attempt, error = %e, "not ready yet");
                    e
                }
            };

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(Error::ReadinessTimeout {
                    probe: what.to_string(),
                    timeout,
                    last_error,
                });
            }

            thread::sleep(self.interval.min(timeout - elapsed));
        }
    }

    /// Poll a [`Probe`] through `runner`
    pub fn wait_for(
        &self,
        runner: &dyn CommandRunner,
        probe: &Probe,
        timeout: Duration,
    ) -> Result<Duration> {
        self.wait_until(&probe.to_string(), timeout, |_| probe.check(runner))
    }

    /// Poll a probe rebuilt for every attempt from the time left
    ///
    /// For probes that block themselves, like `kubectl wait --timeout`.
    pub fn wait_for_with<F>(
        &self,
        runner: &dyn CommandRunner,
        what: &str,
        timeout: Duration,
        probe: F,
    ) -> Result<Duration>
    where
        F: Fn(Duration) -> Probe,
    {
        self.wait_until(what, timeout, |remaining| probe(remaining).check(runner))
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}
