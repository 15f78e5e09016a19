//! Runs a server command and waits for it to finish.
//!
//! Commands are asynchronous on the server side: submitting one only queues
//! it. The waiter polls the command status at a fixed interval for a bounded
//! time, and re-submits the command when an attempt times out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::arr::{ApiError, CommandBody, CommandState, CommandStatus, MediaServerApi};

/// Polling and retry budget for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Time between two status checks.
    pub poll_interval: Duration,
    /// Longest time a single attempt polls before giving up.
    pub max_wait: Duration,
    /// Number of submit+poll attempts.
    pub retries: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(30),
            retries: 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("timeout checking command {0}, not completed")]
    NotCompleted(String),

    #[error("deadline reached while waiting for command {0}")]
    DeadlineExceeded(String),

    #[error("waiting for command {0} was cancelled")]
    Cancelled(String),

    #[error("command {name} rejected: {source}")]
    Rejected {
        name: String,
        #[source]
        source: ApiError,
    },
}

/// Source of time for the waiter.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock, sleeping the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Where an attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Submitted,
    Polling,
    Completed,
    Failed,
}

/// Submits commands and waits for their completion.
pub struct CommandWaiter<'a, A: MediaServerApi + ?Sized, C: Clock = SystemClock> {
    api: &'a A,
    policy: WaitPolicy,
    clock: C,
    deadline: Option<Instant>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl<'a, A: MediaServerApi + ?Sized> CommandWaiter<'a, A, SystemClock> {
    pub fn new(api: &'a A, policy: WaitPolicy) -> Self {
        Self::with_clock(api, policy, SystemClock)
    }
}

impl<'a, A: MediaServerApi + ?Sized, C: Clock> CommandWaiter<'a, A, C> {
    pub fn with_clock(api: &'a A, policy: WaitPolicy, clock: C) -> Self {
        Self {
            api,
            policy,
            clock,
            deadline: None,
            cancelled: None,
        }
    }

    /// Stop waiting once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Stop waiting as soon as `flag` is raised.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    pub fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    /// Submit `command` and wait until the server reports it completed.
    pub fn execute_and_wait(&self, command: &CommandBody) -> Result<CommandStatus, CommandError> {
        let name = command.name.as_str();
        let attempts = self.policy.retries.max(1);

        for attempt in 1..=attempts {
            self.check_interrupted(name)?;

            let submitted = match self.api.execute_command(command) {
                Ok(status) => status,
                Err(e) if !e.is_retryable() => {
                    return Err(CommandError::Rejected {
                        name: name.to_string(),
                        source: e,
                    })
                }
                Err(e) => {
                    warn!(
                        "Submitting {} failed (attempt {} of {}): {}",
                        name, attempt, attempts, e
                    );
                    continue;
                }
            };
            debug!("{} {:?} as command {}", name, WaitState::Submitted, submitted.id);

            if let Some(status) = self.poll_until_completed(name, submitted.id)? {
                info!("Finished {} successfully", name);
                return Ok(status);
            }
            if attempt < attempts {
                info!("Timeout, retrying {}: {} of {}", name, attempt, attempts);
            }
        }

        debug!("{} {:?}", name, WaitState::Failed);
        Err(CommandError::NotCompleted(name.to_string()))
    }

    /// Poll one submitted command. `Ok(None)` when the attempt ran out of time.
    fn poll_until_completed(
        &self,
        name: &str,
        id: i64,
    ) -> Result<Option<CommandStatus>, CommandError> {
        let started = self.clock.now();
        let interval = self.policy.poll_interval;

        while self.clock.now().duration_since(started) + interval <= self.policy.max_wait {
            self.check_interrupted(name)?;
            if let Some(deadline) = self.deadline {
                if self.clock.now() + interval > deadline {
                    return Err(CommandError::DeadlineExceeded(name.to_string()));
                }
            }

            self.clock.sleep(interval);

            match self.api.get_command_status(id) {
                Ok(status) if status.state == CommandState::Completed => {
                    debug!("{} {:?}", name, WaitState::Completed);
                    return Ok(Some(status));
                }
                Ok(status) => {
                    debug!("{} {:?}: {:?}", name, WaitState::Polling, status.state);
                    info!("Waiting response from {}", name);
                }
                Err(ApiError::Unauthorized) => {
                    return Err(CommandError::Rejected {
                        name: name.to_string(),
                        source: ApiError::Unauthorized,
                    })
                }
                Err(e) => warn!("Checking status of {} failed: {}", name, e),
            }
        }

        Ok(None)
    }

    fn check_interrupted(&self, name: &str) -> Result<(), CommandError> {
        if let Some(flag) = &self.cancelled {
            if flag.load(Ordering::SeqCst) {
                return Err(CommandError::Cancelled(name.to_string()));
            }
        }
        if let Some(deadline) = self.deadline {
            if self.clock.now() >= deadline {
                return Err(CommandError::DeadlineExceeded(name.to_string()));
            }
        }
        Ok(())
    }
}

/// Clock that only moves when slept on, for tests.
#[cfg(test)]
pub(crate) struct ManualClock {
    origin: Instant,
    elapsed: std::cell::Cell<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: std::cell::Cell::new(Duration::ZERO),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }
}

#[cfg(test)]
impl Clock for &ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }

    fn sleep(&self, duration: Duration) {
        self.elapsed.set(self.elapsed.get() + duration);
    }
}
