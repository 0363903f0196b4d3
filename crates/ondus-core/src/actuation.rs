// ── Valve actuation ──
//
// Snooze, wake, and valve commands for Sense Guard appliances. Snooze
// changes are only reported once the upstream reflects them: after the
// command the appliance is re-fetched with a linearly growing delay
// until it converges or the deadline passes. The cache is flushed on
// every exit path.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::CoreError;
use crate::gateway::Lease;
use crate::model::{Appliance, ApplianceVariant, BatchOutcome, SnoozeState, ValveState};

// ── ConvergencePoll ─────────────────────────────────────────────────

/// Linear backoff towards an absolute deadline.
///
/// The n-th check is preceded by a wait of `base_delay * n`; the last
/// wait is clamped so the final check lands on the deadline.
#[derive(Debug, Clone)]
pub struct ConvergencePoll {
    deadline: Instant,
    base_delay: Duration,
    attempt: u32,
}

impl ConvergencePoll {
    pub fn new(start: Instant, timeout: Duration, base_delay: Duration) -> Self {
        Self {
            deadline: start + timeout,
            base_delay,
            attempt: 0,
        }
    }

    /// How long to wait before the next check, or `None` once the
    /// deadline has passed.
    pub fn next_delay(&mut self, now: Instant) -> Option<Duration> {
        if now >= self.deadline {
            return None;
        }
        self.attempt += 1;
        let step = self.base_delay.saturating_mul(self.attempt);
        Some(step.min(self.deadline - now))
    }

    /// Checks scheduled so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

// ── ActuationController ─────────────────────────────────────────────

#[derive(Clone, Copy)]
pub struct ActuationController<'a> {
    lease: &'a Lease,
}

impl<'a> ActuationController<'a> {
    pub(crate) fn new(lease: &'a Lease) -> Self {
        Self { lease }
    }

    /// Snooze leak reactions for `minutes` and wait until the upstream
    /// reports the valve as snoozed. An active snooze is cancelled first.
    pub async fn snooze(&self, appliance_id: &str, minutes: u32) -> bool {
        info!(appliance_id, minutes, "snoozing appliance");
        let result = self.try_snooze(appliance_id, minutes).await;
        self.lease.flush_all();
        match result {
            Ok(guard) => {
                info!(appliance_id, snoozed_until = ?guard.snoozed_until(), "appliance is snoozing");
                true
            }
            Err(e) => {
                error!(appliance_id, error = %e, "failed to snooze appliance");
                false
            }
        }
    }

    /// Cancel a snooze and wait until the upstream reports it gone.
    pub async fn wake(&self, appliance_id: &str) -> bool {
        info!(appliance_id, "waking appliance");
        let result = self.try_wake(appliance_id).await;
        self.lease.flush_all();
        match result {
            Ok(_) => {
                info!(appliance_id, "appliance is awake");
                true
            }
            Err(e) => {
                error!(appliance_id, error = %e, "failed to wake appliance");
                false
            }
        }
    }

    /// Live valve position. `None` when `appliance_id` is not a known valve.
    pub async fn get_valve_open(&self, appliance_id: &str) -> Result<Option<bool>, CoreError> {
        let Some(guard) = self
            .lease
            .appliances()
            .find_of(ApplianceVariant::ValveGuard, appliance_id)
            .await?
        else {
            return Ok(None);
        };
        let client = self.lease.upstream().await?;
        let document = client
            .get_command(guard.location.id, guard.room.id, &guard.id)
            .await?;
        debug!(appliance_id, valve_open = document.command.valve_open, "valve state read");
        Ok(Some(document.command.valve_open))
    }

    /// Open or close a valve by rewriting its command document.
    pub async fn set_valve_open(&self, appliance_id: &str, open: bool) -> bool {
        info!(appliance_id, open, "setting valve");
        let result = self.try_set_valve_open(appliance_id, open).await;
        self.lease.flush_all();
        match result {
            Ok(()) => true,
            Err(e) => {
                error!(appliance_id, open, error = %e, "failed to set valve");
                false
            }
        }
    }

    // ── Batch helpers ───────────────────────────────────────────────

    /// Snooze state of every matching valve guard.
    pub async fn snooze_states(
        &self,
        location_id: Option<i64>,
        appliance_id: Option<&str>,
    ) -> Result<Vec<SnoozeState>, CoreError> {
        let now = Utc::now();
        Ok(self
            .valve_guards(location_id, appliance_id)
            .await?
            .iter()
            .filter_map(|a| SnoozeState::at(a, now))
            .collect())
    }

    /// Snooze (or, with 0 minutes, wake) every matching valve guard.
    ///
    /// `None` when nothing matched.
    pub async fn set_snooze_all(
        &self,
        location_id: Option<i64>,
        appliance_id: Option<&str>,
        minutes: u32,
    ) -> Result<Option<BatchOutcome<SnoozeState>>, CoreError> {
        let targets = self.valve_guards(location_id, appliance_id).await?;
        if targets.is_empty() {
            return Ok(None);
        }

        let mut partial_failure = false;
        for guard in &targets {
            let converged = if minutes == 0 {
                self.wake(&guard.id).await
            } else {
                self.snooze(&guard.id, minutes).await
            };
            partial_failure |= !converged;
        }

        let states = self.snooze_states(location_id, appliance_id).await?;
        Ok(Some(BatchOutcome {
            states,
            partial_failure,
        }))
    }

    /// Valve position of every matching valve guard.
    pub async fn valve_states(
        &self,
        location_id: Option<i64>,
        appliance_id: Option<&str>,
    ) -> Result<Vec<ValveState>, CoreError> {
        let mut states = Vec::new();
        for guard in self.valve_guards(location_id, appliance_id).await? {
            if let Some(open) = self.get_valve_open(&guard.id).await? {
                states.push(ValveState {
                    appliance_id: guard.id.clone(),
                    appliance_name: guard.name.clone(),
                    open,
                });
            }
        }
        Ok(states)
    }

    /// Open or close every matching valve. Valves already in the target
    /// position are left alone. `None` when nothing matched.
    pub async fn set_valves(
        &self,
        location_id: Option<i64>,
        appliance_id: Option<&str>,
        open: bool,
    ) -> Result<Option<BatchOutcome<ValveState>>, CoreError> {
        let targets = self.valve_guards(location_id, appliance_id).await?;
        if targets.is_empty() {
            return Ok(None);
        }

        let mut partial_failure = false;
        let mut states = Vec::with_capacity(targets.len());
        for guard in &targets {
            let current = match self.get_valve_open(&guard.id).await {
                Ok(current) => current,
                Err(e) => {
                    warn!(appliance_id = %guard.id, error = %e, "failed to read valve state");
                    None
                }
            };
            let now_open = if current == Some(open) {
                debug!(appliance_id = %guard.id, open, "valve already in position");
                open
            } else if self.set_valve_open(&guard.id, open).await {
                open
            } else {
                partial_failure = true;
                current.unwrap_or(!open)
            };
            states.push(ValveState {
                appliance_id: guard.id.clone(),
                appliance_name: guard.name.clone(),
                open: now_open,
            });
        }

        Ok(Some(BatchOutcome {
            states,
            partial_failure,
        }))
    }

    // ── State machines ──────────────────────────────────────────────

    async fn try_snooze(&self, appliance_id: &str, minutes: u32) -> Result<Arc<Appliance>, CoreError> {
        if minutes == 0 {
            return Err(CoreError::InvalidInput {
                message: "snooze duration must be at least one minute".into(),
            });
        }
        let guard = self.require_valve_guard(appliance_id).await?;
        let guard = if guard.is_snoozed() {
            info!(appliance_id, "appliance is already snoozed, waking it first");
            self.try_wake(appliance_id).await?
        } else {
            guard
        };

        let client = self.lease.upstream().await?;
        client
            .snooze(guard.location.id, guard.room.id, &guard.id, minutes)
            .await?;
        self.await_convergence(appliance_id, Appliance::is_snoozed).await
    }

    async fn try_wake(&self, appliance_id: &str) -> Result<Arc<Appliance>, CoreError> {
        let guard = self.require_valve_guard(appliance_id).await?;
        let client = self.lease.upstream().await?;
        client.wake(guard.location.id, guard.room.id, &guard.id).await?;
        self.await_convergence(appliance_id, |a| !a.is_snoozed()).await
    }

    async fn try_set_valve_open(&self, appliance_id: &str, open: bool) -> Result<(), CoreError> {
        let guard = self.require_valve_guard(appliance_id).await?;
        let client = self.lease.upstream().await?;
        let mut document = client
            .get_command(guard.location.id, guard.room.id, &guard.id)
            .await?;
        document.command.valve_open = open;
        client
            .send_command(guard.location.id, guard.room.id, &guard.id, &document)
            .await?;
        Ok(())
    }

    /// Re-fetch the appliance until `converged` holds or the deadline passes.
    async fn await_convergence(
        &self,
        appliance_id: &str,
        converged: impl Fn(&Appliance) -> bool,
    ) -> Result<Arc<Appliance>, CoreError> {
        let config = self.lease.config();
        let mut poll = ConvergencePoll::new(
            Instant::now(),
            config.snooze_timeout,
            config.snooze_poll_delay,
        );

        while let Some(delay) = poll.next_delay(Instant::now()) {
            tokio::time::sleep(delay).await;
            self.lease.flush_all();
            let appliance = self.require_valve_guard(appliance_id).await?;
            if converged(&appliance) {
                debug!(appliance_id, attempts = poll.attempts(), "change confirmed");
                return Ok(appliance);
            }
            debug!(appliance_id, attempt = poll.attempts(), "waiting for appliance to converge");
        }

        Err(CoreError::ConvergenceTimeout {
            appliance_id: appliance_id.to_owned(),
            waited_secs: config.snooze_timeout.as_secs(),
        })
    }

    async fn require_valve_guard(&self, appliance_id: &str) -> Result<Arc<Appliance>, CoreError> {
        self.lease
            .appliances()
            .find_of(ApplianceVariant::ValveGuard, appliance_id)
            .await?
            .ok_or_else(|| CoreError::appliance_not_found(appliance_id))
    }

    async fn valve_guards(
        &self,
        location_id: Option<i64>,
        appliance_id: Option<&str>,
    ) -> Result<Vec<Arc<Appliance>>, CoreError> {
        self.lease
            .appliances()
            .get_appliances_of(ApplianceVariant::ValveGuard, location_id, appliance_id)
            .await
    }
}
