//! Lockout Guard
//!
//! Pure state machine over `(failed_login_count, locked_until)`.
//!
//! ```text
//!             record_failure (count < max)
//!            ┌──────────────┐
//!            ▼              │
//!        Unlocked ──────────┘
//!          ▲   │ record_failure (count reaches max)
//!          │   ▼
//!   expiry │  Locked ── check_access while locked_until > now ──▶ AccountLocked
//!  success │   │
//!   unlock └───┘
//! ```
//!
//! Every transition takes `now` explicitly; callers persist the mutated state
//! through `AccountRepository::modify` so concurrent attempts cannot lose
//! updates.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Lockout thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_failed_attempts: u32,
    pub lockout_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_duration: Duration::minutes(30),
        }
    }
}

/// Persisted lockout counters of an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutState {
    pub failed_login_count: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutState {
    /// Locked means `locked_until` is set and still in the future
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    fn reset(&mut self) {
        self.failed_login_count = 0;
        self.locked_until = None;
    }

    /// Clears a lock whose expiry has passed. Returns true if it did.
    fn expire(&mut self, now: DateTime<Utc>) -> bool {
        match self.locked_until {
            Some(until) if until <= now => {
                self.reset();
                true
            }
            _ => false,
        }
    }
}

/// Result of recording a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureOutcome {
    pub attempts_left: u32,
    /// True only on the transition into Locked
    pub locked_now: bool,
    pub locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LockoutGuard {
    policy: LockoutPolicy,
}

impl LockoutGuard {
    pub fn new(policy: LockoutPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Rejects while locked; lazily unlocks once `locked_until` has passed.
    ///
    /// Returns `Ok(true)` when an expired lock was cleared (state mutated).
    pub fn check_access(&self, state: &mut LockoutState, now: DateTime<Utc>) -> AuthResult<bool> {
        if let Some(until) = state.locked_until.filter(|until| *until > now) {
            let retry_after = (until - now).to_std().unwrap_or_default();
            return Err(AuthError::AccountLocked { retry_after });
        }
        Ok(state.expire(now))
    }

    /// Counts a failed attempt. A still-locked state is left untouched.
    pub fn record_failure(&self, state: &mut LockoutState, now: DateTime<Utc>) -> FailureOutcome {
        if state.is_locked(now) {
            return FailureOutcome {
                attempts_left: 0,
                locked_now: false,
                locked_until: state.locked_until,
            };
        }
        state.expire(now);

        state.failed_login_count = state.failed_login_count.saturating_add(1);
        let locked_now = state.failed_login_count >= self.policy.max_failed_attempts;
        if locked_now {
            state.locked_until = Some(now + self.policy.lockout_duration);
        }

        FailureOutcome {
            attempts_left: self
                .policy
                .max_failed_attempts
                .saturating_sub(state.failed_login_count),
            locked_now,
            locked_until: state.locked_until,
        }
    }

    pub fn record_success(&self, state: &mut LockoutState) {
        state.reset();
    }

    /// Administrative override, regardless of elapsed time
    pub fn force_unlock(&self, state: &mut LockoutState) {
        state.reset();
    }
}
