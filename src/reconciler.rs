//! Reconciliation cycle orchestration
//!
//! One cycle: fetch the desired schedule, compare its fingerprint against
//! the last one seen, and when it differs push the assignment into the PBX
//! ring groups and reload. The reconciler owns the only mutable state in
//! the process (the last-seen fingerprint) and wraps the whole cycle so no
//! failure class can take the daemon down; anything unrecoverable goes to
//! the operator via the [`Alerter`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::error::SyncError;
use crate::notify::Alerter;
use crate::pbx::{PbxUpdater, UpdateResult};
use crate::schedule::ScheduleSource;
use crate::token::TokenProvider;

/// What one `run()` invocation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A cycle was already in flight; this one was not started
    Skipped,
    /// Fingerprint unchanged, no PBX calls made
    Unchanged,
    /// Update sequence ran to completion (possibly with per-call failures)
    Applied {
        fingerprint: String,
        result: UpdateResult,
    },
    /// Cycle aborted before the update sequence; already logged/notified
    Failed,
}

/// Advance the fingerprint when everything succeeded, or when the
/// configured policy accepts partial application (the historical default).
pub fn should_advance(all_succeeded: bool, advance_on_partial: bool) -> bool {
    all_succeeded || advance_on_partial
}

pub struct Reconciler<A: Alerter> {
    source: ScheduleSource,
    tokens: TokenProvider,
    pbx: PbxUpdater,
    alerter: A,
    advance_on_partial: bool,
    // Last fully processed schedule fingerprint. None until the first
    // update cycle, so the first run always applies.
    last_seen: Mutex<Option<String>>,
    in_flight: AtomicBool,
}

impl<A: Alerter> Reconciler<A> {
    pub fn new(
        source: ScheduleSource,
        tokens: TokenProvider,
        pbx: PbxUpdater,
        alerter: A,
        advance_on_partial: bool,
    ) -> Self {
        Self {
            source,
            tokens,
            pbx,
            alerter,
            advance_on_partial,
            last_seen: Mutex::new(None),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Last fingerprint a cycle advanced to, if any
    pub fn last_fingerprint(&self) -> Option<String> {
        self.last_seen.lock().unwrap().clone()
    }

    /// Run one reconciliation cycle.
    ///
    /// Non-reentrant: if a previous cycle is still in flight the new one is
    /// skipped and logged, never run concurrently.
    pub async fn run(&self) -> Outcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("previous reconciliation cycle still in flight, skipping this trigger");
            return Outcome::Skipped;
        }

        let outcome = self.run_cycle().await;
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    async fn run_cycle(&self) -> Outcome {
        let schedule = match self.source.fetch().await {
            Ok(schedule) => schedule,
            Err(e) => return self.fail(e).await,
        };

        {
            let last = self.last_seen.lock().unwrap();
            if last.as_deref() == Some(schedule.fingerprint.as_str()) {
                info!(fingerprint = %schedule.fingerprint, "no change in schedule");
                return Outcome::Unchanged;
            }
        }

        info!(fingerprint = %schedule.fingerprint, "schedule change detected, updating PBX");

        // A missing token short-circuits the cycle; we never reach the PBX
        // without a valid bearer token.
        let token = match self.tokens.fetch_token().await {
            Ok(token) => token,
            Err(e) => return self.fail(e).await,
        };

        if schedule.recipients.len() != self.pbx.slot_count() {
            return self
                .fail(SyncError::RecipientCount {
                    got: schedule.recipients.len(),
                    expected: self.pbx.slot_count(),
                })
                .await;
        }

        let result = self.pbx.apply(&token, &schedule.recipients).await;
        info!(result = %result.summary(), "PBX update finished");

        if should_advance(result.all_succeeded(), self.advance_on_partial) {
            *self.last_seen.lock().unwrap() = Some(schedule.fingerprint.clone());
        } else {
            warn!("fingerprint not advanced, next cycle will retry the update");
        }

        if !result.all_succeeded() {
            self.alerter
                .notify(&format!(
                    "PBX update completed with failures: {}",
                    result.summary()
                ))
                .await;
        }

        Outcome::Applied {
            fingerprint: schedule.fingerprint,
            result,
        }
    }

    async fn fail(&self, e: SyncError) -> Outcome {
        error!("reconciliation cycle aborted: {}", e);
        if e.should_notify() {
            self.alerter.notify(&e.to_string()).await;
        }
        Outcome::Failed
    }
}
