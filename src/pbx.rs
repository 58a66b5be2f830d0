//! PBX ring-group updater
//!
//! Applies a list of recipients to the configured ring groups via the PBX
//! GraphQL API, then triggers a configuration reload. All calls are issued
//! sequentially in slot order; an individual failure never aborts the
//! sequence, it is recorded in the [`UpdateResult`] and the remaining calls
//! are still attempted. There is no rollback: a mid-sequence failure can
//! leave the PBX with a mix of old and new assignments, which is why the
//! caller logs the full result for operator visibility.

use serde_json::json;
use tracing::{info, warn};

use crate::config::Config;
use crate::redact;
use crate::schedule::Recipient;
use crate::token::AccessToken;

/// Statically configured ring-group slot. One recipient maps to one slot,
/// in schedule order.
#[derive(Debug, Clone)]
pub struct RingGroupSlot {
    pub group_number: String,
    pub description: String,
    pub ring_time: u32,
}

/// Build the slot table from config: group identifiers paired with their
/// ring-time policy, labelled with the 1-based slot position.
pub fn slots_from_config(config: &Config) -> Vec<RingGroupSlot> {
    config
        .ring_groups
        .iter()
        .zip(config.ring_times.iter())
        .enumerate()
        .map(|(i, (group, &ring_time))| RingGroupSlot {
            group_number: group.clone(),
            description: format!("On-call {}", i + 1),
            ring_time,
        })
        .collect()
}

/// GraphQL mutation assigning one recipient to one ring group.
/// The trailing `#` on the extension list marks the end of dialing.
pub fn ring_group_mutation(slot: &RingGroupSlot, recipient: &Recipient, fixed_cid: &str) -> String {
    format!(
        "mutation {{ updateRingGroup(input: {{ \
         groupNumber: \"{}\", \
         description: \"{}\", \
         extensionList: \"{}#\", \
         strategy: \"ringall\", \
         ringTime: \"{}\", \
         changecid: \"fixed\", \
         fixedcid: \"{}\" \
         }}) {{ message status }} }}",
        slot.group_number, slot.description, recipient.number, slot.ring_time, fixed_cid
    )
}

/// GraphQL mutation applying the staged configuration
pub fn reload_mutation() -> String {
    "mutation { doreload(input: {}) { message status transaction_id } }".to_string()
}

/// Outcome of a single PBX call: the HTTP status we got back, or the
/// transport error that prevented one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    Status(u16),
    Failed(String),
}

impl CallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Status(s) if (200..300).contains(s))
    }
}

impl std::fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallOutcome::Status(s) => write!(f, "{}", s),
            CallOutcome::Failed(e) => write!(f, "error({})", e),
        }
    }
}

/// Per-call outcomes of one full update sequence: N ring-group mutations
/// followed by one reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    pub groups: Vec<CallOutcome>,
    pub reload: CallOutcome,
}

impl UpdateResult {
    pub fn all_succeeded(&self) -> bool {
        self.groups.iter().all(CallOutcome::is_success) && self.reload.is_success()
    }

    /// Operator-readable one-liner for logs and alert emails
    pub fn summary(&self) -> String {
        let groups: Vec<String> = self.groups.iter().map(|o| o.to_string()).collect();
        format!("groups=[{}], reload={}", groups.join(", "), self.reload)
    }
}

pub struct PbxUpdater {
    client: reqwest::Client,
    gql_url: String,
    slots: Vec<RingGroupSlot>,
    fixed_cid: String,
}

impl PbxUpdater {
    pub fn new(
        client: reqwest::Client,
        gql_url: String,
        slots: Vec<RingGroupSlot>,
        fixed_cid: String,
    ) -> Self {
        Self {
            client,
            gql_url,
            slots,
            fixed_cid,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        Self::new(
            client,
            config.pbx_gql_url.clone(),
            slots_from_config(config),
            config.pbx_cid.clone(),
        )
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Apply `recipients` to the slots, one mutation per slot in order,
    /// then reload. Callers must have checked that `recipients` lines up
    /// with the slot table.
    ///
    /// Never fails as a whole: each call's outcome is recorded and the
    /// sequence always runs to completion.
    pub async fn apply(&self, token: &AccessToken, recipients: &[Recipient]) -> UpdateResult {
        debug_assert_eq!(recipients.len(), self.slots.len());

        let mut groups = Vec::with_capacity(self.slots.len());

        for (slot, recipient) in self.slots.iter().zip(recipients.iter()) {
            info!(
                group = %slot.group_number,
                recipient = %redact::dial_target(&recipient.number),
                ring_time = slot.ring_time,
                "updating ring group"
            );
            let query = ring_group_mutation(slot, recipient, &self.fixed_cid);
            let outcome = self.post_mutation(token, &query).await;
            if !outcome.is_success() {
                warn!(group = %slot.group_number, outcome = %outcome, "ring group update failed");
            }
            groups.push(outcome);
        }

        info!("reloading PBX configuration");
        let reload = self.post_mutation(token, &reload_mutation()).await;
        if !reload.is_success() {
            warn!(outcome = %reload, "PBX reload failed");
        }

        UpdateResult { groups, reload }
    }

    async fn post_mutation(&self, token: &AccessToken, query: &str) -> CallOutcome {
        let result = self
            .client
            .post(&self.gql_url)
            .bearer_auth(&token.value)
            .json(&json!({ "query": query }))
            .send()
            .await;

        match result {
            Ok(response) => CallOutcome::Status(response.status().as_u16()),
            Err(e) => CallOutcome::Failed(e.to_string()),
        }
    }
}
