//! In-memory ledger of lesson versions.
//!
//! Versions are keyed by content digest. Commits are serialized behind one
//! lock and must name the current head as their base, so two writers racing
//! from the same version cannot both land.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::domain::{lesson_digest, LessonPlan};

use super::applier::{apply, ApprovedChange, PatchOutcome};
use super::error::{LedgerError, LedgerResult};

#[derive(Debug, Clone, PartialEq)]
pub struct PlanVersion {
    pub digest: String,
    pub parent: Option<String>,
    pub plan: Arc<LessonPlan>,
    pub committed_at: DateTime<Utc>,
    /// Change ids that produced this version from its parent.
    pub applied: Vec<String>,
}

#[derive(Debug)]
struct LedgerState {
    versions: BTreeMap<String, PlanVersion>,
    /// Digests in commit order; the last one is head.
    history: Vec<String>,
}

impl LedgerState {
    fn head(&self) -> Option<&PlanVersion> {
        self.history.last().and_then(|d| self.versions.get(d))
    }
}

#[derive(Debug)]
pub struct PlanLedger {
    state: Mutex<LedgerState>,
}

impl PlanLedger {
    /// Start a ledger whose head is `initial`.
    pub fn new(initial: LessonPlan) -> LedgerResult<Self> {
        let digest = lesson_digest(&initial)?;
        let version = PlanVersion {
            digest: digest.clone(),
            parent: None,
            plan: Arc::new(initial),
            committed_at: Utc::now(),
            applied: Vec::new(),
        };
        Ok(Self {
            state: Mutex::new(LedgerState {
                versions: BTreeMap::from([(digest.clone(), version)]),
                history: vec![digest],
            }),
        })
    }

    pub async fn head(&self) -> LedgerResult<PlanVersion> {
        let state = self.state.lock().await;
        state
            .head()
            .cloned()
            .ok_or_else(|| LedgerError::UnknownVersion("head".to_string()))
    }

    pub async fn get(&self, digest: &str) -> LedgerResult<PlanVersion> {
        let state = self.state.lock().await;
        state
            .versions
            .get(digest)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownVersion(digest.to_string()))
    }

    /// Digests in commit order.
    pub async fn history(&self) -> Vec<String> {
        self.state.lock().await.history.clone()
    }

    /// Apply `approved` on top of head, which must be `base_digest`.
    ///
    /// A patch that leaves the lesson unchanged records no new version.
    #[instrument(skip(self, approved), fields(changes = approved.len()))]
    pub async fn commit(
        &self,
        base_digest: &str,
        approved: &[ApprovedChange],
    ) -> LedgerResult<PatchOutcome> {
        let mut state = self.state.lock().await;
        let head = state
            .head()
            .ok_or_else(|| LedgerError::UnknownVersion(base_digest.to_string()))?;
        if head.digest != base_digest {
            return Err(LedgerError::StaleBase {
                head: head.digest.clone(),
                base: base_digest.to_string(),
            });
        }

        let outcome = apply(&head.plan, approved)?;
        if outcome.changed() {
            let version = PlanVersion {
                digest: outcome.digest.clone(),
                parent: Some(outcome.base_digest.clone()),
                plan: Arc::new(outcome.plan.clone()),
                committed_at: Utc::now(),
                applied: outcome.applied.clone(),
            };
            state.versions.insert(version.digest.clone(), version);
            state.history.push(outcome.digest.clone());
            info!(
                base = %outcome.base_digest,
                head = %outcome.digest,
                "lesson version committed"
            );
        }
        Ok(outcome)
    }
}
