//! Downstream billing notification.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::VisitType;

/// What billing learns about a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingNotice {
    pub session_id: String,
    pub entry_id: String,
    pub pet_id: String,
    pub staff_id: Option<String>,
    pub visit_type: VisitType,
    pub finished_at: NaiveDateTime,
}

/// Receives a notice after each session finish has committed.
///
/// Failures are logged by the caller and never undo the finish.
pub trait BillingNotifier: Send + Sync {
    fn session_finished(&self, notice: &BillingNotice) -> anyhow::Result<()>;
}

/// Drops every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBillingNotifier;

impl BillingNotifier for NoopBillingNotifier {
    fn session_finished(&self, _notice: &BillingNotice) -> anyhow::Result<()> {
        Ok(())
    }
}
