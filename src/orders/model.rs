use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One applied status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    /// `None` for the first status an order was seen with.
    pub from: Option<String>,
    pub to: String,
    pub at: DateTime<Utc>,
}

/// Order as tracked by the in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub external_order_id: String,
    pub status: String,
    pub history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn new(external_order_id: impl Into<String>, status: impl Into<String>) -> Self {
        let now = Utc::now();
        let status = status.into();
        Self {
            external_order_id: external_order_id.into(),
            history: vec![StatusChange {
                from: None,
                to: status.clone(),
                at: now,
            }],
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the order to `new_status`.
    ///
    /// Returns false without touching history when the order is already in
    /// that status.
    pub fn transition_to(&mut self, new_status: &str) -> bool {
        if self.status == new_status {
            return false;
        }

        let now = Utc::now();
        self.history.push(StatusChange {
            from: Some(std::mem::replace(&mut self.status, new_status.to_string())),
            to: new_status.to_string(),
            at: now,
        });
        self.updated_at = now;
        true
    }

    pub fn transition_count(&self) -> usize {
        self.history.len()
    }
}
