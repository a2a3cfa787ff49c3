use serde::{Deserialize, Serialize};

use crate::db_types::{Refund, RefundStatus};

/// Published after a queue message has been stored as a new pending refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundIngestedEvent {
    pub refund: Refund,
}

impl RefundIngestedEvent {
    pub fn new(refund: Refund) -> Self {
        Self { refund }
    }
}

/// Published after a refund has been moved to a terminal status and the change has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundResolvedEvent {
    pub refund: Refund,
}

impl RefundResolvedEvent {
    pub fn new(refund: Refund) -> Self {
        Self { refund }
    }

    pub fn status(&self) -> RefundStatus {
        self.refund.status
    }
}
