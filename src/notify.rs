//! Push notification seam
//!
//! Delivery (a hosted push provider, usually) is an external collaborator.
//! The ledger only composes messages and hands them to a [`PushSink`];
//! dispatch is fire-and-forget and a failed delivery never fails the ledger
//! operation that produced it.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::LedgerError;

/// Who a push message is for
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushTarget {
    Users(Vec<i64>),
    Everyone,
}

/// Message category, forwarded to the delivery layer as metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushKind {
    RequestApproved,
    RequestRejected,
    NewRequest,
    PointsAdded,
    PointsSubtracted,
    PointsVisibilityChanged,
    NewStudent,
    GroupChanged,
    WeeklyLimitReached,
    GroupPoints,
}

/// A composed push message
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub kind: PushKind,
    pub target: PushTarget,
}

impl PushMessage {
    pub fn to_user(user_id: i64, kind: PushKind, title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            kind,
            target: PushTarget::Users(vec![user_id]),
        }
    }

    pub fn to_users(user_ids: Vec<i64>, kind: PushKind, title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            kind,
            target: PushTarget::Users(user_ids),
        }
    }

    pub fn broadcast(kind: PushKind, title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            kind,
            target: PushTarget::Everyone,
        }
    }
}

/// Delivery backend for push messages
#[async_trait]
pub trait PushSink: Send + Sync {
    async fn deliver(&self, message: PushMessage) -> Result<(), LedgerError>;
}

/// Default sink: logs the message instead of delivering it
pub struct LogSink;

#[async_trait]
impl PushSink for LogSink {
    async fn deliver(&self, message: PushMessage) -> Result<(), LedgerError> {
        info!(
            kind = ?message.kind,
            target = ?message.target,
            "push: {}: {}",
            message.title,
            message.body
        );
        Ok(())
    }
}

/// Dispatch a message without waiting for the delivery result
pub fn dispatch(sink: &Arc<dyn PushSink>, message: PushMessage) {
    let sink = sink.clone();
    tokio::spawn(async move {
        if let Err(e) = sink.deliver(message).await {
            warn!("push delivery failed: {e}");
        }
    });
}
