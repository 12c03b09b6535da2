//! Audit event types.
//!
//! The audit port exists to give every mutating control-plane operation a
//! single, structured place to record "what happened" independent of the
//! relational store. Events are immutable once built and carry no
//! interpretation beyond severity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{AuditError, Result};

/// Severity of an audit event, used to route to the right log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Routine, expected activity.
    Info,
    /// Worth a closer look but not actionable on its own.
    Medium,
    /// Indicates a failure that degrades a subsystem.
    High,
    /// Indicates a security-relevant failure.
    Critical,
}

/// The catalog of actions the control plane records.
///
/// This mirrors the action list in the audit port contract: membership
/// lifecycle, peer provisioning failures, and user/role administration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// A user joined a network under an open join policy.
    NetworkJoin,
    /// A user requested to join a network under an approval policy.
    NetworkJoinRequest,
    /// An admin approved a pending join request.
    NetworkJoinApprove,
    /// An admin denied a pending join request.
    NetworkJoinDeny,
    /// An admin kicked a member from a network.
    NetworkMemberKick,
    /// An admin banned a member from a network.
    NetworkMemberBan,
    /// An admin listed users (sensitive read, recorded for traceability).
    ListUsers,
    /// A user's role was changed.
    UpdateUserRole,
    /// A user was suspended.
    SuspendUser,
    /// A suspended user was reinstated.
    UnsuspendUser,
    /// Peer provisioning failed for a (network, user) pair.
    PeerProvisionFailed,
    /// Peer deprovisioning failed for a (network, user) pair.
    PeerDeprovisionFailed,
}

impl AuditAction {
    /// Default severity for this action, used when the builder omits one.
    #[must_use]
    pub const fn default_severity(self) -> Severity {
        match self {
            Self::NetworkJoin
            | Self::NetworkJoinRequest
            | Self::NetworkJoinApprove
            | Self::ListUsers
            | Self::UnsuspendUser => Severity::Info,
            Self::NetworkJoinDeny | Self::NetworkMemberKick | Self::UpdateUserRole => {
                Severity::Medium
            }
            Self::NetworkMemberBan | Self::SuspendUser => Severity::High,
            Self::PeerProvisionFailed | Self::PeerDeprovisionFailed => Severity::Critical,
        }
    }

    /// Stable string form, as it appears on the wire and in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NetworkJoin => "NETWORK_JOIN",
            Self::NetworkJoinRequest => "NETWORK_JOIN_REQUEST",
            Self::NetworkJoinApprove => "NETWORK_JOIN_APPROVE",
            Self::NetworkJoinDeny => "NETWORK_JOIN_DENY",
            Self::NetworkMemberKick => "NETWORK_MEMBER_KICK",
            Self::NetworkMemberBan => "NETWORK_MEMBER_BAN",
            Self::ListUsers => "LIST_USERS",
            Self::UpdateUserRole => "UPDATE_USER_ROLE",
            Self::SuspendUser => "SUSPEND_USER",
            Self::UnsuspendUser => "UNSUSPEND_USER",
            Self::PeerProvisionFailed => "PEER_PROVISION_FAILED",
            Self::PeerDeprovisionFailed => "PEER_DEPROVISION_FAILED",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single immutable audit record.
///
/// `tenant_id` is `None` for actions that precede tenant resolution (there
/// are none today, but the port stays honest about the possibility).
/// `object` identifies what was acted on (`"network:<id>"`, `"user:<id>"`)
/// and `details` carries action-specific, non-secret context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    id: Uuid,
    timestamp: DateTime<Utc>,
    tenant_id: Option<Uuid>,
    action: AuditAction,
    actor: String,
    object: String,
    severity: Severity,
    details: Value,
}

impl AuditEvent {
    /// Start building an event for `action`.
    #[must_use]
    pub fn builder(action: AuditAction) -> AuditEventBuilder {
        AuditEventBuilder::new(action)
    }

    /// Unique identifier of this event.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// When the event occurred.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Tenant the event is scoped to, if any.
    #[must_use]
    pub const fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    /// Action that occurred.
    #[must_use]
    pub const fn action(&self) -> AuditAction {
        self.action
    }

    /// Principal that caused the event (usually `"user:<id>"`).
    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Object the action was performed on.
    #[must_use]
    pub fn object(&self) -> &str {
        &self.object
    }

    /// Severity routed to the logging backend.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Action-specific details (never contains secrets).
    #[must_use]
    pub const fn details(&self) -> &Value {
        &self.details
    }

    /// Serialize to a JSON string for structured logging.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (should not happen for this
    /// type, since every field is already serializable JSON).
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(AuditError::Serialization)
    }
}

/// Fluent builder for [`AuditEvent`].
#[derive(Debug, Clone)]
pub struct AuditEventBuilder {
    action: AuditAction,
    tenant_id: Option<Uuid>,
    actor: Option<String>,
    object: Option<String>,
    severity: Option<Severity>,
    details: Map<String, Value>,
}

impl AuditEventBuilder {
    fn new(action: AuditAction) -> Self {
        Self {
            action,
            tenant_id: None,
            actor: None,
            object: None,
            severity: None,
            details: Map::new(),
        }
    }

    /// Scope the event to a tenant.
    #[must_use]
    pub const fn tenant_id(mut self, tenant_id: Uuid) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Set the actor (the principal who caused the event).
    #[must_use]
    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Set the object the action was performed on.
    #[must_use]
    pub fn object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Override the default severity for this action.
    #[must_use]
    pub const fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Attach a detail field. Later calls with the same key overwrite.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Finish building the event.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::MissingField`] if `actor` or `object` were
    /// never set.
    pub fn build(self) -> Result<AuditEvent> {
        let actor = self.actor.ok_or(AuditError::MissingField("actor"))?;
        let object = self.object.ok_or(AuditError::MissingField("object"))?;
        let severity = self.severity.unwrap_or_else(|| self.action.default_severity());

        Ok(AuditEvent {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            tenant_id: self.tenant_id,
            action: self.action,
            actor,
            object,
            severity,
            details: Value::Object(self.details),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_actor_and_object() {
        let err = AuditEvent::builder(AuditAction::NetworkJoin).build().unwrap_err();
        assert!(matches!(err, AuditError::MissingField("actor")));

        let err = AuditEvent::builder(AuditAction::NetworkJoin)
            .actor("user:1")
            .build()
            .unwrap_err();
        assert!(matches!(err, AuditError::MissingField("object")));
    }

    #[test]
    fn builder_defaults_severity_from_action() {
        let event = AuditEvent::builder(AuditAction::PeerProvisionFailed)
            .actor("user:1")
            .object("network:1")
            .build()
            .unwrap();
        assert_eq!(event.severity(), Severity::Critical);
    }

    #[test]
    fn builder_allows_severity_override() {
        let event = AuditEvent::builder(AuditAction::NetworkJoin)
            .actor("user:1")
            .object("network:1")
            .severity(Severity::High)
            .build()
            .unwrap();
        assert_eq!(event.severity(), Severity::High);
    }

    #[test]
    fn action_round_trips_through_str() {
        for action in [
            AuditAction::NetworkJoin,
            AuditAction::NetworkJoinRequest,
            AuditAction::NetworkJoinApprove,
            AuditAction::NetworkJoinDeny,
            AuditAction::NetworkMemberKick,
            AuditAction::NetworkMemberBan,
            AuditAction::ListUsers,
            AuditAction::UpdateUserRole,
            AuditAction::SuspendUser,
            AuditAction::UnsuspendUser,
            AuditAction::PeerProvisionFailed,
            AuditAction::PeerDeprovisionFailed,
        ] {
            assert_eq!(action.to_string(), action.as_str());
        }
    }

    #[test]
    fn details_are_preserved() {
        let event = AuditEvent::builder(AuditAction::NetworkJoin)
            .actor("user:1")
            .object("network:1")
            .detail("allowed_ip", "10.1.0.2/32")
            .build()
            .unwrap();
        assert_eq!(
            event.details().get("allowed_ip").and_then(Value::as_str),
            Some("10.1.0.2/32")
        );
    }

    #[test]
    fn to_json_includes_action() {
        let event = AuditEvent::builder(AuditAction::NetworkJoin)
            .actor("user:1")
            .object("network:1")
            .build()
            .unwrap();
        let json = event.to_json().unwrap();
        assert!(json.contains("NETWORK_JOIN"));
    }
}
