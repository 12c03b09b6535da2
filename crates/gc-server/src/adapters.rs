//! Concrete implementations of every narrow port the domain crates
//! define, bridging them together the way `gc-server` is meant to
//! (`DESIGN.md` crate-decoupling note: this is the one crate allowed to
//! see every other crate's concrete types).

use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use gc_audit::{AuditAction, AuditEvent, AuditSink};
use gc_devices::ports::{DeviceConfigSource, DeviceNotifier};
use gc_devices::repository::InMemoryDeviceRepository;
use gc_devices::{Device, DeviceService, InterfaceSpec};
use gc_events::{InboundEnvelope, InboundHandler, InboundType, OutboundEnvelope, OutboundType, RoomAuthorizer, RoomId, RoomPublisher};
use gc_membership::{InMemoryMembershipRepository, MembershipNotifier, MembershipService, NetworkInfo, PeerProvisioner};
use gc_network::{InMemoryNetworkRepository, NetworkService};
use gc_peers::{DeviceKey, InMemoryPeerRepository, PeerProvisioningEngine};
use gc_tenancy::{InMemoryTenantRepository, TenantService};

use crate::ids::convert_id;
use crate::state::UserTenantCache;

/// Bridges `gc-membership`'s [`gc_membership::NetworkLookup`] to the real
/// Network Service.
pub struct NetworkLookupAdapter {
    pub(crate) network: Arc<NetworkService<InMemoryNetworkRepository>>,
}

impl gc_membership::NetworkLookup for NetworkLookupAdapter {
    fn lookup(&self, network_id: gc_membership::NetworkId) -> Option<NetworkInfo> {
        let network = self.network.lookup_unchecked(convert_id(network_id))?;
        let join_policy = match network.join_policy {
            gc_network::JoinPolicy::Open => gc_membership::JoinPolicy::Open,
            gc_network::JoinPolicy::Approval => gc_membership::JoinPolicy::Approval,
            gc_network::JoinPolicy::Invite => gc_membership::JoinPolicy::Invite,
        };
        Some(NetworkInfo { tenant_id: convert_id(network.tenant_id), join_policy })
    }
}

/// Bridges `gc-membership`'s [`PeerProvisioner`] to the Peer Provisioning
/// Engine, resolving the caller's enabled devices through `gc-devices`
/// first (`spec.md` §4.7, steps driven by membership state changes).
pub struct PeerProvisionerAdapter {
    pub(crate) peers: Arc<PeerProvisioningEngine<InMemoryPeerRepository>>,
    pub(crate) network: Arc<NetworkService<InMemoryNetworkRepository>>,
    pub(crate) devices: Arc<DeviceService<InMemoryDeviceRepository, DeviceNotifierAdapter, DeviceConfigSourceAdapter>>,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) default_keepalive_secs: u16,
    /// Wakes the reconciler tick loop once this call has changed the peer
    /// set (`spec.md` §4.8 run mode (a)).
    pub(crate) reconcile_notify: Arc<tokio::sync::Notify>,
}

impl PeerProvisioner for PeerProvisionerAdapter {
    fn provision(&self, network_id: gc_membership::NetworkId, user_id: gc_membership::UserId) {
        let net_id: gc_network::NetworkId = convert_id(network_id);
        let Some(network) = self.network.lookup_unchecked(net_id) else {
            warn!(%network_id, "peer provisioning skipped: network vanished before fan-out");
            return;
        };
        let tenant_id: gc_devices::TenantId = convert_id(network.tenant_id);
        let device_user_id: gc_devices::UserId = convert_id(user_id);
        let devices: Vec<DeviceKey> = self
            .devices
            .list_devices(device_user_id, tenant_id)
            .into_iter()
            .filter(Device::is_enabled)
            .map(|d| DeviceKey { device_id: convert_id(d.id), public_key: d.pub_key })
            .collect();

        let peer_user_id: gc_peers::UserId = convert_id(user_id);
        match self.peers.provision_user_in_network(net_id, peer_user_id, &network.cidr, Some(self.default_keepalive_secs), &devices) {
            Ok(_) => self.reconcile_notify.notify_one(),
            Err(e) => {
                warn!(%network_id, %user_id, error = %e, "peer provisioning failed");
                if let Ok(event) = AuditEvent::builder(AuditAction::PeerProvisionFailed)
                    .actor(format!("user:{user_id}"))
                    .object(format!("network:{network_id}"))
                    .detail("error", e.to_string())
                    .build()
                {
                    self.audit.emit(&event);
                }
            }
        }
    }

    fn deprovision(&self, network_id: gc_membership::NetworkId, user_id: gc_membership::UserId) {
        let net_id: gc_network::NetworkId = convert_id(network_id);
        let peer_user_id: gc_peers::UserId = convert_id(user_id);
        self.peers.deprovision_user_in_network(net_id, peer_user_id);
        self.reconcile_notify.notify_one();
    }
}

/// Bridges `gc-membership`'s [`MembershipNotifier`] to the real-time
/// event bus and the audit sink.
pub struct MembershipNotifierAdapter {
    pub(crate) events: Arc<gc_events::SessionRegistry>,
    pub(crate) audit: Arc<dyn AuditSink>,
}

impl MembershipNotifierAdapter {
    fn publish(&self, action: AuditAction, network_id: gc_membership::NetworkId, user_id: gc_membership::UserId, kind: OutboundType) {
        if let Ok(event) = AuditEvent::builder(action)
            .actor(format!("user:{user_id}"))
            .object(format!("network:{network_id}"))
            .build()
        {
            self.audit.emit(&event);
        }
        let room = RoomId::Network(convert_id(network_id));
        let data = serde_json::json!({ "network_id": network_id.to_string(), "user_id": user_id.to_string() });
        self.events.publish(room, OutboundEnvelope::event(kind, data));
    }
}

impl MembershipNotifier for MembershipNotifierAdapter {
    fn member_joined(&self, network_id: gc_membership::NetworkId, user_id: gc_membership::UserId) {
        self.publish(AuditAction::NetworkJoin, network_id, user_id, OutboundType::MemberJoined);
    }

    fn member_left(&self, network_id: gc_membership::NetworkId, user_id: gc_membership::UserId) {
        // `gc-membership` calls this for both kick and ban; the port does
        // not distinguish the two, so the audit trail records the lesser
        // severity (`DESIGN.md` notes the approximation).
        self.publish(AuditAction::NetworkMemberKick, network_id, user_id, OutboundType::MemberLeft);
    }

    fn join_pending(&self, network_id: gc_membership::NetworkId, user_id: gc_membership::UserId) {
        self.publish(AuditAction::NetworkJoinRequest, network_id, user_id, OutboundType::RequestJoinPending);
    }

    fn join_approved(&self, network_id: gc_membership::NetworkId, user_id: gc_membership::UserId) {
        self.publish(AuditAction::NetworkJoinApprove, network_id, user_id, OutboundType::RequestJoinApproved);
    }

    fn join_denied(&self, network_id: gc_membership::NetworkId, user_id: gc_membership::UserId) {
        self.publish(AuditAction::NetworkJoinDeny, network_id, user_id, OutboundType::RequestJoinDenied);
    }
}

/// Bridges `gc-devices`' [`DeviceNotifier`] to the event bus, and toggles
/// the device's peer rows on an explicit enable/disable edge (a device
/// merely going offline through a missed heartbeat does not touch peers,
/// `DESIGN.md` open-question note).
pub struct DeviceNotifierAdapter {
    pub(crate) events: Arc<gc_events::SessionRegistry>,
    pub(crate) peers: Arc<PeerProvisioningEngine<InMemoryPeerRepository>>,
    pub(crate) network: Arc<NetworkService<InMemoryNetworkRepository>>,
    /// A second handle onto the membership store, shared with
    /// `MembershipService` (`gc_membership::repository::InMemoryMembershipRepository`
    /// clones are cheap and share state). Read-only from here: this
    /// adapter only needs to fan a new device's registration out across
    /// the user's existing memberships, never to mutate one.
    pub(crate) membership_repo: InMemoryMembershipRepository,
    pub(crate) default_keepalive_secs: u16,
    /// Wakes the reconciler tick loop once a device edge toggles a peer's
    /// enabled state (`spec.md` §4.8 run mode (a)).
    pub(crate) reconcile_notify: Arc<tokio::sync::Notify>,
}

impl DeviceNotifier for DeviceNotifierAdapter {
    fn device_online(&self, device: &Device) {
        self.peers.enable_device_peers(convert_id(device.id));
        self.reconcile_notify.notify_one();
        let room = RoomId::User(convert_id(device.user_id));
        let data = serde_json::json!({ "device_id": device.id.to_string() });
        self.events.publish(room, OutboundEnvelope::event(OutboundType::DeviceOnline, data));
    }

    fn device_offline(&self, device: &Device) {
        if !device.is_enabled() {
            self.peers.disable_device_peers(convert_id(device.id));
            self.reconcile_notify.notify_one();
        }
        let room = RoomId::User(convert_id(device.user_id));
        let data = serde_json::json!({ "device_id": device.id.to_string() });
        self.events.publish(room, OutboundEnvelope::event(OutboundType::DeviceOffline, data));
    }

    fn device_registered(&self, device: &Device) {
        let memberships = self.membership_repo.list_memberships_for_user(convert_id(device.user_id));
        let networks: Vec<_> = memberships
            .into_iter()
            .filter_map(|m| {
                let net_id: gc_network::NetworkId = convert_id(m.network_id);
                let network = self.network.lookup_unchecked(net_id)?;
                Some((net_id, network.cidr, Some(self.default_keepalive_secs)))
            })
            .collect();
        if networks.is_empty() {
            return;
        }
        let key = DeviceKey { device_id: convert_id(device.id), public_key: device.pub_key.clone() };
        match self.peers.provision_device_in_networks(convert_id(device.user_id), &key, &networks) {
            Ok(_) => self.reconcile_notify.notify_one(),
            Err(e) => warn!(device_id = %device.id, error = %e, "peer provisioning failed for newly registered device"),
        }
    }
}

/// Bridges `gc-devices`' [`DeviceConfigSource`] to the Peer Provisioning
/// Engine and Network Service, composing `GetDeviceConfig`'s structured
/// response (`spec.md` §4.5).
pub struct DeviceConfigSourceAdapter {
    pub(crate) peers: Arc<PeerProvisioningEngine<InMemoryPeerRepository>>,
    pub(crate) network: Arc<NetworkService<InMemoryNetworkRepository>>,
}

impl DeviceConfigSource for DeviceConfigSourceAdapter {
    fn interface_spec(&self, device: &Device) -> Option<InterfaceSpec> {
        let peer_device_id: gc_peers::DeviceId = convert_id(device.id);
        let peers: Vec<_> = self.peers.list_all_enabled().into_iter().filter(|p| p.device_id == peer_device_id).collect();
        if peers.is_empty() {
            return None;
        }

        let mut networks = Vec::with_capacity(peers.len());
        for peer in &peers {
            let Some(network) = self.network.lookup_unchecked(peer.network_id) else { continue };
            let other_peers = self
                .peers
                .list_all_enabled()
                .into_iter()
                .filter(|p| p.network_id == peer.network_id && p.device_id != peer_device_id)
                .map(|p| gc_devices::PeerView {
                    public_key: p.public_key,
                    allowed_ips: vec![format!("{}/32", p.allowed_ip)],
                    persistent_keepalive: p.persistent_keepalive,
                    endpoint: p.endpoint,
                })
                .collect();
            networks.push(gc_devices::NetworkInterfaceView {
                network_id: peer.network_id.as_uuid(),
                address: format!("{}/32", peer.allowed_ip),
                dns: network.dns,
                mtu: network.mtu,
                peers: other_peers,
            });
        }

        Some(InterfaceSpec { public_key: device.pub_key.clone(), networks })
    }
}

/// Bridges `gc-chat`'s [`gc_chat::RoleLookup`] to the Tenant Service.
pub struct RoleLookupAdapter {
    pub(crate) tenancy: Arc<TenantService<InMemoryTenantRepository>>,
}

impl gc_chat::RoleLookup for RoleLookupAdapter {
    fn role_of(&self, tenant_id: gc_chat::TenantId, user_id: gc_chat::UserId) -> Option<gc_chat::Role> {
        let role = self.tenancy.role_of(convert_id(tenant_id), convert_id(user_id))?;
        Some(match role {
            gc_tenancy::Role::Banned => gc_chat::Role::Banned,
            gc_tenancy::Role::Member => gc_chat::Role::Member,
            gc_tenancy::Role::Moderator => gc_chat::Role::Moderator,
            gc_tenancy::Role::Admin => gc_chat::Role::Admin,
            gc_tenancy::Role::Owner => gc_chat::Role::Owner,
        })
    }
}

/// Bridges `gc-chat`'s [`gc_chat::ChatNotifier`] to the event bus.
pub struct ChatNotifierAdapter {
    pub(crate) events: Arc<gc_events::SessionRegistry>,
}

impl gc_chat::ChatNotifier for ChatNotifierAdapter {
    fn message_changed(&self, message: &gc_chat::ChatMessage) {
        let room = match message.scope {
            gc_chat::Scope::Host => RoomId::Host,
            gc_chat::Scope::Network(id) => RoomId::Network(convert_id(id)),
        };
        let kind = if message.redacted {
            OutboundType::ChatRedact
        } else if message.deleted_at.is_some() {
            OutboundType::ChatDelete
        } else if message.updated_at.is_some() {
            OutboundType::ChatEdit
        } else {
            OutboundType::ChatSend
        };
        let data = serde_json::to_value(message).unwrap_or_else(|_| serde_json::json!({}));
        self.events.publish(room, OutboundEnvelope::event(kind, data));
    }
}

/// Bridges `gc-events`' [`RoomAuthorizer`] to `gc-tenancy`/`gc-membership`
/// (`spec.md` §4.10: a subscriber must already be an approved member of
/// the room it asks to join).
pub struct RoomAuthorizerAdapter {
    pub(crate) tenancy: Arc<TenantService<InMemoryTenantRepository>>,
    pub(crate) membership: Arc<MembershipService<InMemoryMembershipRepository, NetworkLookupAdapter, PeerProvisionerAdapter, MembershipNotifierAdapter>>,
    pub(crate) user_tenants: UserTenantCache,
}

impl RoomAuthorizer for RoomAuthorizerAdapter {
    fn is_authorized(&self, user_id: gc_events::UserId, room: RoomId) -> bool {
        match room {
            // `host` is the tenant-wide room; a user may join it as long
            // as they still hold an active role in the tenant resolved
            // from their connection's bearer token.
            RoomId::Host => {
                let Some(tenant_id) = self.user_tenants.get(user_id.as_uuid()) else { return false };
                self.tenancy
                    .role_of(gc_tenancy::TenantId::from_uuid(tenant_id), gc_tenancy::UserId::from_uuid(user_id.as_uuid()))
                    .is_some_and(|role| role != gc_tenancy::Role::Banned)
            }
            RoomId::Network(network_id) => self.membership.is_member(convert_id(network_id), convert_id(user_id)),
            RoomId::User(subject) => subject == user_id,
        }
    }
}

/// Dispatches the domain-specific inbound frame types (`auth.refresh`,
/// `chat.*`) that `gc-events` does not own the semantics of (`spec.md`
/// §4.10).
pub struct InboundHandlerAdapter {
    pub(crate) chat: Arc<gc_chat::ChatService<gc_chat::InMemoryChatRepository, RoleLookupAdapter, ChatNotifierAdapter>>,
    pub(crate) auth: Arc<gc_auth::AuthService<gc_auth::InMemoryUserRepository>>,
    pub(crate) user_tenants: UserTenantCache,
}

#[derive(Deserialize)]
struct ChatSendPayload {
    scope: String,
    body: String,
    #[serde(default)]
    parent_id: Option<uuid::Uuid>,
}

#[derive(Deserialize)]
struct ChatEditPayload {
    message_id: uuid::Uuid,
    body: String,
}

#[derive(Deserialize)]
struct ChatMessageIdPayload {
    message_id: uuid::Uuid,
    #[serde(default)]
    hard: bool,
}

#[derive(Deserialize)]
struct AuthRefreshPayload {
    refresh_token: String,
}

impl InboundHandlerAdapter {
    fn tenant_of(&self, user_id: gc_events::UserId) -> Option<gc_chat::TenantId> {
        self.user_tenants.get(user_id.as_uuid()).map(gc_chat::TenantId::from_uuid)
    }

    fn chat_error(op_id: &str, err: &gc_chat::Error) -> OutboundEnvelope {
        OutboundEnvelope::error(Some(op_id.to_string()), err.code(), err.to_string())
    }
}

impl InboundHandler for InboundHandlerAdapter {
    fn handle(&self, user_id: gc_events::UserId, envelope: &InboundEnvelope) -> OutboundEnvelope {
        let op_id = envelope.op_id.clone();
        let Some(tenant_id) = self.tenant_of(user_id) else {
            return OutboundEnvelope::error(Some(op_id), "Unauthorized", "no tenant resolved for this session");
        };
        let chat_user: gc_chat::UserId = gc_chat::UserId::from_uuid(user_id.as_uuid());

        match envelope.kind {
            InboundType::ChatSend => {
                let Ok(payload) = serde_json::from_value::<ChatSendPayload>(envelope.data.clone()) else {
                    return OutboundEnvelope::error(Some(op_id), "InvalidRequest", "malformed chat.send payload");
                };
                let Ok(scope) = gc_chat::Scope::parse(&payload.scope) else {
                    return OutboundEnvelope::error(Some(op_id), "InvalidRequest", "malformed scope");
                };
                let parent_id = payload.parent_id.map(gc_chat::MessageId::from_uuid);
                match self.chat.send_message(scope, tenant_id, chat_user, &payload.body, parent_id) {
                    Ok(message) => OutboundEnvelope {
                        kind: OutboundType::ChatSend,
                        op_id: Some(op_id),
                        data: serde_json::to_value(&message).ok(),
                        error: None,
                    },
                    Err(e) => Self::chat_error(&op_id, &e),
                }
            }
            InboundType::ChatEdit => {
                let Ok(payload) = serde_json::from_value::<ChatEditPayload>(envelope.data.clone()) else {
                    return OutboundEnvelope::error(Some(op_id), "InvalidRequest", "malformed chat.edit payload");
                };
                match self.chat.edit_message(gc_chat::MessageId::from_uuid(payload.message_id), chat_user, &payload.body) {
                    Ok(message) => OutboundEnvelope {
                        kind: OutboundType::ChatEdit,
                        op_id: Some(op_id),
                        data: serde_json::to_value(&message).ok(),
                        error: None,
                    },
                    Err(e) => Self::chat_error(&op_id, &e),
                }
            }
            InboundType::ChatDelete => {
                let Ok(payload) = serde_json::from_value::<ChatMessageIdPayload>(envelope.data.clone()) else {
                    return OutboundEnvelope::error(Some(op_id), "InvalidRequest", "malformed chat.delete payload");
                };
                match self.chat.delete_message(gc_chat::MessageId::from_uuid(payload.message_id), chat_user, payload.hard) {
                    Ok(()) => OutboundEnvelope::ack(op_id),
                    Err(e) => Self::chat_error(&op_id, &e),
                }
            }
            InboundType::ChatRedact => {
                let Ok(payload) = serde_json::from_value::<ChatMessageIdPayload>(envelope.data.clone()) else {
                    return OutboundEnvelope::error(Some(op_id), "InvalidRequest", "malformed chat.redact payload");
                };
                match self.chat.redact_message(gc_chat::MessageId::from_uuid(payload.message_id), chat_user) {
                    Ok(message) => OutboundEnvelope {
                        kind: OutboundType::ChatRedact,
                        op_id: Some(op_id),
                        data: serde_json::to_value(&message).ok(),
                        error: None,
                    },
                    Err(e) => Self::chat_error(&op_id, &e),
                }
            }
            InboundType::ChatTyping => OutboundEnvelope::ack(op_id),
            InboundType::AuthRefresh => {
                let Ok(payload) = serde_json::from_value::<AuthRefreshPayload>(envelope.data.clone()) else {
                    return OutboundEnvelope::error(Some(op_id), "InvalidRequest", "malformed auth.refresh payload");
                };
                match self.auth.refresh(&payload.refresh_token) {
                    Ok(bundle) => OutboundEnvelope {
                        kind: OutboundType::Ack,
                        op_id: Some(op_id),
                        data: serde_json::to_value(&bundle).ok(),
                        error: None,
                    },
                    Err(e) => OutboundEnvelope::error(Some(op_id), e.code(), e.to_string()),
                }
            }
            // room.join / room.leave / presence.ping never reach this
            // handler (`gc-events` owns their semantics outright).
            InboundType::RoomJoin | InboundType::RoomLeave | InboundType::PresencePing => {
                OutboundEnvelope::error(Some(op_id), "InternalServer", "frame type handled upstream")
            }
        }
    }
}
