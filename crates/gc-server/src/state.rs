//! Composes every domain service into one shared, `Arc`-wrapped
//! application state (`SPEC_FULL.md` §2.3).
//!
//! Construction order matters: collaborator ports are built from `Arc`
//! clones of services that already exist, so services with no port
//! generics of their own come first, and each subsequent service is only
//! constructed once every port it needs has something real behind it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use gc_audit::{AuditSink, TracingAuditSink};
use gc_auth::{AuthService, InMemoryUserRepository, JwtConfig, JwtManager};
use gc_chat::{ChatService, InMemoryChatRepository};
use gc_devices::repository::InMemoryDeviceRepository;
use gc_devices::DeviceService;
use gc_events::SessionRegistry;
use gc_membership::{InMemoryMembershipRepository, MembershipService};
use gc_network::{InMemoryNetworkRepository, NetworkService};
use gc_peers::{InMemoryPeerRepository, PeerProvisioningEngine};
use gc_tenancy::{InMemoryTenantRepository, TenantService};
use gc_wireguard::{FakeWireGuardInterface, Reconciler, WireGuardInterface};

use crate::adapters::{
    ChatNotifierAdapter, DeviceConfigSourceAdapter, DeviceNotifierAdapter, InboundHandlerAdapter,
    MembershipNotifierAdapter, NetworkLookupAdapter, PeerProvisionerAdapter, RoleLookupAdapter, RoomAuthorizerAdapter,
};
use crate::config::ServerConfig;

/// A small in-memory map from connected user to the tenant resolved from
/// their bearer token, populated by the gateway at connect time and read
/// by the room authorizer and inbound handler adapters. Kept separate
/// from any one domain crate since it is purely a gateway-session
/// concern (`DESIGN.md` crate-decoupling note).
#[derive(Debug, Default, Clone)]
pub struct UserTenantCache {
    inner: Arc<RwLock<HashMap<Uuid, Uuid>>>,
}

impl UserTenantCache {
    /// An empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) the tenant a user's current connection
    /// resolved to.
    pub fn insert(&self, user_id: Uuid, tenant_id: Uuid) {
        self.inner.write().insert(user_id, tenant_id);
    }

    /// The tenant last resolved for `user_id`, if any.
    #[must_use]
    pub fn get(&self, user_id: Uuid) -> Option<Uuid> {
        self.inner.read().get(&user_id).copied()
    }

    /// Forget a user's resolved tenant (called when their last session
    /// disconnects).
    pub fn remove(&self, user_id: Uuid) {
        self.inner.write().remove(&user_id);
    }
}

type Membership = MembershipService<InMemoryMembershipRepository, NetworkLookupAdapter, PeerProvisionerAdapter, MembershipNotifierAdapter>;
type Devices = DeviceService<InMemoryDeviceRepository, DeviceNotifierAdapter, DeviceConfigSourceAdapter>;
type Chat = ChatService<InMemoryChatRepository, RoleLookupAdapter, ChatNotifierAdapter>;

/// Every service the gateway and background tasks need, composed once at
/// startup and shared behind `Arc`s for the lifetime of the process.
pub struct AppState {
    /// Signs and validates bearer tokens.
    pub jwt: JwtManager,
    /// Identity and credential service.
    pub auth: Arc<AuthService<InMemoryUserRepository>>,
    /// Tenant membership and role service.
    pub tenancy: Arc<TenantService<InMemoryTenantRepository>>,
    /// Network and IPAM service.
    pub network: Arc<NetworkService<InMemoryNetworkRepository>>,
    /// Peer provisioning engine (the WireGuard data plane's desired
    /// state).
    pub peers: Arc<PeerProvisioningEngine<InMemoryPeerRepository>>,
    /// Device registration and presence service.
    pub devices: Arc<Devices>,
    /// Network membership and join-request service.
    pub membership: Arc<Membership>,
    /// Chat service.
    pub chat: Arc<Chat>,
    /// Real-time event bus.
    pub events: Arc<SessionRegistry>,
    /// WireGuard reconciler, ticked by a background task.
    pub reconciler: Arc<tokio::sync::Mutex<Reconciler<FakeWireGuardInterface>>>,
    /// Wakes the reconciler's background tick loop early after a peer-row
    /// mutation, rather than waiting out the full tick interval
    /// (`spec.md` §4.8 run mode (a): "explicit call after any peer-row
    /// mutation").
    pub reconcile_notify: Arc<tokio::sync::Notify>,
    /// Audit sink every notifier adapter emits through.
    pub audit: Arc<dyn AuditSink>,
    /// Room authorizer handed to every new gateway session.
    pub room_authorizer: Arc<RoomAuthorizerAdapter>,
    /// Inbound domain-frame handler handed to every new gateway session.
    pub inbound_handler: Arc<InboundHandlerAdapter>,
    /// Resolves a connected user's tenant for room authorization and
    /// inbound dispatch.
    pub user_tenants: UserTenantCache,
    /// Every tenant id the offline-sweep background task has observed,
    /// so it can iterate the working set without needing a tenant-wide
    /// listing port of its own.
    pub known_tenants: Arc<RwLock<std::collections::HashSet<Uuid>>>,
    /// Default `persistent_keepalive` advertised to newly provisioned
    /// peers.
    pub default_keepalive_secs: u16,
    /// Device-offline threshold used by the sweep task.
    pub offline_threshold: std::time::Duration,
}

impl AppState {
    /// Build the full composition root from process configuration. Async
    /// because creating the managed `WireGuard` interface is.
    pub async fn new(config: &ServerConfig) -> crate::error::Result<Self> {
        let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink::new());

        let jwt_config = JwtConfig::new(config.tokens.secret.clone())
            .with_access_ttl(std_to_chrono(config.tokens.access_ttl))
            .with_refresh_ttl(std_to_chrono(config.tokens.refresh_ttl));
        let jwt = JwtManager::new(jwt_config);

        let mut auth_service = AuthService::new(InMemoryUserRepository::new(), jwt.clone());
        if let Some(oidc) = &config.oidc {
            auth_service = auth_service.with_oidc(Arc::new(gc_auth::ConfiguredOidcProvider::new(
                oidc.issuer.clone(),
                oidc.client_id.clone(),
                oidc.client_secret.clone(),
                oidc.redirect_url.clone(),
            )));
        }
        let auth = Arc::new(auth_service);

        let tenancy = Arc::new(TenantService::new(InMemoryTenantRepository::new()));
        let network = Arc::new(NetworkService::new(InMemoryNetworkRepository::new()));
        let peers = Arc::new(PeerProvisioningEngine::new(InMemoryPeerRepository::new()));
        let events = Arc::new(SessionRegistry::new());
        let reconcile_notify = Arc::new(tokio::sync::Notify::new());

        // Shared up front: clones of an `InMemoryMembershipRepository`
        // point at the same store, so the device notifier can read
        // approved memberships without depending on `MembershipService`,
        // which is only constructed once `devices` already exists below.
        let membership_repo = InMemoryMembershipRepository::new();

        let device_config_source = DeviceConfigSourceAdapter { peers: peers.clone(), network: network.clone() };
        let device_notifier = DeviceNotifierAdapter {
            events: events.clone(),
            peers: peers.clone(),
            network: network.clone(),
            membership_repo: membership_repo.clone(),
            default_keepalive_secs: config.reconciler.default_keepalive_secs,
            reconcile_notify: reconcile_notify.clone(),
        };
        let devices = Arc::new(DeviceService::new(InMemoryDeviceRepository::new(), device_notifier, device_config_source));

        let network_lookup = NetworkLookupAdapter { network: network.clone() };
        let membership_notifier = MembershipNotifierAdapter { events: events.clone(), audit: audit.clone() };
        let peer_provisioner = PeerProvisionerAdapter {
            peers: peers.clone(),
            network: network.clone(),
            devices: devices.clone(),
            audit: audit.clone(),
            default_keepalive_secs: config.reconciler.default_keepalive_secs,
            reconcile_notify: reconcile_notify.clone(),
        };
        let membership =
            Arc::new(MembershipService::new(membership_repo, network_lookup, peer_provisioner, membership_notifier));

        let role_lookup = RoleLookupAdapter { tenancy: tenancy.clone() };
        let chat_notifier = ChatNotifierAdapter { events: events.clone() };
        let chat = Arc::new(ChatService::new(InMemoryChatRepository::new(), role_lookup, chat_notifier));

        let user_tenants = UserTenantCache::new();

        let room_authorizer = Arc::new(RoomAuthorizerAdapter {
            tenancy: tenancy.clone(),
            membership: membership.clone(),
            user_tenants: user_tenants.clone(),
        });
        let inbound_handler =
            Arc::new(InboundHandlerAdapter { chat: chat.clone(), auth: auth.clone(), user_tenants: user_tenants.clone() });

        let interface_config = gc_wireguard::InterfaceConfig::new(gc_wireguard::PrivateKey::generate());
        let mut wg_interface = FakeWireGuardInterface::new();
        wg_interface.create("gcwg0", &interface_config).await?;
        let reconciler = Arc::new(tokio::sync::Mutex::new(Reconciler::new(wg_interface, "gcwg0")));

        Self {
            jwt,
            auth,
            tenancy,
            network,
            peers,
            devices,
            membership,
            chat,
            events,
            reconciler,
            reconcile_notify,
            audit,
            room_authorizer,
            inbound_handler,
            user_tenants,
            known_tenants: Arc::new(RwLock::new(std::collections::HashSet::new())),
            default_keepalive_secs: config.reconciler.default_keepalive_secs,
            offline_threshold: config.reconciler.offline_threshold,
        }
    }
}

fn std_to_chrono(d: std::time::Duration) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}
