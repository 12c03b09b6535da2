//! End-to-end scenarios against an [`AppState`] built from in-memory
//! repositories and a fake WireGuard interface, the way the teacher's
//! `claw-gateway/tests/dispatch_test.rs` exercises its gateway against
//! fakes (`SPEC_FULL.md` §2.4, scenarios S1-S6 of `spec.md` §8).

use gc_server::config::ServerConfig;
use gc_server::ids::convert_id;
use gc_server::AppState;

use gc_devices::RegisterDeviceRequest;
use gc_network::{CreateNetworkRequest, JoinPolicy, Visibility};

fn sample_pub_key() -> String {
    // 32 zero bytes, base64-encoded: a structurally valid WireGuard key.
    "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=".to_string()
}

async fn build_state() -> AppState {
    AppState::new(&ServerConfig::default()).await.expect("state builds with the fake wireguard interface")
}

/// S1: register -> create tenant -> create network -> register device ->
/// join network (open policy) provisions exactly one peer, which the
/// reconciler then installs on the managed interface.
#[tokio::test]
async fn registration_through_peer_provisioning() {
    let state = build_state().await;

    // gc-auth's tenant_id is bookkeeping for the identity record only; the
    // tenant this user actually operates against is the one created below.
    let bundle = state
        .auth
        .register("owner@example.com", "correct horse battery staple", None, gc_auth::TenantId::from_uuid(uuid::Uuid::new_v4()))
        .unwrap();
    let auth_user_id = bundle.user_id;

    let tenant_user_id: gc_tenancy::UserId = convert_id(auth_user_id);
    let tenant = state
        .tenancy
        .create_tenant("Acme", gc_tenancy::Visibility::Private, gc_tenancy::AccessType::Open, None, 100, tenant_user_id)
        .unwrap();

    let network_user_id: gc_network::UserId = convert_id(auth_user_id);
    let network = state
        .network
        .create_network(
            &CreateNetworkRequest {
                name: "prod".into(),
                cidr: "10.50.0.0/24".into(),
                visibility: Visibility::Private,
                join_policy: JoinPolicy::Open,
                dns: None,
                mtu: None,
                split_tunnel: false,
            },
            network_user_id,
            convert_id(tenant.id),
            "create-network-1",
        )
        .unwrap();

    let device_user_id: gc_devices::UserId = convert_id(auth_user_id);
    let device = state
        .devices
        .register_device(
            device_user_id,
            convert_id(tenant.id),
            RegisterDeviceRequest {
                name: "laptop".into(),
                platform: "linux".into(),
                pub_key: sample_pub_key(),
                host_name: None,
                os_version: None,
            },
        )
        .unwrap();
    assert!(device.disabled_at.is_none());

    let membership_user_id: gc_membership::UserId = convert_id(auth_user_id);
    let outcome = state
        .membership
        .join_network(convert_id(network.id), membership_user_id, convert_id(tenant.id), "join-1", None)
        .unwrap();
    assert!(matches!(outcome, gc_membership::JoinOutcome::Membership(_)));

    let enabled_peers = state.peers.list_all_enabled();
    assert_eq!(enabled_peers.len(), 1);
    assert_eq!(enabled_peers[0].allowed_ip, "10.50.0.2".parse().unwrap());

    let desired: Vec<_> = enabled_peers
        .iter()
        .map(|p| {
            let key = gc_wireguard::PublicKey::from_base64(&p.public_key).unwrap();
            gc_wireguard::WireGuardPeer::new(key)
                .with_allowed_ip(gc_wireguard::AllowedIp::from_cidr(&format!("{}/32", p.allowed_ip)).unwrap())
        })
        .collect();
    let outcome = state.reconciler.lock().await.sync_peers(&desired).await.unwrap();
    assert_eq!(outcome.added, 1);

    let status = state.reconciler.lock().await.status();
    assert_eq!(status.last_peers_added, 1);
    assert_eq!(status.consecutive_failures, 0);
}

/// S2: a device registered *after* the user already holds an approved
/// membership is provisioned automatically, without a second join call
/// (`spec.md` §4.7).
#[tokio::test]
async fn device_registered_while_already_a_member_is_auto_provisioned() {
    let state = build_state().await;

    let bundle = state
        .auth
        .register("member@example.com", "correct horse battery staple", None, gc_auth::TenantId::from_uuid(uuid::Uuid::new_v4()))
        .unwrap();
    let auth_user_id = bundle.user_id;

    let tenant = state
        .tenancy
        .create_tenant(
            "Acme",
            gc_tenancy::Visibility::Private,
            gc_tenancy::AccessType::Open,
            None,
            100,
            convert_id(auth_user_id),
        )
        .unwrap();

    let network = state
        .network
        .create_network(
            &CreateNetworkRequest {
                name: "prod".into(),
                cidr: "10.60.0.0/24".into(),
                visibility: Visibility::Private,
                join_policy: JoinPolicy::Open,
                dns: None,
                mtu: None,
                split_tunnel: false,
            },
            convert_id(auth_user_id),
            convert_id(tenant.id),
            "create-network-2",
        )
        .unwrap();

    state
        .membership
        .join_network(convert_id(network.id), convert_id(auth_user_id), convert_id(tenant.id), "join-2", None)
        .unwrap();
    assert!(state.peers.list_all_enabled().is_empty(), "no devices yet, nothing to provision");

    state
        .devices
        .register_device(
            convert_id(auth_user_id),
            convert_id(tenant.id),
            RegisterDeviceRequest {
                name: "phone".into(),
                platform: "ios".into(),
                pub_key: sample_pub_key(),
                host_name: None,
                os_version: None,
            },
        )
        .unwrap();

    assert_eq!(state.peers.list_all_enabled().len(), 1);
}
