use crate::{
    endpoint,
    proxy::{Recorded, Rules, TestProxy},
};
use socksify::{ErrorKind, ProxyConfig, Resolved, Resolver, SocksVersion};
use socksify_proto::{Socks4Command, v4};
use std::net::{IpAddr, Ipv4Addr};

const KNOWN: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 7);

async fn known_proxy() -> TestProxy {
    TestProxy::spawn(Rules::default().with_name("known.test", KNOWN)).await
}

fn resolver(proxy: &TestProxy, version: SocksVersion) -> Resolver {
    Resolver::new().with_config(ProxyConfig::new().with_proxy(endpoint(proxy.port(), version)))
}

#[tokio::test]
async fn test_resolve_round_trip() {
    let proxy = known_proxy().await;

    for version in [SocksVersion::V4, SocksVersion::V4A, SocksVersion::V5] {
        let resolver = resolver(&proxy, version);

        let ip = resolver.resolve_name("known.test").await.unwrap();
        assert_eq!(ip, IpAddr::V4(KNOWN), "{version}");

        let name = resolver.resolve_reverse(ip).await.unwrap();
        assert_eq!(name, "known.test", "{version}");

        assert_eq!(
            resolver.resolve("known.test").await.unwrap(),
            Resolved::Address(ip),
            "{version}"
        );
        assert_eq!(
            resolver.resolve(&ip.to_string()).await.unwrap(),
            Resolved::Name("known.test".to_owned()),
            "{version}"
        );
    }
}

#[tokio::test]
async fn test_resolve_unknown_name_is_host_unreachable() {
    let proxy = known_proxy().await;

    for version in [SocksVersion::V4A, SocksVersion::V5] {
        let err = resolver(&proxy, version)
            .resolve("nonexistent.invalid")
            .await
            .unwrap_err();
        assert!(err.is_host_unreachable(), "{version}: {err}");

        let err = resolver(&proxy, version)
            .resolve_reverse(Ipv4Addr::new(198, 51, 100, 1).into())
            .await
            .unwrap_err();
        assert!(err.is_host_unreachable(), "{version}: {err}");
    }
}

#[tokio::test]
async fn test_resolve_socks4_frames() {
    let proxy = known_proxy().await;
    let resolver = resolver(&proxy, SocksVersion::V4A);

    resolver.resolve("known.test").await.unwrap();
    resolver.resolve_reverse(KNOWN.into()).await.unwrap();

    assert_eq!(
        proxy.recorded(),
        vec![
            Recorded::Socks4 {
                command: Socks4Command::Resolve,
                target: v4::Target::Name("known.test".to_owned()),
                port: 0,
                user_id: String::new(),
            },
            Recorded::Socks4 {
                command: Socks4Command::ResolvePtr,
                target: v4::Target::Ipv4(KNOWN),
                port: 0,
                user_id: String::new(),
            },
        ]
    );
}

#[tokio::test]
async fn test_resolve_ip_literal_goes_through_proxy() {
    let proxy = known_proxy().await;

    for version in [SocksVersion::V4A, SocksVersion::V5] {
        let err = resolver(&proxy, version)
            .resolve("0.0.0.0")
            .await
            .unwrap_err();
        assert!(err.is_host_unreachable(), "{version}: {err}");
    }
    assert_eq!(proxy.recorded().len(), 2);
}

#[tokio::test]
async fn test_resolve_without_proxy() {
    let resolver = Resolver::new().with_config(ProxyConfig::new());

    for host in ["known.test", "::1", "127.0.0.1"] {
        let err = resolver.resolve(host).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoProxyConfigured, "{host}");
    }
}

#[tokio::test]
async fn test_ambient_resolve_in_task_scope() {
    let proxy = known_proxy().await;
    let config = ProxyConfig::new().with_proxy(endpoint(proxy.port(), SocksVersion::V5));

    let (ip, name) = socksify::with_task_scope(config, async {
        let ip = socksify::resolve_name("known.test").await.unwrap();
        (ip, socksify::resolve(&ip.to_string()).await.unwrap())
    })
    .await;
    assert_eq!(ip, IpAddr::V4(KNOWN));
    assert_eq!(name, Resolved::Name("known.test".to_owned()));
}
