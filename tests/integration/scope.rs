use crate::{
    ambient_guard, endpoint,
    proxy::{Rules, TestProxy, spawn_echo_server},
};
use socksify::{ProxyConfig, SocksVersion};
use std::{
    net::Ipv4Addr,
    panic::{AssertUnwindSafe, catch_unwind},
};

#[tokio::test]
async fn test_nested_scopes_restore_on_error() {
    let _guard = ambient_guard().await;

    let denying = TestProxy::spawn(Rules {
        deny_connect: true,
        ..Rules::default()
    })
    .await;
    let outer = endpoint(1080, SocksVersion::V5);
    let middle = endpoint(1081, SocksVersion::V4A);
    let inner = endpoint(denying.port(), SocksVersion::V5);

    socksify::set_proxy(outer.clone());

    socksify::with_scope(middle.clone(), async {
        assert_eq!(socksify::get_proxy(), Some(middle.clone()));

        let result = socksify::with_scope(inner.clone(), async {
            assert_eq!(socksify::get_proxy(), Some(inner.clone()));
            socksify::connect("127.0.0.1", 7).await
        })
        .await;
        assert!(result.unwrap_err().is_not_allowed());

        assert_eq!(socksify::get_proxy(), Some(middle.clone()));
    })
    .await;

    assert_eq!(socksify::get_proxy(), Some(outer));
}

#[tokio::test]
async fn test_scope_restores_on_panic() {
    let _guard = ambient_guard().await;

    let outer = endpoint(1080, SocksVersion::V5);
    socksify::set_proxy(outer.clone());

    let result = catch_unwind(AssertUnwindSafe(|| {
        socksify::with_scope_sync(endpoint(1081, SocksVersion::V5), || panic!("boom"))
    }));
    assert!(result.is_err());
    assert_eq!(socksify::get_proxy(), Some(outer));
}

#[tokio::test]
async fn test_scope_without_prior_proxy_restores_none() {
    let _guard = ambient_guard().await;

    let echo_port = spawn_echo_server().await;
    let proxy = TestProxy::spawn(Rules::default()).await;

    let conn = socksify::with_scope(endpoint(proxy.port(), SocksVersion::V5), async {
        socksify::connect("127.0.0.1", echo_port).await
    })
    .await
    .unwrap();
    assert!(conn.is_proxied());
    assert_eq!(socksify::get_proxy(), None);

    let conn = socksify::connect("127.0.0.1", echo_port).await.unwrap();
    assert!(!conn.is_proxied());
}

#[tokio::test]
async fn test_task_scopes_are_isolated() {
    let echo_port = spawn_echo_server().await;
    let first = TestProxy::spawn(Rules::default().with_name("echo.test", Ipv4Addr::LOCALHOST)).await;
    let second =
        TestProxy::spawn(Rules::default().with_name("echo.test", Ipv4Addr::LOCALHOST)).await;

    let run = |port: u16| {
        let config = ProxyConfig::new().with_proxy(endpoint(port, SocksVersion::V5));
        socksify::with_task_scope(config, async move {
            for _ in 0..3 {
                let conn = socksify::connect("echo.test", echo_port).await.unwrap();
                assert!(conn.is_proxied());
                tokio::task::yield_now().await;
            }
        })
    };
    tokio::join!(run(first.port()), run(second.port()));

    assert_eq!(first.recorded().len(), 3);
    assert_eq!(second.recorded().len(), 3);
}
