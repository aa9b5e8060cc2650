use crate::{
    ambient_guard, endpoint,
    proxy::{Recorded, Rules, TestProxy, spawn_echo_server, spawn_greeting_server},
};
use socksify::{Destination, ErrorKind, ProxyConfig, SocksAuth, SocksConnector, SocksVersion};
use socksify_proto::{Command, Socks4Command, v4};
use std::net::Ipv4Addr;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

fn echo_rules() -> Rules {
    Rules::default().with_name("echo.test", Ipv4Addr::LOCALHOST)
}

#[tokio::test]
async fn test_socks5_tunnel_echoes_upstream() {
    let _guard = ambient_guard().await;

    let echo_port = spawn_echo_server().await;
    let proxy = TestProxy::spawn(echo_rules()).await;
    socksify::set_proxy(endpoint(proxy.port(), SocksVersion::V5));

    let mut conn = socksify::connect("echo.test", echo_port).await.unwrap();
    assert!(conn.is_proxied());
    assert!(conn.bound_address().is_some());

    conn.write_all(b"hello").await.unwrap();
    let mut buf = [0u8; 5];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello");

    assert_eq!(
        proxy.recorded(),
        vec![Recorded::Socks5 {
            command: Command::Connect,
            destination: Destination::new("echo.test", echo_port),
            username: None,
        }]
    );
}

#[tokio::test]
async fn test_no_proxy_connects_directly() {
    let _guard = ambient_guard().await;

    let port = spawn_greeting_server(b"hi there").await;
    let mut conn = socksify::connect("127.0.0.1", port).await.unwrap();
    assert!(!conn.is_proxied());

    let mut buf = Vec::new();
    conn.read_to_end(&mut buf).await.unwrap();
    assert_eq!(buf, b"hi there");
}

#[tokio::test]
async fn test_denied_connect_is_not_allowed() {
    let proxy = TestProxy::spawn(Rules {
        deny_connect: true,
        ..echo_rules()
    })
    .await;

    for version in [SocksVersion::V4A, SocksVersion::V5] {
        let connector = SocksConnector::new()
            .with_config(ProxyConfig::new().with_proxy(endpoint(proxy.port(), version)));
        let err = connector.connect("echo.test", 7).await.unwrap_err();
        assert!(err.is_not_allowed(), "{version}: {err}");
    }
    assert_eq!(proxy.recorded().len(), 2);
    assert_eq!(proxy.closed_after_reject(2).await, vec![true, true]);
}

#[tokio::test]
async fn test_ignored_host_bypasses_proxy() {
    let port = spawn_greeting_server(b"direct").await;
    let proxy = TestProxy::spawn(Rules::default()).await;
    let config = ProxyConfig::new()
        .with_proxy(endpoint(proxy.port(), SocksVersion::V5))
        .with_ignore("127.0.0.1");

    let mut conn = SocksConnector::new()
        .with_config(config)
        .connect("127.0.0.1", port)
        .await
        .unwrap();
    assert!(!conn.is_proxied());

    let mut buf = Vec::new();
    conn.read_to_end(&mut buf).await.unwrap();
    assert_eq!(buf, b"direct");
    assert!(proxy.recorded().is_empty());
}

#[tokio::test]
async fn test_ambient_ignore_host_bypasses_proxy() {
    let _guard = ambient_guard().await;

    let port = spawn_greeting_server(b"direct").await;
    let proxy = TestProxy::spawn(Rules::default()).await;
    socksify::set_proxy(endpoint(proxy.port(), SocksVersion::V5));
    assert!(socksify::add_ignore_host("127.0.0.1"));

    let conn = socksify::connect("127.0.0.1", port).await.unwrap();
    assert!(!conn.is_proxied());
    assert!(proxy.recorded().is_empty());

    assert!(socksify::remove_ignore_host("127.0.0.1"));
    let conn = socksify::connect("127.0.0.1", port).await.unwrap();
    assert!(conn.is_proxied());
    assert_eq!(proxy.recorded().len(), 1);
}

#[tokio::test]
async fn test_socks4a_sends_name_and_user_id() {
    let echo_port = spawn_echo_server().await;
    let proxy = TestProxy::spawn(echo_rules()).await;
    let proxy_endpoint = endpoint(proxy.port(), SocksVersion::V4A)
        .with_auth(SocksAuth::username_password("alice", "unused"));

    let mut conn = SocksConnector::new()
        .with_config(ProxyConfig::new().with_proxy(proxy_endpoint))
        .connect("echo.test", echo_port)
        .await
        .unwrap();
    conn.write_all(b"4a").await.unwrap();
    let mut buf = [0u8; 2];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"4a");

    assert_eq!(
        proxy.recorded(),
        vec![Recorded::Socks4 {
            command: Socks4Command::Connect,
            target: v4::Target::Name("echo.test".to_owned()),
            port: echo_port,
            user_id: "alice".to_owned(),
        }]
    );
}

#[tokio::test]
async fn test_socks4_connects_to_ipv4_only() {
    let echo_port = spawn_echo_server().await;
    let proxy = TestProxy::spawn(echo_rules()).await;
    let connector = SocksConnector::new()
        .with_config(ProxyConfig::new().with_proxy(endpoint(proxy.port(), SocksVersion::V4)));

    let mut conn = connector.connect("127.0.0.1", echo_port).await.unwrap();
    conn.write_all(b"v4").await.unwrap();
    let mut buf = [0u8; 2];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"v4");

    let err = connector.connect("echo.test", echo_port).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTarget);
    assert_eq!(proxy.recorded().len(), 1);
}

#[tokio::test]
async fn test_socks5_username_password() {
    let echo_port = spawn_echo_server().await;
    let proxy = TestProxy::spawn(Rules {
        credentials: Some(("alice".to_owned(), "secret".to_owned())),
        ..echo_rules()
    })
    .await;

    let connect = |password: &'static str| {
        let config = ProxyConfig::new().with_proxy(
            endpoint(proxy.port(), SocksVersion::V5)
                .with_auth(SocksAuth::username_password("alice", password)),
        );
        async move {
            SocksConnector::new()
                .with_config(config)
                .connect("echo.test", echo_port)
                .await
        }
    };

    let conn = connect("secret").await.unwrap();
    assert!(conn.is_proxied());

    let err = connect("wrong").await.unwrap_err();
    assert!(err.is_not_allowed());

    let err = SocksConnector::new()
        .with_config(ProxyConfig::new().with_proxy(endpoint(proxy.port(), SocksVersion::V5)))
        .connect("echo.test", echo_port)
        .await
        .unwrap_err();
    assert!(err.is_not_allowed());

    assert_eq!(
        proxy.recorded(),
        vec![Recorded::Socks5 {
            command: Command::Connect,
            destination: Destination::new("echo.test", echo_port),
            username: Some("alice".to_owned()),
        }]
    );
}

#[tokio::test]
async fn test_unreachable_proxy_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = SocksConnector::new()
        .with_config(ProxyConfig::new().with_proxy(endpoint(port, SocksVersion::V5)))
        .connect("echo.test", 80)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}
