//! Minimal SOCKS4a and SOCKS5 proxy, enough to drive the client end to end.

use parking_lot::Mutex;
use socksify_proto::{
    Command, Destination, Host, ReplyKind, Socks4Command, Socks4Status, SocksMethod, v4,
    v5::{client, server},
};
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::{Instant, sleep, timeout},
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// What the proxy was asked to do.
pub(crate) enum Recorded {
    Socks4 {
        command: Socks4Command,
        target: v4::Target,
        port: u16,
        user_id: String,
    },
    Socks5 {
        command: Command,
        destination: Destination,
        username: Option<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Rules {
    /// Refuse every `CONNECT`.
    pub(crate) deny_connect: bool,
    /// Credentials required by the SOCKS5 side.
    pub(crate) credentials: Option<(String, String)>,
    /// Names known to the proxy.
    pub(crate) names: HashMap<String, IpAddr>,
}

impl Rules {
    pub(crate) fn with_name(mut self, name: &str, ip: impl Into<IpAddr>) -> Self {
        self.names.insert(name.to_owned(), ip.into());
        self
    }

    fn lookup(&self, host: &Host) -> Option<IpAddr> {
        match host {
            Host::Address(ip) => Some(*ip),
            Host::Name(name) => self.names.get(name).copied(),
        }
    }

    fn reverse(&self, ip: IpAddr) -> Option<String> {
        self.names
            .iter()
            .find_map(|(name, known)| (*known == ip).then(|| name.clone()))
    }
}

#[derive(Debug, Default)]
struct Log {
    recorded: Mutex<Vec<Recorded>>,
    /// Per refused `CONNECT`, whether the client hung up afterwards.
    closed_after_reject: Mutex<Vec<bool>>,
}

#[derive(Debug)]
pub(crate) struct TestProxy {
    addr: SocketAddr,
    log: Arc<Log>,
}

impl TestProxy {
    pub(crate) async fn spawn(rules: Rules) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let log = Arc::new(Log::default());
        let rules = Arc::new(rules);

        let shared = log.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let rules = rules.clone();
                let log = shared.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, &rules, &log).await;
                });
            }
        });

        Self { addr, log }
    }

    pub(crate) fn port(&self) -> u16 {
        self.addr.port()
    }

    pub(crate) fn recorded(&self) -> Vec<Recorded> {
        self.log.recorded.lock().clone()
    }

    /// Waits until `count` refused `CONNECT`s were observed, returning
    /// for each of them whether the client closed the connection.
    pub(crate) async fn closed_after_reject(&self, count: usize) -> Vec<bool> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let closed = self.log.closed_after_reject.lock().clone();
            if closed.len() >= count || Instant::now() >= deadline {
                return closed;
            }
            sleep(Duration::from_millis(10)).await;
        }
    }
}

/// Reads until the client hangs up, giving up after a while.
async fn await_hang_up(mut stream: TcpStream, log: &Log) -> ServeResult {
    let mut buf = [0u8; 64];
    let closed = loop {
        match timeout(Duration::from_secs(2), stream.read(&mut buf)).await {
            Ok(Ok(0) | Err(_)) => break true,
            Ok(Ok(_)) => continue,
            Err(_) => break false,
        }
    };
    log.closed_after_reject.lock().push(closed);
    Ok(())
}

type ServeResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

async fn serve(mut stream: TcpStream, rules: &Rules, log: &Log) -> ServeResult {
    let mut version = [0u8; 1];
    stream.peek(&mut version).await?;
    match version[0] {
        0x04 => serve_socks4(stream, rules, log).await,
        0x05 => serve_socks5(stream, rules, log).await,
        _ => Ok(()),
    }
}

async fn serve_socks4(
    mut stream: TcpStream,
    rules: &Rules,
    log: &Log,
) -> ServeResult {
    let request = v4::Request::read_from(&mut stream).await?;
    log.recorded.lock().push(Recorded::Socks4 {
        command: request.command,
        target: request.target.clone(),
        port: request.port,
        user_id: String::from_utf8_lossy(&request.user_id).into_owned(),
    });

    let host = match &request.target {
        v4::Target::Ipv4(ip) => Host::Address((*ip).into()),
        v4::Target::Name(name) => Host::Name(name.clone()),
    };
    let rejected = v4::Reply::new(Socks4Status::Rejected, Ipv4Addr::UNSPECIFIED, 0);

    match request.command {
        Socks4Command::Connect if !rules.deny_connect => {
            let Some(ip) = rules.lookup(&host) else {
                return Ok(rejected.write_to(&mut stream).await?);
            };
            let Ok(mut upstream) = TcpStream::connect((ip, request.port)).await else {
                return Ok(rejected.write_to(&mut stream).await?);
            };
            let bound = upstream.local_addr()?;
            let bound_ip = match bound.ip() {
                IpAddr::V4(ip) => ip,
                IpAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
            };
            v4::Reply::new(Socks4Status::Granted, bound_ip, bound.port())
                .write_to(&mut stream)
                .await?;
            tokio::io::copy_bidirectional(&mut stream, &mut upstream).await?;
        }
        Socks4Command::Connect => {
            rejected.write_to(&mut stream).await?;
            return await_hang_up(stream, log).await;
        }
        Socks4Command::Resolve => match rules.lookup(&host) {
            Some(IpAddr::V4(ip)) => {
                v4::Reply::new(Socks4Status::Granted, ip, 0)
                    .write_to(&mut stream)
                    .await?;
            }
            _ => rejected.write_to(&mut stream).await?,
        },
        Socks4Command::ResolvePtr => match host.as_ip().and_then(|ip| rules.reverse(ip)) {
            Some(name) => {
                let mut reply = v4::Reply::new(Socks4Status::Granted, Ipv4Addr::UNSPECIFIED, 0);
                reply.hostname = Some(name);
                reply.write_to(&mut stream).await?;
            }
            None => rejected.write_to(&mut stream).await?,
        },
        _ => rejected.write_to(&mut stream).await?,
    }
    Ok(())
}

async fn serve_socks5(
    mut stream: TcpStream,
    rules: &Rules,
    log: &Log,
) -> ServeResult {
    let header = client::Header::read_from(&mut stream).await?;

    let mut username = None;
    match &rules.credentials {
        Some((user, pass)) => {
            if !header.methods.contains(&SocksMethod::UsernamePassword) {
                server::Header::new(SocksMethod::NoAcceptableMethods)
                    .write_to(&mut stream)
                    .await?;
                return Ok(());
            }
            server::Header::new(SocksMethod::UsernamePassword)
                .write_to(&mut stream)
                .await?;

            let auth = client::UsernamePasswordRequest::read_from(&mut stream).await?;
            if auth.username != user.as_bytes() || auth.password != pass.as_bytes() {
                server::UsernamePasswordResponse::new_invalid_credentials()
                    .write_to(&mut stream)
                    .await?;
                return Ok(());
            }
            server::UsernamePasswordResponse::new_success()
                .write_to(&mut stream)
                .await?;
            username = Some(user.clone());
        }
        None => {
            server::Header::new(SocksMethod::NoAuthenticationRequired)
                .write_to(&mut stream)
                .await?;
        }
    }

    let request = client::Request::read_from(&mut stream).await?;
    log.recorded.lock().push(Recorded::Socks5 {
        command: request.command,
        destination: request.destination.clone(),
        username,
    });
    let Destination { host, port } = request.destination;

    match request.command {
        Command::Connect if rules.deny_connect => {
            server::Reply::error_reply(ReplyKind::ConnectionNotAllowed)
                .write_to(&mut stream)
                .await?;
            return await_hang_up(stream, log).await;
        }
        Command::Connect => {
            let Some(ip) = rules.lookup(&host) else {
                server::Reply::error_reply(ReplyKind::HostUnreachable)
                    .write_to(&mut stream)
                    .await?;
                return Ok(());
            };
            let Ok(mut upstream) = TcpStream::connect((ip, port)).await else {
                server::Reply::error_reply(ReplyKind::ConnectionRefused)
                    .write_to(&mut stream)
                    .await?;
                return Ok(());
            };
            server::Reply::new(ReplyKind::Succeeded, upstream.local_addr()?.into())
                .write_to(&mut stream)
                .await?;
            tokio::io::copy_bidirectional(&mut stream, &mut upstream).await?;
        }
        Command::Resolve => {
            let reply = match host.as_name().and_then(|_| rules.lookup(&host)) {
                Some(ip) => server::Reply::new(ReplyKind::Succeeded, Destination::new(ip, 0)),
                None => server::Reply::error_reply(ReplyKind::HostUnreachable),
            };
            reply.write_to(&mut stream).await?;
        }
        Command::ResolvePtr => {
            let reply = match host.as_ip().and_then(|ip| rules.reverse(ip)) {
                Some(name) => {
                    server::Reply::new(ReplyKind::Succeeded, Destination::new(Host::Name(name), 0))
                }
                None => server::Reply::error_reply(ReplyKind::HostUnreachable),
            };
            reply.write_to(&mut stream).await?;
        }
        _ => {
            server::Reply::error_reply(ReplyKind::CommandNotSupported)
                .write_to(&mut stream)
                .await?;
        }
    }
    Ok(())
}

/// Upstream which echoes everything back, returning its port.
pub(crate) async fn spawn_echo_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if stream.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });
    port
}

/// Upstream which writes `greeting` to every connection and closes it,
/// returning its port.
pub(crate) async fn spawn_greeting_server(greeting: &'static [u8]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let _ = stream.write_all(greeting).await;
        }
    });
    port
}
