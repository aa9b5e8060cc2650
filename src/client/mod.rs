//! SOCKS4, SOCKS4a and SOCKS5 client handshakes.
//!
//! A [`SocksClient`] drives exactly one command over a stream
//! already connected to the proxy. For `CONNECT` the stream can be used
//! as a tunnel to the destination once the handshake succeeded.

use crate::{
    Stream,
    config::{ProxyEndpoint, SocksAuth, SocksVersion},
    error::{ErrorKind, SocksError},
};
use bytes::BytesMut;
use socksify_proto::{
    Command, Destination, Host, Socks4Command, SocksMethod, v4,
    v5::{
        client::{Header, Request, UsernamePasswordRequest},
        server,
    },
};
use std::net::IpAddr;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Command sent to the proxy, with its argument.
pub enum HandshakeRequest {
    /// Open a tunnel to the destination.
    Connect(Destination),
    /// Not supported by this client, always fails with [`ErrorKind::CommandNotSupported`].
    Bind(Destination),
    /// Resolve a name into an address, on the proxy.
    Resolve(String),
    /// Resolve an address into a name, on the proxy.
    ResolvePtr(IpAddr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of a successful handshake.
pub enum HandshakeOutcome {
    /// The tunnel is established, the address is the one the proxy
    /// reported as bound for it.
    Connected(Destination),
    Resolved(IpAddr),
    ResolvedPtr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Wire framing used for a request.
enum Framing {
    /// IPv4 destinations only.
    Socks4,
    /// Hostname destinations through the `0.0.0.1` marker,
    /// also used for the resolve extensions.
    Socks4a,
    Socks5,
}

impl Framing {
    fn select(version: SocksVersion, request: &HandshakeRequest) -> Result<Self, SocksError> {
        match (version, request) {
            (_, HandshakeRequest::Bind(_)) => Err(SocksError::new(ErrorKind::CommandNotSupported)
                .with_context("bind is not supported by this client")),
            (SocksVersion::V4, HandshakeRequest::Connect(_)) => Ok(Self::Socks4),
            (SocksVersion::V4 | SocksVersion::V4A, _) => Ok(Self::Socks4a),
            (SocksVersion::V5, _) => Ok(Self::Socks5),
        }
    }
}

#[derive(Debug, Clone, Default)]
/// SOCKS client, for a single proxy version and optional credentials.
pub struct SocksClient {
    version: SocksVersion,
    auth: Option<SocksAuth>,
    debug: bool,
}

impl SocksClient {
    /// Creates a new [`SocksClient`] speaking the given version.
    #[must_use]
    pub fn new(version: SocksVersion) -> Self {
        Self {
            version,
            auth: None,
            debug: false,
        }
    }

    /// Creates a new [`SocksClient`] using the version and credentials of the proxy.
    #[must_use]
    pub fn from_endpoint(endpoint: &ProxyEndpoint) -> Self {
        Self {
            version: endpoint.version(),
            auth: endpoint.auth().cloned(),
            debug: false,
        }
    }

    /// Set the credentials presented to the proxy.
    #[must_use]
    pub fn with_auth(mut self, auth: SocksAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Emit debug events for every handshake step.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn version(&self) -> SocksVersion {
        self.version
    }

    /// Establish a tunnel to the destination making use of the `CONNECT` command.
    ///
    /// In case the handshake was successful it will return
    /// the address used by the proxy to connect to the destination
    /// on behalf of this [`SocksClient`].
    pub async fn handshake_connect<S: Stream + Unpin>(
        &self,
        stream: &mut S,
        destination: &Destination,
    ) -> Result<Destination, SocksError> {
        match self
            .handshake(stream, &HandshakeRequest::Connect(destination.clone()))
            .await?
        {
            HandshakeOutcome::Connected(bound) => Ok(bound),
            HandshakeOutcome::Resolved(_) | HandshakeOutcome::ResolvedPtr(_) => {
                Err(unexpected_outcome())
            }
        }
    }

    /// Resolve `name` on the proxy using the `RESOLVE` extension.
    pub async fn handshake_resolve<S: Stream + Unpin>(
        &self,
        stream: &mut S,
        name: &str,
    ) -> Result<IpAddr, SocksError> {
        match self
            .handshake(stream, &HandshakeRequest::Resolve(name.to_owned()))
            .await?
        {
            HandshakeOutcome::Resolved(ip) => Ok(ip),
            HandshakeOutcome::Connected(_) | HandshakeOutcome::ResolvedPtr(_) => {
                Err(unexpected_outcome())
            }
        }
    }

    /// Reverse resolve `ip` on the proxy using the `RESOLVE_PTR` extension.
    pub async fn handshake_resolve_ptr<S: Stream + Unpin>(
        &self,
        stream: &mut S,
        ip: IpAddr,
    ) -> Result<String, SocksError> {
        match self
            .handshake(stream, &HandshakeRequest::ResolvePtr(ip))
            .await?
        {
            HandshakeOutcome::ResolvedPtr(name) => Ok(name),
            HandshakeOutcome::Connected(_) | HandshakeOutcome::Resolved(_) => {
                Err(unexpected_outcome())
            }
        }
    }

    /// Run the handshake for any [`HandshakeRequest`].
    ///
    /// A request that cannot be framed for the version of this client
    /// fails before anything is written to the stream.
    pub async fn handshake<S: Stream + Unpin>(
        &self,
        stream: &mut S,
        request: &HandshakeRequest,
    ) -> Result<HandshakeOutcome, SocksError> {
        let framing = Framing::select(self.version, request)?;
        let result = match framing {
            Framing::Socks4 | Framing::Socks4a => {
                self.socks4_exchange(stream, framing, request).await
            }
            Framing::Socks5 => self.socks5_exchange(stream, request).await,
        };

        match &result {
            Ok(outcome) => debug_event!(
                self.debug,
                version = %self.version,
                ?framing,
                ?outcome,
                "socksify: handshake succeeded"
            ),
            Err(err) => debug_event!(
                self.debug,
                version = %self.version,
                ?framing,
                error = %err,
                "socksify: handshake failed"
            ),
        }
        result
    }

    async fn socks4_exchange<S: Stream + Unpin>(
        &self,
        stream: &mut S,
        framing: Framing,
        request: &HandshakeRequest,
    ) -> Result<HandshakeOutcome, SocksError> {
        let mut frame = encode_socks4(framing, request)?;
        if let Some(auth) = &self.auth {
            frame = frame.with_user_id(auth.username());
        }

        let mut buf = BytesMut::new();
        frame
            .write_to_buf(&mut buf)
            .map_err(|err| SocksError::write(err).with_context("encode socks4 request"))?;
        stream
            .write_all(&buf)
            .await
            .map_err(|err| SocksError::transport(err).with_context("write socks4 request"))?;

        debug_event!(
            self.debug,
            command = %frame.command,
            port = frame.port,
            "socksify: socks4 request sent"
        );

        let reply = if frame.command == Socks4Command::ResolvePtr {
            v4::Reply::read_with_hostname_from(stream).await
        } else {
            v4::Reply::read_from(stream).await
        }
        .map_err(|err| SocksError::read(err).with_context("read socks4 reply"))?;

        debug_event!(self.debug, status = %reply.status, "socksify: socks4 reply received");

        decode_socks4(request, reply)
    }

    async fn socks5_exchange<S: Stream + Unpin>(
        &self,
        stream: &mut S,
        request: &HandshakeRequest,
    ) -> Result<HandshakeOutcome, SocksError> {
        let frame = encode_socks5(request)?;
        let mut buf = BytesMut::new();
        frame
            .write_to_buf(&mut buf)
            .map_err(|err| SocksError::write(err).with_context("encode socks5 request"))?;

        let selected_method = match self.auth.as_ref() {
            Some(auth) => self.handshake_headers_auth(stream, auth).await?,
            None => self.handshake_headers_no_auth(stream).await?,
        };

        stream
            .write_all(&buf)
            .await
            .map_err(|err| SocksError::transport(err).with_context("write socks5 request"))?;

        debug_event!(
            self.debug,
            %selected_method,
            command = %frame.command,
            destination = %frame.destination,
            "socksify: socks5 request sent"
        );

        let reply = server::Reply::read_from(stream)
            .await
            .map_err(|err| SocksError::read(err).with_context("read socks5 reply"))?;

        debug_event!(
            self.debug,
            reply = %reply.reply,
            bind_address = %reply.bind_address,
            "socksify: socks5 reply received"
        );

        decode_socks5(request, reply)
    }

    async fn handshake_headers_auth<S: Stream + Unpin>(
        &self,
        stream: &mut S,
        auth: &SocksAuth,
    ) -> Result<SocksMethod, SocksError> {
        let auth_method = auth.socks5_method();
        let header = Header::new([SocksMethod::NoAuthenticationRequired, auth_method]);
        header
            .write_to(stream)
            .await
            .map_err(|err| SocksError::write(err).with_context("write socks5 header: with auth"))?;

        let server_header = server::Header::read_from(stream)
            .await
            .map_err(|err| SocksError::read(err).with_context("read socks5 server header"))?;

        debug_event!(
            self.debug,
            methods = ?header.methods,
            selected_method = %server_header.method,
            "socksify: socks5 headers exchanged with auth as a provided method"
        );

        if server_header.method == SocksMethod::NoAuthenticationRequired {
            // server is fine without auth
            return Ok(SocksMethod::NoAuthenticationRequired);
        }
        check_selected_method(server_header.method, auth_method)?;

        match auth {
            SocksAuth::UsernamePassword { username, password } => {
                UsernamePasswordRequest::new(username.as_bytes(), password.as_bytes())
                    .write_to(stream)
                    .await
                    .map_err(|err| {
                        SocksError::write(err)
                            .with_context("write socks5 username-password request")
                    })?;

                let auth_reply = server::UsernamePasswordResponse::read_from(stream)
                    .await
                    .map_err(|err| {
                        SocksError::read(err).with_context("read socks5 username-password response")
                    })?;
                if !auth_reply.success() {
                    return Err(SocksError::new(ErrorKind::NotAllowed)
                        .with_context("username-password authentication failed"));
                }

                debug_event!(self.debug, "socksify: socks5 authorized using username-password");
            }
        }

        Ok(auth_method)
    }

    async fn handshake_headers_no_auth<S: Stream + Unpin>(
        &self,
        stream: &mut S,
    ) -> Result<SocksMethod, SocksError> {
        let header = Header::new(smallvec::smallvec![SocksMethod::NoAuthenticationRequired]);
        header
            .write_to(stream)
            .await
            .map_err(|err| SocksError::write(err).with_context("write socks5 header: no auth"))?;

        let server_header = server::Header::read_from(stream)
            .await
            .map_err(|err| SocksError::read(err).with_context("read socks5 server header"))?;

        debug_event!(
            self.debug,
            selected_method = %server_header.method,
            "socksify: socks5 headers exchanged without auth"
        );

        check_selected_method(server_header.method, SocksMethod::NoAuthenticationRequired)
            .map(|()| SocksMethod::NoAuthenticationRequired)
    }
}

fn check_selected_method(selected: SocksMethod, offered: SocksMethod) -> Result<(), SocksError> {
    if selected == offered {
        Ok(())
    } else if selected == SocksMethod::NoAcceptableMethods {
        Err(SocksError::new(ErrorKind::NotAllowed).with_context("no acceptable auth method"))
    } else {
        Err(SocksError::new(ErrorKind::ProtocolError).with_context("unsolicited auth method"))
    }
}

fn unexpected_outcome() -> SocksError {
    SocksError::new(ErrorKind::ProtocolError).with_context("unexpected handshake outcome")
}

fn invalid_target(context: &'static str) -> SocksError {
    SocksError::new(ErrorKind::InvalidTarget).with_context(context)
}

fn encode_socks4(framing: Framing, request: &HandshakeRequest) -> Result<v4::Request, SocksError> {
    match request {
        HandshakeRequest::Connect(destination) => {
            let target = match (&destination.host, framing) {
                (Host::Address(IpAddr::V4(ip)), _) => v4::Target::Ipv4(*ip),
                (Host::Name(name), Framing::Socks4a) => v4::Target::Name(name.clone()),
                (Host::Name(_), _) => {
                    return Err(invalid_target("socks4 requires an ipv4 destination"));
                }
                (Host::Address(IpAddr::V6(_)), _) => {
                    return Err(invalid_target("ipv6 destination not supported by socks4"));
                }
            };
            Ok(v4::Request::new(
                Socks4Command::Connect,
                target,
                destination.port,
            ))
        }
        HandshakeRequest::Resolve(name) => Ok(v4::Request::new(
            Socks4Command::Resolve,
            v4::Target::Name(name.clone()),
            0,
        )),
        HandshakeRequest::ResolvePtr(IpAddr::V4(ip)) => Ok(v4::Request::new(
            Socks4Command::ResolvePtr,
            v4::Target::Ipv4(*ip),
            0,
        )),
        HandshakeRequest::ResolvePtr(IpAddr::V6(_)) => Err(invalid_target(
            "ipv6 reverse resolve not supported by socks4",
        )),
        HandshakeRequest::Bind(_) => Err(SocksError::new(ErrorKind::CommandNotSupported)),
    }
}

fn decode_socks4(
    request: &HandshakeRequest,
    reply: v4::Reply,
) -> Result<HandshakeOutcome, SocksError> {
    if let Some(kind) = ErrorKind::from_socks4_status(reply.status) {
        let kind = match (request, kind) {
            // a rejected resolve means the name or address is unknown to the proxy
            (
                HandshakeRequest::Resolve(_) | HandshakeRequest::ResolvePtr(_),
                ErrorKind::NotAllowed,
            ) => ErrorKind::HostUnreachable,
            (_, kind) => kind,
        };
        return Err(SocksError::new(kind).with_context("socks4 request not granted"));
    }

    match request {
        HandshakeRequest::Connect(_) => Ok(HandshakeOutcome::Connected(Destination::new(
            reply.ip, reply.port,
        ))),
        HandshakeRequest::Resolve(_) => Ok(HandshakeOutcome::Resolved(reply.ip.into())),
        HandshakeRequest::ResolvePtr(_) => {
            reply
                .hostname
                .map(HandshakeOutcome::ResolvedPtr)
                .ok_or_else(|| {
                    SocksError::new(ErrorKind::ProtocolError)
                        .with_context("socks4 reverse resolve reply without hostname")
                })
        }
        HandshakeRequest::Bind(_) => Err(SocksError::new(ErrorKind::CommandNotSupported)),
    }
}

fn encode_socks5(request: &HandshakeRequest) -> Result<Request, SocksError> {
    match request {
        HandshakeRequest::Connect(destination) => {
            Ok(Request::new(Command::Connect, destination.clone()))
        }
        HandshakeRequest::Resolve(name) => Ok(Request::new(
            Command::Resolve,
            Destination::new(Host::Name(name.clone()), 0),
        )),
        HandshakeRequest::ResolvePtr(ip) => {
            Ok(Request::new(Command::ResolvePtr, Destination::new(*ip, 0)))
        }
        HandshakeRequest::Bind(_) => Err(SocksError::new(ErrorKind::CommandNotSupported)),
    }
}

fn decode_socks5(
    request: &HandshakeRequest,
    reply: server::Reply,
) -> Result<HandshakeOutcome, SocksError> {
    if let Some(kind) = ErrorKind::from_socks5_reply(reply.reply) {
        return Err(SocksError::new(kind).with_context("socks5 request not granted"));
    }

    let Destination { host, port } = reply.bind_address;
    match (request, host) {
        (HandshakeRequest::Connect(_), host) => {
            Ok(HandshakeOutcome::Connected(Destination { host, port }))
        }
        (HandshakeRequest::Resolve(_), Host::Address(ip)) => Ok(HandshakeOutcome::Resolved(ip)),
        (HandshakeRequest::ResolvePtr(_), Host::Name(name)) => {
            Ok(HandshakeOutcome::ResolvedPtr(name))
        }
        (HandshakeRequest::Resolve(_) | HandshakeRequest::ResolvePtr(_), _) => Err(
            SocksError::new(ErrorKind::ProtocolError)
                .with_context("socks5 resolve reply with unexpected address type"),
        ),
        (HandshakeRequest::Bind(_), _) => Err(SocksError::new(ErrorKind::CommandNotSupported)),
    }
}
