use socksify_utils::macros::enums::enum_builder;

enum_builder! {
    /// Protocol version byte, the first byte of every client request.
    @U8
    pub enum ProtocolVersion {
        Socks4 => 0x04,
        Socks5 => 0x05,
    }
}

enum_builder! {
    /// Subnegotiation version as defined by [RFC 1929].
    ///
    /// [RFC 1929]: https://datatracker.ietf.org/doc/html/rfc1929#section-2
    @U8
    pub enum UsernamePasswordSubnegotiationVersion {
        One => 0x01,
    }
}

enum_builder! {
    /// Socks5 Method as defined by [IANA SOCKS Methods]
    ///
    /// Only the methods this crate can negotiate are named,
    /// all others decode as `Unknown`.
    ///
    /// [IANA SOCKS Methods]: https://www.iana.org/assignments/socks-methods/socks-methods.xhtml
    @U8
    pub enum SocksMethod {
        /// No authentication required.
        ///
        /// Reference: [RFC 1928](https://datatracker.ietf.org/doc/html/rfc1928)
        NoAuthenticationRequired => 0x00,
        /// Generic Security Services Application Program Interface
        ///
        /// Reference: [RFC 1928](https://datatracker.ietf.org/doc/html/rfc1928)
        GSSAPI => 0x01,
        /// Username/Password Authentication for SOCKS V5
        ///
        /// Reference: [RFC 1929](https://datatracker.ietf.org/doc/html/rfc1929)
        UsernamePassword => 0x02,
        /// No acceptable methods.
        ///
        /// If the selected METHOD (by the server) is X'FF', none of the methods listed by the
        /// client are acceptable, and the client MUST close the connection.
        NoAcceptableMethods => 0xFF,
    }
}

enum_builder! {
    /// SOCKS5 request command.
    ///
    /// Reference: <https://datatracker.ietf.org/doc/html/rfc1928#section-4>
    @U8
    pub enum Command {
        /// Request the server to establish a connection on behalf of the client
        /// with the destination address.
        Connect => 0x01,
        /// Used in protocols which require the client to accept connections from the server.
        Bind => 0x02,
        /// Used to establish an association within
        /// the UDP relay process to handle UDP datagrams.
        UdpAssociate => 0x03,
        /// Non-standard extension: resolve the (domain name) destination
        /// and reply with its address. Popularised by Tor.
        Resolve => 0xF0,
        /// Non-standard extension: reverse resolve the (ip) destination
        /// and reply with a domain name. Popularised by Tor.
        ResolvePtr => 0xF1,
    }
}

enum_builder! {
    /// SOCKS4 request command.
    @U8
    pub enum Socks4Command {
        Connect => 0x01,
        Bind => 0x02,
        /// SOCKS4a extension, see [`Command::Resolve`].
        Resolve => 0xF0,
        /// SOCKS4a extension, see [`Command::ResolvePtr`].
        ResolvePtr => 0xF1,
    }
}

enum_builder! {
    /// Type of the address following it.
    ///
    /// Only used during encoding and decoding,
    /// but no use for the in-memory representation.
    ///
    /// Reference: <https://datatracker.ietf.org/doc/html/rfc1928>
    @U8
    pub enum AddressType {
        /// The address is a version-4 IP address, with a length of 4 octets.
        IpV4 => 0x01,
        /// The address is a length-prefixed (max 255 byte) domain name.
        ///
        /// The first octet of the address field contains the number of octets of name that
        /// follow, there is no terminating NUL octet.
        DomainName => 0x03,
        /// The address is a version-6 IP address, with a length of 16 octets.
        IpV6 => 0x04,
    }
}

enum_builder! {
    /// Indicates success or failure as the SOCKS5 reply to a client request.
    ///
    /// Reference: <https://datatracker.ietf.org/doc/html/rfc1928#section-6>
    @U8
    pub enum ReplyKind {
        Succeeded => 0x00,
        GeneralServerFailure => 0x01,
        ConnectionNotAllowed => 0x02,
        NetworkUnreachable => 0x03,
        HostUnreachable => 0x04,
        ConnectionRefused => 0x05,
        TtlExpired => 0x06,
        CommandNotSupported => 0x07,
        AddressTypeNotSupported => 0x08,
    }
}

enum_builder! {
    /// Status byte of a SOCKS4 reply.
    @U8
    pub enum Socks4Status {
        /// Request granted.
        Granted => 0x5A,
        /// Request rejected or failed.
        Rejected => 0x5B,
        /// Request failed because client is not running identd (or not reachable from server).
        IdentdUnreachable => 0x5C,
        /// Request failed because client's identd could not confirm the user ID in the request.
        IdentdDiffer => 0x5D,
    }
}
