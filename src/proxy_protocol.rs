//! Parsing of the PROXY protocol header which a load balancer may send at
//! the start of a connection to pass on the original client's addresses.
//!
//! Both the text form (version 1) and the binary form (version 2) are
//! recognized by their leading signature.

use super::{
    byte_string::ByteString,
    charset::CharacterSet,
    error::Error,
    limits::Limits,
    tokenizer::Tokenizer,
};
use std::{
    convert::TryFrom,
    fmt,
    net::{
        IpAddr,
        Ipv4Addr,
        Ipv6Addr,
        SocketAddr,
    },
};
use tracing::{
    debug,
    trace,
};

const V1_MAGIC: &[u8] = b"PROXY";
const V2_MAGIC: &[u8] = b"\r\n\r\n\0\r\nQUIT\n";

// The longest version 1 line is 107 bytes, CRLF included.
const V1_MAX_INTERIOR: usize = 107 - 5 - 2;

// Fixed part of a version 2 header: signature, version and command,
// family and protocol, length.
const V2_FIXED_SIZE: usize = 16;

const INET_BLOCK_SIZE: usize = 12;
const INET6_BLOCK_SIZE: usize = 36;
const UNIX_BLOCK_SIZE: usize = 216;
const UNIX_PATH_SIZE: usize = 108;

const NON_CR: CharacterSet = CharacterSet::CR.complement().renamed("non-CR");

const IP_CHARS: CharacterSet = CharacterSet::from_bytes("IP address", b".:")
    .union(&CharacterSet::HEXDIG);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Version {
    V1,
    V2,
}

impl fmt::Display for Version {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Version::V1 => write!(f, "1.0"),
            Version::V2 => write!(f, "2.0"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    /// The connection was made by the proxy itself, for example a health
    /// check; the addresses are not meaningful.
    Local,

    /// The connection is relayed on behalf of another client.
    Proxy,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddressFamily {
    Unspecified,
    Inet,
    Inet6,
    Unix,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransportProtocol {
    Unspecified,
    Stream,
    Dgram,
}

/// Registered version 2 TLV type codes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TlvType {
    Alpn,
    Authority,
    Crc32c,
    Noop,
    UniqueId,
    Ssl,
    SslVersion,
    SslCn,
    SslCipher,
    SslSigAlg,
    SslKeyAlg,
    Netns,
    Other(u8),
}

impl From<u8> for TlvType {
    fn from(code: u8) -> Self {
        match code {
            0x01 => TlvType::Alpn,
            0x02 => TlvType::Authority,
            0x03 => TlvType::Crc32c,
            0x04 => TlvType::Noop,
            0x05 => TlvType::UniqueId,
            0x20 => TlvType::Ssl,
            0x21 => TlvType::SslVersion,
            0x22 => TlvType::SslCn,
            0x23 => TlvType::SslCipher,
            0x24 => TlvType::SslSigAlg,
            0x25 => TlvType::SslKeyAlg,
            0x30 => TlvType::Netns,
            code => TlvType::Other(code),
        }
    }
}

impl From<TlvType> for u8 {
    fn from(kind: TlvType) -> Self {
        match kind {
            TlvType::Alpn => 0x01,
            TlvType::Authority => 0x02,
            TlvType::Crc32c => 0x03,
            TlvType::Noop => 0x04,
            TlvType::UniqueId => 0x05,
            TlvType::Ssl => 0x20,
            TlvType::SslVersion => 0x21,
            TlvType::SslCn => 0x22,
            TlvType::SslCipher => 0x23,
            TlvType::SslSigAlg => 0x24,
            TlvType::SslKeyAlg => 0x25,
            TlvType::Netns => 0x30,
            TlvType::Other(code) => code,
        }
    }
}

/// One type-length-value record from a version 2 header.  The value is
/// kept opaque.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tlv {
    pub kind: TlvType,
    pub value: ByteString,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Addresses {
    Inet {
        source: SocketAddr,
        destination: SocketAddr,
    },

    /// Socket paths with their NUL padding removed.
    Unix {
        source: ByteString,
        destination: ByteString,
    },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Header {
    pub version: Version,
    pub command: Command,
    pub family: AddressFamily,
    pub protocol: TransportProtocol,

    /// The original addresses; absent for local connections and for
    /// headers that do not carry them.
    pub addresses: Option<Addresses>,
    pub tlvs: Vec<Tlv>,
}

impl Header {
    fn without_addresses(
        version: Version,
        command: Command,
    ) -> Self {
        Self {
            version,
            command,
            family: AddressFamily::Unspecified,
            protocol: TransportProtocol::Unspecified,
            addresses: None,
            tlvs: Vec::new(),
        }
    }

    /// Value of the first TLV record of the given type.
    #[must_use]
    pub fn find_tlv(
        &self,
        kind: TlvType,
    ) -> Option<&ByteString> {
        self.tlvs
            .iter()
            .find(|tlv| tlv.kind == kind)
            .map(|tlv| &tlv.value)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parsed {
    pub header: Header,

    /// Length of the PROXY header; the connection's own protocol starts
    /// right after it.
    pub consumed: usize,
}

fn v1_ip(
    tok: &mut Tokenizer,
    family: AddressFamily,
) -> Result<IpAddr, Error> {
    let text = tok
        .prefix(&IP_CHARS)
        .ok_or(Error::ProxyV1Malformed("malformed IP address"))?;
    let ip = std::str::from_utf8(&text)
        .ok()
        .and_then(|text| text.parse::<IpAddr>().ok())
        .ok_or(Error::ProxyV1Malformed("invalid IP address"))?;
    match (family, ip) {
        (AddressFamily::Inet, IpAddr::V4(_)) | (AddressFamily::Inet6, IpAddr::V6(_)) => Ok(ip),
        _ => Err(Error::ProxyV1Malformed(
            "declared and actual IP address families mismatch",
        )),
    }
}

fn v1_port(tok: &mut Tokenizer) -> Result<u16, Error> {
    let digits = tok
        .prefix(&CharacterSet::DIGIT)
        .ok_or(Error::ProxyV1Malformed("malformed port"))?;
    if digits.len() > 1 && digits.starts_with(b"0") {
        return Err(Error::ProxyV1Malformed("invalid port"));
    }
    Tokenizer::new(digits)
        .int64(Some(10), false)
        .and_then(|port| u16::try_from(port).ok())
        .ok_or(Error::ProxyV1Malformed("invalid port"))
}

fn v1_separator(
    tok: &mut Tokenizer,
    complaint: &'static str,
) -> Result<(), Error> {
    if tok.skip(b' ') {
        Ok(())
    } else {
        Err(Error::ProxyV1Malformed(complaint))
    }
}

// src-IP SP dst-IP SP src-port SP dst-port
fn v1_addresses(
    tok: &mut Tokenizer,
    family: AddressFamily,
) -> Result<Addresses, Error> {
    v1_separator(tok, "missing SP after the IP address family")?;
    let source_ip = v1_ip(tok, family)?;
    v1_separator(tok, "garbage after IP address")?;
    let destination_ip = v1_ip(tok, family)?;
    v1_separator(tok, "garbage after IP address")?;
    let source_port = v1_port(tok)?;
    v1_separator(tok, "garbage after port")?;
    let destination_port = v1_port(tok)?;
    if !tok.at_end() {
        return Err(Error::ProxyV1Malformed("garbage after port"));
    }
    Ok(Addresses::Inet {
        source: SocketAddr::new(source_ip, source_port),
        destination: SocketAddr::new(destination_ip, destination_port),
    })
}

fn parse_v1(input: &ByteString) -> Result<Option<Parsed>, Error> {
    let mut tok = Tokenizer::new(input.clone());
    tok.skip_literal(V1_MAGIC);
    let interior = tok
        .prefix_limited(&NON_CR, V1_MAX_INTERIOR)
        .unwrap_or_default();
    match tok.remaining().as_bytes() {
        [] | [b'\r'] => return Ok(None),
        [b'\r', b'\n', ..] => (),
        [b'\r', ..] => return Err(Error::ProxyV1Malformed("missing LF after CR")),
        _ => return Err(Error::ProxyV1TooLong),
    }
    tok.skip_literal(b"\r\n");
    let mut fields = Tokenizer::new(interior);
    v1_separator(&mut fields, "missing SP after the magic sequence")?;
    let header = if fields.skip_literal(b"UNKNOWN") {
        match fields.peek() {
            None | Some(b' ') => Header::without_addresses(Version::V1, Command::Proxy),
            Some(_) => {
                return Err(Error::ProxyV1Malformed("invalid INET protocol or family"))
            },
        }
    } else {
        let family = if fields.skip_literal(b"TCP4") {
            AddressFamily::Inet
        } else if fields.skip_literal(b"TCP6") {
            AddressFamily::Inet6
        } else {
            return Err(Error::ProxyV1Malformed("invalid INET protocol or family"));
        };
        Header {
            version: Version::V1,
            command: Command::Proxy,
            family,
            protocol: TransportProtocol::Stream,
            addresses: Some(v1_addresses(&mut fields, family)?),
            tlvs: Vec::new(),
        }
    };
    Ok(Some(Parsed {
        header,
        consumed: tok.parsed_size(),
    }))
}

// Layout of the v2 address block for the families that have one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AddressBlock {
    Inet,
    Inet6,
    Unix,
}

impl AddressBlock {
    fn for_family(family: AddressFamily) -> Option<Self> {
        match family {
            AddressFamily::Inet => Some(Self::Inet),
            AddressFamily::Inet6 => Some(Self::Inet6),
            AddressFamily::Unix => Some(Self::Unix),
            AddressFamily::Unspecified => None,
        }
    }

    fn size(self) -> usize {
        match self {
            Self::Inet => INET_BLOCK_SIZE,
            Self::Inet6 => INET6_BLOCK_SIZE,
            Self::Unix => UNIX_BLOCK_SIZE,
        }
    }
}

fn v2_addresses(
    block: &mut Tokenizer,
    layout: AddressBlock,
) -> Result<Addresses, Error> {
    let needed = layout.size();
    let available = block.remaining().len();
    let truncated = Error::ProxyV2AddressesTruncated {
        needed,
        available,
    };
    if available < needed {
        return Err(truncated);
    }
    let ip = |block: &mut Tokenizer| -> Option<IpAddr> {
        if layout == AddressBlock::Inet {
            let bytes = block.take(4)?;
            Some(IpAddr::V4(Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3])))
        } else {
            let bytes = block.take(16)?;
            let mut octets = [0_u8; 16];
            octets.copy_from_slice(&bytes);
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
    };
    let path = |block: &mut Tokenizer| -> Option<ByteString> {
        let mut path = block.take(UNIX_PATH_SIZE)?;
        let end = path.find(0, 0).unwrap_or_else(|| path.len());
        Some(path.consume(end))
    };
    let addresses = if layout == AddressBlock::Unix {
        path(block).and_then(|source| {
            Some(Addresses::Unix {
                source,
                destination: path(block)?,
            })
        })
    } else {
        ip(block).and_then(|source_ip| {
            let destination_ip = ip(block)?;
            Some(Addresses::Inet {
                source: SocketAddr::new(source_ip, block.uint16()?),
                destination: SocketAddr::new(destination_ip, block.uint16()?),
            })
        })
    };
    addresses.ok_or(truncated)
}

fn v2_tlvs(block: &mut Tokenizer) -> Result<Vec<Tlv>, Error> {
    let mut tlvs = Vec::new();
    while let Some(code) = block.uint8() {
        let value = block
            .uint16()
            .and_then(|length| block.take(usize::from(length)))
            .ok_or(Error::ProxyV2TlvOverrun)?;
        tlvs.push(Tlv {
            kind: TlvType::from(code),
            value,
        });
    }
    Ok(tlvs)
}

fn parse_v2(
    input: &ByteString,
    limits: &Limits,
) -> Result<Option<Parsed>, Error> {
    let mut tok = Tokenizer::new(input.clone());
    tok.skip_literal(V2_MAGIC);
    let version_command = match tok.uint8() {
        Some(byte) => byte,
        None => return Ok(None),
    };
    let version = version_command >> 4;
    if version != 2 {
        return Err(Error::ProxyV2InvalidVersion(version));
    }
    let command = match version_command & 0x0F {
        0 => Command::Local,
        1 => Command::Proxy,
        command => return Err(Error::ProxyV2InvalidCommand(command)),
    };
    let family_protocol = match tok.uint8() {
        Some(byte) => byte,
        None => return Ok(None),
    };
    let family = match family_protocol >> 4 {
        0 => AddressFamily::Unspecified,
        1 => AddressFamily::Inet,
        2 => AddressFamily::Inet6,
        3 => AddressFamily::Unix,
        family => return Err(Error::ProxyV2InvalidFamily(family)),
    };
    let protocol = match family_protocol & 0x0F {
        0 => TransportProtocol::Unspecified,
        1 => TransportProtocol::Stream,
        2 => TransportProtocol::Dgram,
        protocol => return Err(Error::ProxyV2InvalidTransport(protocol)),
    };
    let length = match tok.uint16() {
        Some(length) => usize::from(length),
        None => return Ok(None),
    };
    if V2_FIXED_SIZE + length > limits.max_proxy_header {
        return Err(Error::ProxyV2TooLong {
            limit: limits.max_proxy_header,
        });
    }
    let mut block = match tok.take(length) {
        Some(block) => Tokenizer::new(block),
        None => return Ok(None),
    };
    let mut header = Header {
        version: Version::V2,
        command,
        family,
        protocol,
        addresses: None,
        tlvs: Vec::new(),
    };
    // Without a known family and protocol the block cannot be split into
    // addresses and TLVs, so all of it is skipped.
    let layout = AddressBlock::for_family(family)
        .filter(|_| protocol != TransportProtocol::Unspecified);
    if let Some(layout) = layout {
        let addresses = v2_addresses(&mut block, layout)?;
        let tlvs = v2_tlvs(&mut block)?;
        if command == Command::Proxy {
            header.addresses = Some(addresses);
            header.tlvs = tlvs;
        }
    }
    Ok(Some(Parsed {
        header,
        consumed: tok.parsed_size(),
    }))
}

/// Parse the PROXY protocol header at the start of `input` using the
/// default [`Limits`].
pub fn parse(input: &ByteString) -> Result<Option<Parsed>, Error> {
    parse_with_limits(input, &Limits::default())
}

/// Parse the PROXY protocol header at the start of `input`.
///
/// `Ok(None)` means `input` is a valid but incomplete start of a header;
/// call again once more bytes have arrived.  Input which cannot be the
/// start of either header version is rejected with
/// [`Error::ProxyInvalidMagic`] as soon as the first wrong byte is seen.
pub fn parse_with_limits(
    input: &ByteString,
    limits: &Limits,
) -> Result<Option<Parsed>, Error> {
    let result = if input.starts_with(V2_MAGIC) {
        parse_v2(input, limits)
    } else if input.starts_with(V1_MAGIC) {
        parse_v1(input)
    } else if V2_MAGIC.starts_with(input.as_bytes())
        || V1_MAGIC.starts_with(input.as_bytes())
    {
        Ok(None)
    } else {
        Err(Error::ProxyInvalidMagic)
    };
    match &result {
        Ok(Some(parsed)) => trace!(
            version = %parsed.header.version,
            command = ?parsed.header.command,
            consumed = parsed.consumed,
            "PROXY header parsed"
        ),
        Ok(None) => trace!(available = input.len(), "PROXY header incomplete"),
        Err(error) => debug!(%error, "rejecting PROXY header"),
    }
    result
}

#[cfg(test)]
mod tests {

    use super::*;

    fn v2(
        version_command: u8,
        family_protocol: u8,
        block: &[u8],
    ) -> Vec<u8> {
        let mut header = V2_MAGIC.to_vec();
        header.push(version_command);
        header.push(family_protocol);
        header.extend_from_slice(&u16::try_from(block.len()).unwrap().to_be_bytes());
        header.extend_from_slice(block);
        header
    }

    fn parse_bytes(input: &[u8]) -> Result<Option<Parsed>, Error> {
        parse(&ByteString::from(input))
    }

    fn inet_block() -> Vec<u8> {
        let mut block = vec![10, 0, 0, 1, 10, 0, 0, 2];
        block.extend_from_slice(&56324_u16.to_be_bytes());
        block.extend_from_slice(&443_u16.to_be_bytes());
        block
    }

    #[test]
    fn v1_tcp4() {
        let header = "PROXY TCP4 192.168.0.1 192.168.0.11 56324 443\r\n";
        let input = format!("{}GET / HTTP/1.1\r\n", header);
        let parsed = parse(&ByteString::from(input)).unwrap().unwrap();
        assert_eq!(47, parsed.consumed);
        assert_eq!(header.len(), parsed.consumed);
        assert_eq!("1.0", parsed.header.version.to_string());
        assert_eq!(Command::Proxy, parsed.header.command);
        assert_eq!(AddressFamily::Inet, parsed.header.family);
        assert_eq!(TransportProtocol::Stream, parsed.header.protocol);
        assert_eq!(
            Some(Addresses::Inet {
                source: "192.168.0.1:56324".parse().unwrap(),
                destination: "192.168.0.11:443".parse().unwrap(),
            }),
            parsed.header.addresses
        );
        assert!(parsed.header.tlvs.is_empty());
    }

    #[test]
    fn v1_tcp6() {
        let header = "PROXY TCP6 2001:db8::1 ::1 1234 80\r\n";
        let parsed = parse(&ByteString::from(header)).unwrap().unwrap();
        assert_eq!(header.len(), parsed.consumed);
        assert_eq!(AddressFamily::Inet6, parsed.header.family);
        assert_eq!(
            Some(Addresses::Inet {
                source: "[2001:db8::1]:1234".parse().unwrap(),
                destination: "[::1]:80".parse().unwrap(),
            }),
            parsed.header.addresses
        );
    }

    #[test]
    fn v1_unknown() {
        for header in &[
            "PROXY UNKNOWN\r\n",
            "PROXY UNKNOWN ffff:f...f:ffff ffff:f...f:ffff 65535 65535\r\n",
        ] {
            let parsed = parse(&ByteString::from(*header)).unwrap().unwrap();
            assert_eq!(header.len(), parsed.consumed);
            assert_eq!(AddressFamily::Unspecified, parsed.header.family);
            assert_eq!(None, parsed.header.addresses);
        }
    }

    #[test]
    fn v1_malformed() {
        for header in &[
            "PROXY\r\n",
            "PROXY  TCP4 1.2.3.4 5.6.7.8 1 2\r\n",
            "PROXY tcp4 1.2.3.4 5.6.7.8 1 2\r\n",
            "PROXY TCP5 1.2.3.4 5.6.7.8 1 2\r\n",
            "PROXY UNKNOWNX\r\n",
            "PROXY TCP4 1.2.3.4 5.6.7.8 1 2 \r\n",
            "PROXY TCP4 1.2.3.4  5.6.7.8 1 2\r\n",
            "PROXY TCP4 1.2.3.4 5.6.7.8 1\r\n",
            "PROXY TCP4 1.2.3.4 5.6.7.8 65536 2\r\n",
            "PROXY TCP4 1.2.3.4 5.6.7.8 0443 2\r\n",
            "PROXY TCP4 1.2.3.4 5.6.7.8 -1 2\r\n",
            "PROXY TCP4 1.2.3 5.6.7.8 1 2\r\n",
            "PROXY TCP4 ::1 ::1 1 2\r\n",
            "PROXY TCP6 1.2.3.4 5.6.7.8 1 2\r\n",
            "PROXY UNKNOWN\rX",
        ] {
            assert!(
                matches!(parse(&ByteString::from(*header)), Err(Error::ProxyV1Malformed(_))),
                "{:?}",
                header
            );
        }
    }

    #[test]
    fn v1_length_limit() {
        let longest = format!("PROXY UNKNOWN {}\r\n", "x".repeat(91));
        assert_eq!(107, longest.len());
        assert!(matches!(parse(&ByteString::from(longest)), Ok(Some(_))));
        let too_long = format!("PROXY UNKNOWN {}\r\n", "x".repeat(92));
        assert_eq!(Err(Error::ProxyV1TooLong), parse(&ByteString::from(too_long)));
    }

    #[test]
    fn v1_one_byte_at_a_time() {
        let header = "PROXY TCP4 192.168.0.1 192.168.0.11 56324 443\r\n";
        for i in 0..header.len() {
            assert_eq!(Ok(None), parse(&ByteString::from(&header[..i])), "{}", i);
        }
        assert!(matches!(parse(&ByteString::from(header)), Ok(Some(_))));
    }

    #[test]
    fn v2_proxy_inet_with_tlvs() {
        let mut block = inet_block();
        block.extend_from_slice(b"\x01\x00\x02h2");
        block.extend_from_slice(b"\x02\x00\x0bexample.com");
        block.extend_from_slice(b"\xe0\x00\x01z");
        let mut input = v2(0x21, 0x11, &block);
        let length = input.len();
        input.extend_from_slice(b"GET");
        let parsed = parse_bytes(&input).unwrap().unwrap();
        assert_eq!(length, parsed.consumed);
        assert_eq!(16 + 35, parsed.consumed);
        assert_eq!("2.0", parsed.header.version.to_string());
        assert_eq!(Command::Proxy, parsed.header.command);
        assert_eq!(AddressFamily::Inet, parsed.header.family);
        assert_eq!(TransportProtocol::Stream, parsed.header.protocol);
        assert_eq!(
            Some(Addresses::Inet {
                source: "10.0.0.1:56324".parse().unwrap(),
                destination: "10.0.0.2:443".parse().unwrap(),
            }),
            parsed.header.addresses
        );
        assert_eq!(
            vec![TlvType::Alpn, TlvType::Authority, TlvType::Other(0xE0)],
            parsed.header.tlvs.iter().map(|tlv| tlv.kind).collect::<Vec<_>>()
        );
        assert_eq!(
            Some(&ByteString::from("example.com")),
            parsed.header.find_tlv(TlvType::Authority)
        );
        assert_eq!(None, parsed.header.find_tlv(TlvType::Netns));
    }

    #[test]
    fn v2_local_discards_addresses_and_tlvs() {
        let mut block = inet_block();
        block.extend_from_slice(b"\x04\x00\x04abcd");
        let mut input = v2(0x20, 0x11, &block);
        input.extend_from_slice(b"GET");
        let parsed = parse_bytes(&input).unwrap().unwrap();
        assert_eq!(35, parsed.consumed);
        assert_eq!(Command::Local, parsed.header.command);
        assert_eq!(None, parsed.header.addresses);
        assert!(parsed.header.tlvs.is_empty());

        let parsed = parse_bytes(&v2(0x20, 0x00, b"")).unwrap().unwrap();
        assert_eq!(16, parsed.consumed);
        assert_eq!(AddressFamily::Unspecified, parsed.header.family);
        assert_eq!(None, parsed.header.addresses);
    }

    #[test]
    fn v2_unspecified_skips_block() {
        let parsed = parse_bytes(&v2(0x21, 0x00, b"opaque bytes")).unwrap().unwrap();
        assert_eq!(28, parsed.consumed);
        assert_eq!(None, parsed.header.addresses);
        assert!(parsed.header.tlvs.is_empty());
    }

    #[test]
    fn v2_unspecified_family_skips_block_for_any_protocol() {
        let parsed = parse_bytes(&v2(0x21, 0x01, b"opaque bytes")).unwrap().unwrap();
        assert_eq!(28, parsed.consumed);
        assert_eq!(AddressFamily::Unspecified, parsed.header.family);
        assert_eq!(TransportProtocol::Stream, parsed.header.protocol);
        assert_eq!(None, parsed.header.addresses);
        assert!(parsed.header.tlvs.is_empty());
    }

    #[test]
    fn address_block_layouts() {
        assert_eq!(None, AddressBlock::for_family(AddressFamily::Unspecified));
        assert_eq!(
            Some(12),
            AddressBlock::for_family(AddressFamily::Inet).map(AddressBlock::size)
        );
        assert_eq!(
            Some(36),
            AddressBlock::for_family(AddressFamily::Inet6).map(AddressBlock::size)
        );
        assert_eq!(
            Some(216),
            AddressBlock::for_family(AddressFamily::Unix).map(AddressBlock::size)
        );
    }

    #[test]
    fn v2_inet6() {
        let source: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let destination = Ipv6Addr::LOCALHOST;
        let mut block = source.octets().to_vec();
        block.extend_from_slice(&destination.octets());
        block.extend_from_slice(&1234_u16.to_be_bytes());
        block.extend_from_slice(&80_u16.to_be_bytes());
        let parsed = parse_bytes(&v2(0x21, 0x22, &block)).unwrap().unwrap();
        assert_eq!(TransportProtocol::Dgram, parsed.header.protocol);
        assert_eq!(
            Some(Addresses::Inet {
                source: SocketAddr::new(IpAddr::V6(source), 1234),
                destination: SocketAddr::new(IpAddr::V6(destination), 80),
            }),
            parsed.header.addresses
        );
    }

    #[test]
    fn v2_unix() {
        let mut block = vec![0; UNIX_BLOCK_SIZE];
        block[..11].copy_from_slice(b"/tmp/a.sock");
        block[UNIX_PATH_SIZE..UNIX_PATH_SIZE + 11].copy_from_slice(b"/tmp/b.sock");
        let parsed = parse_bytes(&v2(0x21, 0x31, &block)).unwrap().unwrap();
        assert_eq!(16 + UNIX_BLOCK_SIZE, parsed.consumed);
        assert_eq!(
            Some(Addresses::Unix {
                source: "/tmp/a.sock".into(),
                destination: "/tmp/b.sock".into(),
            }),
            parsed.header.addresses
        );
    }

    #[test]
    fn v2_tlv_overrun() {
        let mut block = inet_block();
        block.extend_from_slice(b"\x01\x00\x05h2");
        assert_eq!(Err(Error::ProxyV2TlvOverrun), parse_bytes(&v2(0x21, 0x11, &block)));
        let mut block = inet_block();
        block.extend_from_slice(b"\x01\x00");
        assert_eq!(Err(Error::ProxyV2TlvOverrun), parse_bytes(&v2(0x21, 0x11, &block)));
    }

    #[test]
    fn v2_addresses_truncated() {
        assert_eq!(
            Err(Error::ProxyV2AddressesTruncated {
                needed: 36,
                available: 12
            }),
            parse_bytes(&v2(0x21, 0x21, &inet_block()))
        );
    }

    #[test]
    fn v2_invalid_fields() {
        assert_eq!(Err(Error::ProxyV2InvalidVersion(1)), parse_bytes(&v2(0x11, 0x11, b"")));
        assert_eq!(Err(Error::ProxyV2InvalidCommand(2)), parse_bytes(&v2(0x22, 0x11, b"")));
        assert_eq!(Err(Error::ProxyV2InvalidFamily(4)), parse_bytes(&v2(0x21, 0x41, b"")));
        assert_eq!(Err(Error::ProxyV2InvalidTransport(3)), parse_bytes(&v2(0x21, 0x13, b"")));
        let mut input = V2_MAGIC.to_vec();
        input.push(0x31);
        assert_eq!(Err(Error::ProxyV2InvalidVersion(3)), parse_bytes(&input));
    }

    #[test]
    fn v2_length_limit() {
        let mut input = V2_MAGIC.to_vec();
        input.extend_from_slice(b"\x21\x11\xff\xff");
        assert_eq!(
            Err(Error::ProxyV2TooLong {
                limit: 4096
            }),
            parse_bytes(&input)
        );
        let limits = Limits::default().with_max_proxy_header(16 + 11);
        let input = v2(0x21, 0x11, &inet_block());
        assert_eq!(
            Err(Error::ProxyV2TooLong {
                limit: 27
            }),
            parse_with_limits(&ByteString::from(input), &limits)
        );
    }

    #[test]
    fn v2_one_byte_at_a_time() {
        let mut block = inet_block();
        block.extend_from_slice(b"\x05\x00\x03xyz");
        let input = v2(0x21, 0x11, &block);
        for i in 0..input.len() {
            assert_eq!(Ok(None), parse_bytes(&input[..i]), "{}", i);
        }
        assert!(matches!(parse_bytes(&input), Ok(Some(Parsed { consumed: 34, .. }))));
    }

    #[test]
    fn invalid_magic() {
        assert_eq!(
            Err(Error::ProxyInvalidMagic),
            parse(&ByteString::from("GET / HTTP/1.1\r\n"))
        );
        assert_eq!(Err(Error::ProxyInvalidMagic), parse(&ByteString::from("PROXZ")));
        assert_eq!(Err(Error::ProxyInvalidMagic), parse(&ByteString::from("G")));
        assert_eq!(Err(Error::ProxyInvalidMagic), parse_bytes(b"\r\n\r\n\0X"));
        assert_eq!(Ok(None), parse(&ByteString::new()));
        assert_eq!(Ok(None), parse(&ByteString::from("PROX")));
        assert_eq!(Ok(None), parse_bytes(b"\r\n\r\n\0\r\nQU"));
    }

    #[test]
    fn tlv_type_codes() {
        assert_eq!(TlvType::Crc32c, TlvType::from(0x03));
        assert_eq!(TlvType::SslCn, TlvType::from(0x22));
        assert_eq!(TlvType::Other(0xEE), TlvType::from(0xEE));
        assert_eq!(0x30, u8::from(TlvType::Netns));
        assert_eq!(0x25, u8::from(TlvType::SslKeyAlg));
    }
}
