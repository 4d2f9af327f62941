//! Bounds-checked header views over raw Ethernet frames.
//!
//! Every header is a borrowed view that can only be constructed after the
//! frame has been checked to hold the whole header. Accessors then index a
//! slice of known length, so no read can run past the end of the frame.

use std::fmt;

use thiserror::Error;

/// Ethernet II header length.
pub const ETH_HLEN: usize = 14;
/// Minimum IPv4 header length (IHL = 5).
pub const IPV4_MIN_HLEN: usize = 20;
/// Fixed TCP header length without options.
pub const TCP_HLEN: usize = 20;
/// UDP header length.
pub const UDP_HLEN: usize = 8;

/// Shortest frame that carries readable link and network headers.
pub const MIN_FRAME_LEN: usize = ETH_HLEN + IPV4_MIN_HLEN;

/// EtherType for IPv4.
pub const ETH_P_IP: u16 = 0x0800;
/// IP protocol number for TCP.
pub const IPPROTO_TCP: u8 = 6;
/// IP protocol number for UDP.
pub const IPPROTO_UDP: u8 = 17;

/// Protocol layer a header belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Link,
    Network,
    Transport,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Link => write!(f, "link"),
            Layer::Network => write!(f, "network"),
            Layer::Transport => write!(f, "transport"),
        }
    }
}

/// Errors from header parsing.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("{layer} header truncated: need {needed} bytes at offset {offset}, frame has {available}")]
    Truncated {
        layer: Layer,
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid IPv4 header length: {0} words")]
    InvalidHeaderLength(u8),

    #[error("invalid UDP length field: {0}")]
    InvalidUdpLength(u16),
}

impl ParseError {
    /// Layer the error was raised at.
    pub fn layer(&self) -> Layer {
        match self {
            ParseError::Truncated { layer, .. } => *layer,
            ParseError::InvalidHeaderLength(_) => Layer::Network,
            ParseError::InvalidUdpLength(_) => Layer::Transport,
        }
    }

    /// Whether a frame failing with this error must be dropped.
    ///
    /// Unreadable link and network headers are untrusted and fail closed.
    /// Transport failures fail open.
    pub fn is_fail_closed(&self) -> bool {
        matches!(self.layer(), Layer::Link | Layer::Network)
    }
}

/// Return `frame[offset..offset + len]` or a truncation error.
fn bounded(frame: &[u8], offset: usize, len: usize, layer: Layer) -> Result<&[u8], ParseError> {
    let truncated = ParseError::Truncated {
        layer,
        offset,
        needed: len,
        available: frame.len(),
    };
    let end = offset.checked_add(len).ok_or(truncated)?;
    frame.get(offset..end).ok_or(truncated)
}

#[inline]
fn be16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

#[inline]
fn be32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Ethernet II header.
#[derive(Debug, Clone, Copy)]
pub struct EthernetHeader<'a> {
    bytes: &'a [u8],
}

impl<'a> EthernetHeader<'a> {
    pub fn parse(frame: &'a [u8]) -> Result<Self, ParseError> {
        let bytes = bounded(frame, 0, ETH_HLEN, Layer::Link)?;
        Ok(Self { bytes })
    }

    pub fn ether_type(&self) -> u16 {
        be16(self.bytes, 12)
    }

    pub fn is_ipv4(&self) -> bool {
        self.ether_type() == ETH_P_IP
    }
}

/// IPv4 header, including any options.
#[derive(Debug, Clone, Copy)]
pub struct Ipv4Header<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Ipv4Header<'a> {
    /// Parse the IPv4 header starting at `offset`.
    ///
    /// The fixed part is checked first, then the full IHL-declared length.
    pub fn parse(frame: &'a [u8], offset: usize) -> Result<Self, ParseError> {
        let fixed = bounded(frame, offset, IPV4_MIN_HLEN, Layer::Network)?;
        let ihl = fixed[0] & 0x0f;
        let header_len = usize::from(ihl) * 4;
        if header_len < IPV4_MIN_HLEN {
            return Err(ParseError::InvalidHeaderLength(ihl));
        }
        let bytes = bounded(frame, offset, header_len, Layer::Network)?;
        Ok(Self { bytes, offset })
    }

    pub fn version(&self) -> u8 {
        self.bytes[0] >> 4
    }

    /// Header length in bytes.
    pub fn header_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn protocol(&self) -> u8 {
        self.bytes[9]
    }

    /// Source address, most significant octet first (same as `Ipv4Addr`).
    pub fn source(&self) -> u32 {
        be32(self.bytes, 12)
    }

    pub fn destination(&self) -> u32 {
        be32(self.bytes, 16)
    }

    /// Offset of the transport header within the frame.
    pub fn payload_offset(&self) -> usize {
        self.offset + self.header_len()
    }
}

/// TCP control flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpFlags(u8);

impl TcpFlags {
    pub const FIN: u8 = 0x01;
    pub const SYN: u8 = 0x02;
    pub const RST: u8 = 0x04;
    pub const PSH: u8 = 0x08;
    pub const ACK: u8 = 0x10;

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn syn(&self) -> bool {
        self.0 & Self::SYN != 0
    }

    pub fn ack(&self) -> bool {
        self.0 & Self::ACK != 0
    }
}

/// TCP header (fixed part only; options are never read).
#[derive(Debug, Clone, Copy)]
pub struct TcpHeader<'a> {
    bytes: &'a [u8],
}

impl<'a> TcpHeader<'a> {
    pub fn parse(frame: &'a [u8], offset: usize) -> Result<Self, ParseError> {
        let bytes = bounded(frame, offset, TCP_HLEN, Layer::Transport)?;
        Ok(Self { bytes })
    }

    pub fn source_port(&self) -> u16 {
        be16(self.bytes, 0)
    }

    pub fn dest_port(&self) -> u16 {
        be16(self.bytes, 2)
    }

    pub fn flags(&self) -> TcpFlags {
        TcpFlags(self.bytes[13])
    }

    pub fn is_syn(&self) -> bool {
        self.flags().syn()
    }
}

/// UDP header plus the payload bytes it declares that are present in the frame.
#[derive(Debug, Clone, Copy)]
pub struct UdpDatagram<'a> {
    header: &'a [u8],
    payload: &'a [u8],
}

impl<'a> UdpDatagram<'a> {
    /// Parse a UDP header at `offset`.
    ///
    /// The payload is bounded by both the UDP length field and the end of the
    /// frame, so trailing link-layer padding is never mistaken for payload.
    pub fn parse(frame: &'a [u8], offset: usize) -> Result<Self, ParseError> {
        let header = bounded(frame, offset, UDP_HLEN, Layer::Transport)?;
        let length = be16(header, 4);
        let declared = usize::from(length)
            .checked_sub(UDP_HLEN)
            .ok_or(ParseError::InvalidUdpLength(length))?;
        let start = offset + UDP_HLEN;
        let available = frame.len().saturating_sub(start);
        let payload = &frame[start..start + declared.min(available)];
        Ok(Self { header, payload })
    }

    pub fn source_port(&self) -> u16 {
        be16(self.header, 0)
    }

    pub fn dest_port(&self) -> u16 {
        be16(self.header, 2)
    }

    /// Payload length according to the header's length field.
    pub fn declared_payload_len(&self) -> usize {
        usize::from(be16(self.header, 4)).saturating_sub(UDP_HLEN)
    }

    /// Declared payload bytes that are present in the frame.
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Whether every declared payload byte is present.
    pub fn is_complete(&self) -> bool {
        self.payload.len() == self.declared_payload_len()
    }
}

/// Transport header of an IPv4 packet.
#[derive(Debug, Clone, Copy)]
pub enum Transport<'a> {
    Tcp(TcpHeader<'a>),
    Udp(UdpDatagram<'a>),
    /// Any protocol other than TCP or UDP.
    Other(u8),
}

/// A frame whose link and network headers are readable.
#[derive(Debug, Clone, Copy)]
pub enum Packet<'a> {
    /// An IPv4 packet. The transport parse result is kept separately because
    /// a transport failure does not invalidate the packet.
    Ipv4 {
        ip: Ipv4Header<'a>,
        transport: Result<Transport<'a>, ParseError>,
    },
    /// A frame carrying something other than IPv4.
    NonIpv4 { ether_type: u16 },
}

/// Parse link, network and transport headers of `frame`.
///
/// Returns an error only for unreadable link/network headers. Frames shorter
/// than [`MIN_FRAME_LEN`] are rejected whatever their EtherType.
pub fn parse_frame(frame: &[u8]) -> Result<Packet<'_>, ParseError> {
    let eth = EthernetHeader::parse(frame)?;
    bounded(frame, ETH_HLEN, IPV4_MIN_HLEN, Layer::Network)?;

    if !eth.is_ipv4() {
        return Ok(Packet::NonIpv4 {
            ether_type: eth.ether_type(),
        });
    }

    let ip = Ipv4Header::parse(frame, ETH_HLEN)?;
    let offset = ip.payload_offset();
    let transport = match ip.protocol() {
        IPPROTO_TCP => TcpHeader::parse(frame, offset).map(Transport::Tcp),
        IPPROTO_UDP => UdpDatagram::parse(frame, offset).map(Transport::Udp),
        other => Ok(Transport::Other(other)),
    };

    Ok(Packet::Ipv4 { ip, transport })
}
