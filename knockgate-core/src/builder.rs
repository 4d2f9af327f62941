//! Frame construction helpers.
//!
//! Builds Ethernet/IPv4/TCP-or-UDP frames with correct length fields for
//! tests and replay fixtures. Checksums are left zero; the classifier never
//! reads them.

use crate::packet::{TcpFlags, ETH_HLEN, ETH_P_IP, IPPROTO_TCP, IPPROTO_UDP, UDP_HLEN};

const DEFAULT_DEST_ADDR: u32 = 0x0A00_00FE; // 10.0.0.254
const DEFAULT_SOURCE_PORT: u16 = 40000;

#[derive(Debug, Clone)]
enum Body {
    Tcp { flags: u8 },
    Udp { payload: Vec<u8> },
}

/// Builder for a single IPv4 frame.
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    src: u32,
    dst: u32,
    src_port: u16,
    dst_port: u16,
    ip_options: usize,
    protocol: Option<u8>,
    pad_to: usize,
    body: Body,
}

impl FrameBuilder {
    fn new(src: u32, dst_port: u16, body: Body) -> Self {
        Self {
            src,
            dst: DEFAULT_DEST_ADDR,
            src_port: DEFAULT_SOURCE_PORT,
            dst_port,
            ip_options: 0,
            protocol: None,
            pad_to: 0,
            body,
        }
    }

    /// TCP segment with the given flag bits.
    pub fn tcp(src: u32, dst_port: u16, flags: u8) -> Self {
        Self::new(src, dst_port, Body::Tcp { flags })
    }

    /// TCP segment with only SYN set.
    pub fn tcp_syn(src: u32, dst_port: u16) -> Self {
        Self::tcp(src, dst_port, TcpFlags::SYN)
    }

    /// UDP datagram carrying `payload`.
    pub fn udp(src: u32, dst_port: u16, payload: &[u8]) -> Self {
        Self::new(
            src,
            dst_port,
            Body::Udp {
                payload: payload.to_vec(),
            },
        )
    }

    /// Builder: set the destination address.
    pub fn destination(mut self, dst: u32) -> Self {
        self.dst = dst;
        self
    }

    /// Builder: set the source port.
    pub fn source_port(mut self, port: u16) -> Self {
        self.src_port = port;
        self
    }

    /// Builder: append `len` bytes of IPv4 options (rounded up to whole words, at most 40).
    pub fn ip_options(mut self, len: usize) -> Self {
        self.ip_options = len.div_ceil(4).min(10) * 4;
        self
    }

    /// Builder: override the IPv4 protocol number.
    pub fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Builder: pad the frame with zeros up to `len` bytes.
    pub fn pad_to(mut self, len: usize) -> Self {
        self.pad_to = len;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut transport = Vec::new();
        let default_protocol = match &self.body {
            Body::Tcp { flags } => {
                transport.extend_from_slice(&self.src_port.to_be_bytes());
                transport.extend_from_slice(&self.dst_port.to_be_bytes());
                transport.extend_from_slice(&1u32.to_be_bytes()); // seq
                transport.extend_from_slice(&0u32.to_be_bytes()); // ack
                transport.push(5 << 4); // data offset
                transport.push(*flags);
                transport.extend_from_slice(&64240u16.to_be_bytes()); // window
                transport.extend_from_slice(&[0, 0, 0, 0]); // checksum, urgent
                IPPROTO_TCP
            }
            Body::Udp { payload } => {
                let len = (UDP_HLEN + payload.len()) as u16;
                transport.extend_from_slice(&self.src_port.to_be_bytes());
                transport.extend_from_slice(&self.dst_port.to_be_bytes());
                transport.extend_from_slice(&len.to_be_bytes());
                transport.extend_from_slice(&[0, 0]);
                transport.extend_from_slice(payload);
                IPPROTO_UDP
            }
        };

        let ip_hlen = 20 + self.ip_options;
        let total_len = (ip_hlen + transport.len()) as u16;

        let mut frame = Vec::with_capacity(ETH_HLEN + total_len as usize);
        frame.extend_from_slice(&[0x02, 0, 0, 0, 0, 0x01]); // dst mac
        frame.extend_from_slice(&[0x02, 0, 0, 0, 0, 0x02]); // src mac
        frame.extend_from_slice(&ETH_P_IP.to_be_bytes());

        frame.push(0x40 | (ip_hlen / 4) as u8);
        frame.push(0);
        frame.extend_from_slice(&total_len.to_be_bytes());
        frame.extend_from_slice(&[0, 0, 0x40, 0]); // id, DF
        frame.push(64);
        frame.push(self.protocol.unwrap_or(default_protocol));
        frame.extend_from_slice(&[0, 0]);
        frame.extend_from_slice(&self.src.to_be_bytes());
        frame.extend_from_slice(&self.dst.to_be_bytes());
        frame.resize(frame.len() + self.ip_options, 0x01); // NOP options

        frame.extend_from_slice(&transport);
        if frame.len() < self.pad_to {
            frame.resize(self.pad_to, 0);
        }
        frame
    }
}
