//! Knock client.
//!
//! A bare-connect knock is a TCP connection attempt to the sentinel port;
//! the SYN alone is what the gate records. A magic knock is a single UDP
//! datagram whose payload is the 4-byte magic value in network byte order.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream, UdpSocket};
use std::time::Duration;

use knockgate_core::MAGIC_LEN;
use thiserror::Error;

use crate::cli::KnockCli;

use super::CommandResult;

/// Errors from sending a knock.
#[derive(Debug, Error)]
pub enum KnockError {
    #[error("failed to create socket: {0}")]
    Socket(#[source] io::Error),

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },

    #[error("failed to send to {addr}: {source}")]
    Send {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },

    #[error("short send to {addr}: {sent} of {} bytes", MAGIC_LEN)]
    ShortSend { addr: SocketAddrV4, sent: usize },
}

/// How a knock was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnockSent {
    /// TCP connection to the sentinel port was established.
    Connected(SocketAddrV4),
    /// Magic datagram left this host.
    Datagram(SocketAddrV4),
}

/// Send one knock to `target:port`.
///
/// With `magic` set, sends the magic datagram over UDP; otherwise opens and
/// immediately drops a TCP connection.
pub fn send_knock(
    target: Ipv4Addr,
    port: u16,
    magic: Option<u32>,
    timeout: Duration,
) -> Result<KnockSent, KnockError> {
    let addr = SocketAddrV4::new(target, port);
    match magic {
        None => {
            TcpStream::connect_timeout(&SocketAddr::V4(addr), timeout)
                .map_err(|source| KnockError::Connect { addr, source })?;
            Ok(KnockSent::Connected(addr))
        }
        Some(magic) => {
            let socket = UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
                .map_err(KnockError::Socket)?;
            let payload: [u8; MAGIC_LEN] = magic.to_be_bytes();
            let sent = socket
                .send_to(&payload, addr)
                .map_err(|source| KnockError::Send { addr, source })?;
            if sent != MAGIC_LEN {
                return Err(KnockError::ShortSend { addr, sent });
            }
            Ok(KnockSent::Datagram(addr))
        }
    }
}

/// Execute the knock binary.
pub fn execute_knock(cli: &KnockCli) -> CommandResult<KnockSent> {
    cli.validate()?;
    Ok(send_knock(cli.target, cli.port, cli.magic, cli.timeout())?)
}
