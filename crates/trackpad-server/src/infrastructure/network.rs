//! Finding the address a phone should type into its browser.
//!
//! The server usually binds `0.0.0.0`, which is not an address anyone can
//! browse to.  To print a useful URL we need the host's LAN address.
//!
//! # The UDP "connect" trick (for beginners)
//!
//! Calling `connect` on a UDP socket sends nothing.  It only asks the OS
//! routing table which local interface would be used to reach the target.
//! Reading `local_addr()` afterwards gives that interface's address.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use tracing::debug;

/// Any routable address works; no packet is sent to it.
const ROUTE_PROBE: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 80);

/// The host's primary LAN address, if the OS can route anywhere.
pub fn local_ip() -> Option<IpAddr> {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(ROUTE_PROBE)?;
        Ok(socket.local_addr()?.ip())
    };
    match probe() {
        Ok(ip) if !ip.is_unspecified() => Some(ip),
        Ok(_) => None,
        Err(e) => {
            debug!("local IP lookup failed: {e}");
            None
        }
    }
}

/// The URL to open on the phone for a server bound at `bound`.
///
/// An unspecified bind address is replaced by `lan_ip`, or loopback when
/// there is none.
pub fn phone_url(bound: SocketAddr, lan_ip: Option<IpAddr>) -> String {
    let ip = if bound.ip().is_unspecified() {
        lan_ip.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
    } else {
        bound.ip()
    };
    format!("http://{}", SocketAddr::new(ip, bound.port()))
}
