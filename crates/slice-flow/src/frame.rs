//! Minimal frame parsing
//!
//! The classifier only needs Ethernet addressing plus, for IPv4/UDP
//! frames, the destination port. Anything unparseable is reported as
//! `None` and dropped by the caller without further effect.

use crate::proto::frame_consts::{ETHERTYPE_IPV4, IP_PROTO_UDP};
use crate::proto::MacAddr;

const ETH_HEADER_LEN: usize = 14;
const IPV4_MIN_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;

/// The header fields the classifier cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFrame {
    /// Source MAC
    pub src: MacAddr,
    /// Destination MAC
    pub dst: MacAddr,
    /// Ethertype
    pub eth_type: u16,
    /// UDP destination port, when the frame is IPv4/UDP
    pub udp_dst: Option<u16>,
}

/// Parse the headers of a raw Ethernet frame.
///
/// Returns `None` for frames too short to carry an Ethernet header.
/// A malformed IPv4/UDP payload degrades to `udp_dst: None` rather
/// than rejecting the frame, so L2 learning still happens.
pub fn parse(frame: &[u8]) -> Option<ParsedFrame> {
    if frame.len() < ETH_HEADER_LEN {
        return None;
    }

    let dst = MacAddr(frame[0..6].try_into().ok()?);
    let src = MacAddr(frame[6..12].try_into().ok()?);
    let eth_type = u16::from_be_bytes([frame[12], frame[13]]);

    let udp_dst = if eth_type == ETHERTYPE_IPV4 {
        parse_udp_dst(&frame[ETH_HEADER_LEN..])
    } else {
        None
    };

    Some(ParsedFrame {
        src,
        dst,
        eth_type,
        udp_dst,
    })
}

fn parse_udp_dst(ip: &[u8]) -> Option<u16> {
    if ip.len() < IPV4_MIN_HEADER_LEN {
        return None;
    }
    // version must be 4, header length in 32-bit words
    if ip[0] >> 4 != 4 {
        return None;
    }
    let ihl = usize::from(ip[0] & 0x0f) * 4;
    if ihl < IPV4_MIN_HEADER_LEN || ip.len() < ihl + UDP_HEADER_LEN {
        return None;
    }
    if ip[9] != IP_PROTO_UDP {
        return None;
    }
    Some(u16::from_be_bytes([ip[ihl + 2], ip[ihl + 3]]))
}

/// Build a minimal IPv4/UDP frame, used by tests and emulation harnesses.
pub fn encode_udp_frame(src: MacAddr, dst: MacAddr, udp_dst: u16) -> Vec<u8> {
    let mut frame = Vec::with_capacity(ETH_HEADER_LEN + IPV4_MIN_HEADER_LEN + UDP_HEADER_LEN);
    frame.extend_from_slice(&dst.0);
    frame.extend_from_slice(&src.0);
    frame.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());

    let mut ip = [0u8; IPV4_MIN_HEADER_LEN];
    ip[0] = 0x45; // version 4, IHL 5
    ip[8] = 64; // TTL
    ip[9] = IP_PROTO_UDP;
    frame.extend_from_slice(&ip);

    let mut udp = [0u8; UDP_HEADER_LEN];
    udp[2..4].copy_from_slice(&udp_dst.to_be_bytes());
    udp[5] = UDP_HEADER_LEN as u8;
    frame.extend_from_slice(&udp);

    frame
}

/// Build a bare frame with an arbitrary ethertype and no payload.
pub fn encode_raw_frame(src: MacAddr, dst: MacAddr, eth_type: u16) -> Vec<u8> {
    let mut frame = Vec::with_capacity(ETH_HEADER_LEN);
    frame.extend_from_slice(&dst.0);
    frame.extend_from_slice(&src.0);
    frame.extend_from_slice(&eth_type.to_be_bytes());
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::frame_consts::ETHERTYPE_LLDP;

    const SRC: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x01]);
    const DST: MacAddr = MacAddr([0x02, 0, 0, 0, 0, 0x02]);

    #[test]
    fn test_parse_udp_frame() {
        let raw = encode_udp_frame(SRC, DST, 5001);
        let parsed = parse(&raw).unwrap();
        assert_eq!(parsed.src, SRC);
        assert_eq!(parsed.dst, DST);
        assert_eq!(parsed.eth_type, ETHERTYPE_IPV4);
        assert_eq!(parsed.udp_dst, Some(5001));
    }

    #[test]
    fn test_parse_lldp_frame() {
        let raw = encode_raw_frame(SRC, DST, ETHERTYPE_LLDP);
        let parsed = parse(&raw).unwrap();
        assert_eq!(parsed.eth_type, ETHERTYPE_LLDP);
        assert_eq!(parsed.udp_dst, None);
    }

    #[test]
    fn test_truncated_frame_rejected() {
        assert!(parse(&[0u8; 5]).is_none());
        assert!(parse(&[]).is_none());
    }

    #[test]
    fn test_truncated_ip_degrades_to_l2() {
        let mut raw = encode_udp_frame(SRC, DST, 5001);
        raw.truncate(ETH_HEADER_LEN + 10);
        let parsed = parse(&raw).unwrap();
        assert_eq!(parsed.udp_dst, None);
    }

    #[test]
    fn test_non_udp_ip_has_no_port() {
        let mut raw = encode_udp_frame(SRC, DST, 5001);
        raw[ETH_HEADER_LEN + 9] = 6; // TCP
        let parsed = parse(&raw).unwrap();
        assert_eq!(parsed.udp_dst, None);
    }
}
