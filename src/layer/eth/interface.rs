use alloc::collections::{BTreeMap, VecDeque};

use crate::layer::arp::NeighborCache;
use crate::time::Instant;
use crate::wire::{
    ArpOperation, ArpRepr, EtherType, EthernetAddress, EthernetFrame, EthernetRepr, Ipv4Address,
    Ipv4Datagram,
};

/// Datagrams parked per next hop while ARP resolves; beyond this the
/// oldest is dropped.
const MAX_PENDING_PER_HOP: usize = 64;

/// A network interface that connects IP to an Ethernet-like fabric.
///
/// Outbound datagrams whose next hop has a live ARP mapping leave as IPv4
/// frames immediately; the rest queue up behind a broadcast ARP request
/// (rate limited per address) and flush the moment the reply teaches us
/// the mapping. Inbound frames are demultiplexed: IPv4 payloads join the
/// inbound datagram queue, ARP messages update the neighbor cache and are
/// answered when they ask for this interface's address.
///
/// The interface performs no I/O; the host drains
/// [`pop_frame`](Interface::pop_frame) onto the wire and feeds received
/// frames into [`recv_frame`](Interface::recv_frame).
#[derive(Debug)]
pub struct Interface {
    hardware_addr: EthernetAddress,
    protocol_addr: Ipv4Address,
    frames_out: VecDeque<EthernetFrame>,
    datagrams_in: VecDeque<Ipv4Datagram>,
    neighbors: NeighborCache,
    pending: BTreeMap<Ipv4Address, VecDeque<Ipv4Datagram>>,
    clock: Instant,
}

impl Interface {
    /// Construct an interface with the given Ethernet and IP addresses.
    pub fn new(hardware_addr: EthernetAddress, protocol_addr: Ipv4Address) -> Interface {
        Interface {
            hardware_addr,
            protocol_addr,
            frames_out: VecDeque::new(),
            datagrams_in: VecDeque::new(),
            neighbors: NeighborCache::new(),
            pending: BTreeMap::new(),
            clock: Instant::ZERO,
        }
    }

    /// The interface's Ethernet address.
    pub fn hardware_addr(&self) -> EthernetAddress {
        self.hardware_addr
    }

    /// The interface's IP address.
    pub fn protocol_addr(&self) -> Ipv4Address {
        self.protocol_addr
    }

    fn ipv4_frame(&self, dst: EthernetAddress, dgram: &Ipv4Datagram) -> EthernetFrame {
        EthernetFrame {
            header: EthernetRepr {
                src_addr: self.hardware_addr,
                dst_addr: dst,
                ethertype: EtherType::Ipv4,
            },
            payload: dgram.to_bytes(),
        }
    }

    fn arp_frame(
        &self,
        operation: ArpOperation,
        target_hardware_addr: EthernetAddress,
        target_protocol_addr: Ipv4Address,
    ) -> EthernetFrame {
        let message = ArpRepr {
            operation,
            source_hardware_addr: self.hardware_addr,
            source_protocol_addr: self.protocol_addr,
            target_hardware_addr,
            target_protocol_addr,
        };
        EthernetFrame {
            header: EthernetRepr {
                src_addr: self.hardware_addr,
                // An unknown target is asked for by broadcast.
                dst_addr: if target_hardware_addr == EthernetAddress::ZERO {
                    EthernetAddress::BROADCAST
                } else {
                    target_hardware_addr
                },
                ethertype: EtherType::Arp,
            },
            payload: message.to_bytes(),
        }
    }

    /// Send a datagram towards `next_hop`.
    ///
    /// With a live mapping for the hop the frame is queued at once;
    /// otherwise the datagram parks behind an ARP request until the reply
    /// arrives.
    pub fn send_datagram(&mut self, dgram: Ipv4Datagram, next_hop: Ipv4Address) {
        if let Some(mapping) = self.neighbors.lookup(next_hop, self.clock) {
            let frame = self.ipv4_frame(mapping, &dgram);
            self.frames_out.push_back(frame);
            return;
        }

        if self.neighbors.should_request(next_hop, self.clock) {
            let request = self.arp_frame(ArpOperation::Request, EthernetAddress::ZERO, next_hop);
            self.frames_out.push_back(request);
            self.neighbors.note_request(next_hop, self.clock);
        }

        let queue = self.pending.entry(next_hop).or_default();
        if queue.len() == MAX_PENDING_PER_HOP {
            net_debug!("pending queue for {} full, dropping oldest", next_hop);
            queue.pop_front();
        }
        queue.push_back(dgram);
    }

    /// Process a frame received from the fabric.
    ///
    /// Frames addressed to neither this interface nor the broadcast
    /// address are discarded, as are payloads that fail to parse.
    pub fn recv_frame(&mut self, frame: &EthernetFrame) {
        let dst = frame.header.dst_addr;
        if dst != self.hardware_addr && !dst.is_broadcast() {
            return;
        }

        match frame.header.ethertype {
            EtherType::Ipv4 => match Ipv4Datagram::parse(&frame.payload) {
                Ok(dgram) => self.datagrams_in.push_back(dgram),
                Err(err) => net_trace!("dropping bad datagram: {}", err),
            },
            EtherType::Arp => match ArpRepr::parse(&frame.payload) {
                Ok(message) => self.process_arp(&message),
                Err(err) => net_trace!("dropping bad arp message: {}", err),
            },
            EtherType::Unknown(_) => {}
        }
    }

    fn process_arp(&mut self, message: &ArpRepr) {
        // Both requests and replies teach us the sender's mapping.
        self.neighbors.fill(
            message.source_protocol_addr,
            message.source_hardware_addr,
            self.clock,
        );

        if let Some(parked) = self.pending.remove(&message.source_protocol_addr) {
            for dgram in parked {
                let frame = self.ipv4_frame(message.source_hardware_addr, &dgram);
                self.frames_out.push_back(frame);
            }
        }

        if message.operation == ArpOperation::Request
            && message.target_protocol_addr == self.protocol_addr
        {
            let reply = self.arp_frame(
                ArpOperation::Reply,
                message.source_hardware_addr,
                message.source_protocol_addr,
            );
            self.frames_out.push_back(reply);
        }
    }

    /// Advance the interface clock by `ms` milliseconds.
    ///
    /// Expiry of cache entries and request suppression windows is
    /// evaluated lazily against this clock on the next lookup.
    pub fn tick(&mut self, ms: u64) {
        self.clock += crate::time::Duration::from_millis(ms);
    }

    /// Next outbound frame, ready for the wire.
    pub fn pop_frame(&mut self) -> Option<EthernetFrame> {
        self.frames_out.pop_front()
    }

    /// Next inbound datagram extracted from received frames.
    pub fn pop_datagram(&mut self) -> Option<Ipv4Datagram> {
        self.datagrams_in.pop_front()
    }

    /// Number of outbound frames waiting to be drained.
    pub fn frames_queued(&self) -> usize {
        self.frames_out.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{IpProtocol, Ipv4Repr};

    const OUR_MAC: EthernetAddress = EthernetAddress([0x02, 0, 0, 0, 0, 0x01]);
    const OUR_IP: Ipv4Address = Ipv4Address::new(10, 0, 0, 1);
    const PEER_MAC: EthernetAddress = EthernetAddress([0x02, 0, 0, 0, 0, 0x02]);
    const PEER_IP: Ipv4Address = Ipv4Address::new(10, 0, 0, 2);

    fn interface() -> Interface {
        Interface::new(OUR_MAC, OUR_IP)
    }

    fn datagram(dst: Ipv4Address) -> Ipv4Datagram {
        Ipv4Datagram {
            header: Ipv4Repr {
                src_addr: OUR_IP,
                dst_addr: dst,
                protocol: IpProtocol::Tcp,
                ttl: 64,
                payload_len: 3,
            },
            payload: alloc::vec![1, 2, 3],
        }
    }

    fn arp_from_peer(operation: ArpOperation, target_ip: Ipv4Address) -> EthernetFrame {
        EthernetFrame {
            header: EthernetRepr {
                src_addr: PEER_MAC,
                dst_addr: EthernetAddress::BROADCAST,
                ethertype: EtherType::Arp,
            },
            payload: ArpRepr {
                operation,
                source_hardware_addr: PEER_MAC,
                source_protocol_addr: PEER_IP,
                target_hardware_addr: EthernetAddress::ZERO,
                target_protocol_addr: target_ip,
            }
            .to_bytes(),
        }
    }

    fn parse_arp(frame: &EthernetFrame) -> ArpRepr {
        assert_eq!(frame.header.ethertype, EtherType::Arp);
        ArpRepr::parse(&frame.payload).unwrap()
    }

    #[test]
    fn unknown_hop_requests_then_flushes() {
        let mut iface = interface();
        iface.send_datagram(datagram(PEER_IP), PEER_IP);

        // An ARP request went out by broadcast; the datagram is parked.
        let request = iface.pop_frame().expect("arp request");
        assert_eq!(request.header.dst_addr, EthernetAddress::BROADCAST);
        let repr = parse_arp(&request);
        assert_eq!(repr.operation, ArpOperation::Request);
        assert_eq!(repr.target_protocol_addr, PEER_IP);
        assert_eq!(repr.target_hardware_addr, EthernetAddress::ZERO);
        assert_eq!(iface.pop_frame(), None);

        // The reply releases the parked datagram to the learned address.
        iface.recv_frame(&arp_from_peer(ArpOperation::Reply, OUR_IP));
        let frame = iface.pop_frame().expect("flushed datagram");
        assert_eq!(frame.header.ethertype, EtherType::Ipv4);
        assert_eq!(frame.header.dst_addr, PEER_MAC);
        assert_eq!(Ipv4Datagram::parse(&frame.payload).unwrap(), datagram(PEER_IP));
    }

    #[test]
    fn requests_are_rate_limited() {
        let mut iface = interface();
        iface.send_datagram(datagram(PEER_IP), PEER_IP);
        assert_eq!(iface.pop_frame().map(|f| f.header.ethertype), Some(EtherType::Arp));

        // More traffic within the silent window sends no second request.
        iface.tick(4_999);
        iface.send_datagram(datagram(PEER_IP), PEER_IP);
        assert_eq!(iface.pop_frame(), None);

        // Once the window passes the request repeats.
        iface.tick(1);
        iface.send_datagram(datagram(PEER_IP), PEER_IP);
        assert_eq!(iface.pop_frame().map(|f| f.header.ethertype), Some(EtherType::Arp));
    }

    #[test]
    fn cached_hop_sends_immediately() {
        let mut iface = interface();
        iface.recv_frame(&arp_from_peer(ArpOperation::Reply, OUR_IP));
        iface.send_datagram(datagram(PEER_IP), PEER_IP);
        let frame = iface.pop_frame().expect("direct send");
        assert_eq!(frame.header.ethertype, EtherType::Ipv4);
        assert_eq!(frame.header.dst_addr, PEER_MAC);
    }

    #[test]
    fn cache_expires_after_thirty_seconds() {
        let mut iface = interface();
        iface.recv_frame(&arp_from_peer(ArpOperation::Reply, OUR_IP));
        iface.tick(30_000);
        iface.send_datagram(datagram(PEER_IP), PEER_IP);
        // Not a direct send: the mapping aged out, so ARP goes out again.
        let frame = iface.pop_frame().expect("renewed request");
        assert_eq!(frame.header.ethertype, EtherType::Arp);
    }

    #[test]
    fn replies_to_requests_for_our_address() {
        let mut iface = interface();
        iface.recv_frame(&arp_from_peer(ArpOperation::Request, OUR_IP));
        let frame = iface.pop_frame().expect("arp reply");
        assert_eq!(frame.header.dst_addr, PEER_MAC);
        let repr = parse_arp(&frame);
        assert_eq!(repr.operation, ArpOperation::Reply);
        assert_eq!(repr.source_hardware_addr, OUR_MAC);
        assert_eq!(repr.source_protocol_addr, OUR_IP);
        assert_eq!(repr.target_hardware_addr, PEER_MAC);
        assert_eq!(repr.target_protocol_addr, PEER_IP);
    }

    #[test]
    fn ignores_requests_for_other_addresses() {
        let mut iface = interface();
        iface.recv_frame(&arp_from_peer(ArpOperation::Request, Ipv4Address::new(10, 0, 0, 9)));
        // The sender mapping was still learned, but no reply goes out.
        assert_eq!(iface.pop_frame(), None);
        iface.send_datagram(datagram(PEER_IP), PEER_IP);
        assert_eq!(iface.pop_frame().map(|f| f.header.ethertype), Some(EtherType::Ipv4));
    }

    #[test]
    fn frames_for_others_discarded() {
        let mut iface = interface();
        let mut frame = arp_from_peer(ArpOperation::Reply, OUR_IP);
        frame.header.dst_addr = EthernetAddress([0x02, 0, 0, 0, 0, 0x77]);
        iface.recv_frame(&frame);
        // Nothing was learned from the misdelivered frame.
        iface.send_datagram(datagram(PEER_IP), PEER_IP);
        assert_eq!(iface.pop_frame().map(|f| f.header.ethertype), Some(EtherType::Arp));
    }

    #[test]
    fn inbound_ipv4_queued() {
        let mut iface = interface();
        let dgram = datagram(OUR_IP);
        let frame = EthernetFrame {
            header: EthernetRepr {
                src_addr: PEER_MAC,
                dst_addr: OUR_MAC,
                ethertype: EtherType::Ipv4,
            },
            payload: dgram.to_bytes(),
        };
        iface.recv_frame(&frame);
        assert_eq!(iface.pop_datagram(), Some(dgram));
        assert_eq!(iface.pop_datagram(), None);
    }

    #[test]
    fn corrupt_payload_dropped() {
        let mut iface = interface();
        let frame = EthernetFrame {
            header: EthernetRepr {
                src_addr: PEER_MAC,
                dst_addr: OUR_MAC,
                ethertype: EtherType::Ipv4,
            },
            payload: alloc::vec![0xff; 10],
        };
        iface.recv_frame(&frame);
        assert_eq!(iface.pop_datagram(), None);
    }
}
