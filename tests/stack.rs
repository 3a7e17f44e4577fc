//! End-to-end tests driving the stack the way a host program would:
//! segments serialized onto a byte wire, parsed back on the far side, and
//! time delivered in explicit ticks.

use weft::layer::eth::Interface;
use weft::layer::ip::Router;
use weft::layer::tcp::{Config, Connection};
use weft::wire::{
    EtherType, EthernetAddress, EthernetFrame, EthernetRepr, IpProtocol, Ipv4Address,
    Ipv4Datagram, Ipv4Repr, SeqNumber, TcpSegment,
};

const CLIENT_IP: Ipv4Address = Ipv4Address::new(10, 0, 0, 1);
const SERVER_IP: Ipv4Address = Ipv4Address::new(10, 0, 0, 2);

fn config(isn: u32) -> Config {
    Config {
        fixed_isn: Some(SeqNumber(isn)),
        ..Config::default()
    }
}

/// Serialize, "transmit" and re-parse every queued segment of `from`,
/// delivering the survivors to `to`. Returns how many were delivered.
fn transfer(
    from: &mut Connection,
    to: &mut Connection,
    src: Ipv4Address,
    dst: Ipv4Address,
    drop_first: bool,
) -> usize {
    let mut delivered = 0;
    let mut first = true;
    while let Some(segment) = from.pop_segment() {
        if first && drop_first {
            first = false;
            continue;
        }
        first = false;
        let bytes = segment.to_bytes(src, dst);
        assert!(TcpSegment::verify_checksum(&bytes, src, dst));
        let parsed = TcpSegment::parse(&bytes).expect("valid segment");
        assert_eq!(parsed, segment);
        to.segment_received(&parsed);
        delivered += 1;
    }
    delivered
}

/// Ferry segments both ways until neither side has anything queued.
fn converse(client: &mut Connection, server: &mut Connection) {
    loop {
        let c = transfer(client, server, CLIENT_IP, SERVER_IP, false);
        let s = transfer(server, client, SERVER_IP, CLIENT_IP, false);
        if c == 0 && s == 0 {
            break;
        }
    }
}

#[test]
fn handshake_data_and_clean_close() {
    let mut client = Connection::new(config(0x1000));
    let mut server = Connection::new(config(0x2000));

    client.connect();
    converse(&mut client, &mut server);
    assert!(client.active());
    assert!(server.active());

    // Client talks, server answers.
    assert_eq!(client.write(b"GET /\r\n"), 7);
    converse(&mut client, &mut server);
    assert_eq!(server.read(7), b"GET /\r\n");

    assert_eq!(server.write(b"200 ok"), 6);
    converse(&mut client, &mut server);
    assert_eq!(client.read(6), b"200 ok");

    // Client closes first and must linger; the server gets away clean.
    client.end_input_stream();
    converse(&mut client, &mut server);
    server.end_input_stream();
    converse(&mut client, &mut server);

    assert!(client.inbound_finished());
    assert!(server.inbound_finished());
    assert!(!server.active());
    assert!(client.active(), "first closer lingers");

    client.tick(10 * 1000);
    assert!(!client.active());
}

#[test]
fn lost_segment_is_retransmitted() {
    let mut client = Connection::new(config(7));
    let mut server = Connection::new(config(9));

    client.connect();
    converse(&mut client, &mut server);

    client.write(b"important");
    // The wire eats the segment.
    assert_eq!(transfer(&mut client, &mut server, CLIENT_IP, SERVER_IP, true), 0);
    assert_eq!(server.bytes_available(), 0);
    assert_eq!(client.bytes_in_flight(), 9);

    // Nothing happens before the timeout, the retransmission after it.
    client.tick(999);
    assert_eq!(client.pop_segment(), None);
    client.tick(1);
    converse(&mut client, &mut server);
    assert_eq!(server.read(9), b"important");
    assert_eq!(client.bytes_in_flight(), 0);
}

#[test]
fn interleaved_writes_in_both_directions() {
    let mut client = Connection::new(config(1));
    let mut server = Connection::new(config(2));
    client.connect();
    converse(&mut client, &mut server);

    for round in 0..10u8 {
        let chunk = [round; 100];
        assert_eq!(client.write(&chunk), 100);
        assert_eq!(server.write(&chunk), 100);
        converse(&mut client, &mut server);
        assert_eq!(server.read(100), chunk);
        assert_eq!(client.read(100), chunk);
    }
    assert_eq!(client.bytes_in_flight(), 0);
    assert_eq!(server.bytes_in_flight(), 0);
}

/// The full transmit path of one datagram: segment into datagram, datagram
/// through an interface pair with ARP resolution, back up to a datagram.
#[test]
fn segment_rides_datagram_through_interfaces() {
    let mut client = Connection::new(config(0xaa));
    client.connect();
    let segment = client.pop_segment().expect("SYN");

    let mut left = Interface::new(EthernetAddress([2, 0, 0, 0, 0, 1]), CLIENT_IP);
    let mut right = Interface::new(EthernetAddress([2, 0, 0, 0, 0, 2]), SERVER_IP);

    let dgram = Ipv4Datagram {
        header: Ipv4Repr {
            src_addr: CLIENT_IP,
            dst_addr: SERVER_IP,
            protocol: IpProtocol::Tcp,
            ttl: 64,
            payload_len: segment.buffer_len(),
        },
        payload: segment.to_bytes(CLIENT_IP, SERVER_IP),
    };

    // First attempt parks behind ARP.
    left.send_datagram(dgram.clone(), SERVER_IP);
    let request = left.pop_frame().expect("arp request");
    assert_eq!(request.header.ethertype, EtherType::Arp);
    assert_eq!(left.pop_frame(), None);

    // The peer answers the broadcast and the datagram follows.
    right.recv_frame(&reserialize(&request));
    let reply = right.pop_frame().expect("arp reply");
    left.recv_frame(&reserialize(&reply));
    let data_frame = left.pop_frame().expect("released datagram");
    assert_eq!(data_frame.header.ethertype, EtherType::Ipv4);
    assert_eq!(data_frame.header.dst_addr, right.hardware_addr());

    // The far side hands the datagram back up, payload intact.
    right.recv_frame(&reserialize(&data_frame));
    let received = right.pop_datagram().expect("datagram up");
    assert_eq!(received, dgram);
    let parsed = TcpSegment::parse(&received.payload).expect("segment");
    assert_eq!(parsed, segment);
}

/// A two-port router forwarding between the client's and server's subnets.
#[test]
fn router_carries_tcp_between_subnets() {
    let far_client = Ipv4Address::new(10, 1, 0, 99);
    let far_server = Ipv4Address::new(10, 2, 0, 99);

    let mut router = Router::new();
    let if_client = router.add_interface(Interface::new(
        EthernetAddress([2, 0, 0, 0, 1, 0]),
        Ipv4Address::new(10, 1, 0, 1),
    ));
    let if_server = router.add_interface(Interface::new(
        EthernetAddress([2, 0, 0, 0, 2, 0]),
        Ipv4Address::new(10, 2, 0, 1),
    ));
    router.add_route(
        weft::wire::Ipv4Subnet::new(Ipv4Address::new(10, 1, 0, 0), 16),
        None,
        if_client,
    );
    router.add_route(
        weft::wire::Ipv4Subnet::new(Ipv4Address::new(10, 2, 0, 0), 16),
        None,
        if_server,
    );

    let mut client = Connection::new(config(0xc1));
    client.connect();
    let segment = client.pop_segment().expect("SYN");
    let dgram = Ipv4Datagram {
        header: Ipv4Repr {
            src_addr: far_client,
            dst_addr: far_server,
            protocol: IpProtocol::Tcp,
            ttl: 64,
            payload_len: segment.buffer_len(),
        },
        payload: segment.to_bytes(far_client, far_server),
    };

    // The datagram arrives on the client-side port addressed to its MAC.
    let client_port_mac = router.interface_mut(if_client).hardware_addr();
    router.interface_mut(if_client).recv_frame(&EthernetFrame {
        header: EthernetRepr {
            src_addr: EthernetAddress([2, 0, 0, 0, 1, 0x99]),
            dst_addr: client_port_mac,
            ethertype: EtherType::Ipv4,
        },
        payload: dgram.to_bytes(),
    });
    router.route();

    // Directly attached network: the hop is the destination itself.
    let request = router.interface_mut(if_server).pop_frame().expect("arp out");
    let repr = weft::wire::ArpRepr::parse(&request.payload).unwrap();
    assert_eq!(repr.target_protocol_addr, far_server);

    // Resolve and watch the TTL-decremented datagram leave.
    let server_mac = EthernetAddress([2, 0, 0, 0, 2, 0x99]);
    let port_mac = router.interface_mut(if_server).hardware_addr();
    let port_ip = router.interface_mut(if_server).protocol_addr();
    router.interface_mut(if_server).recv_frame(&EthernetFrame {
        header: EthernetRepr {
            src_addr: server_mac,
            dst_addr: port_mac,
            ethertype: EtherType::Arp,
        },
        payload: weft::wire::ArpRepr {
            operation: weft::wire::ArpOperation::Reply,
            source_hardware_addr: server_mac,
            source_protocol_addr: far_server,
            target_hardware_addr: port_mac,
            target_protocol_addr: port_ip,
        }
        .to_bytes(),
    });
    let forwarded_frame = router.interface_mut(if_server).pop_frame().expect("forwarded");
    let forwarded = Ipv4Datagram::parse(&forwarded_frame.payload).unwrap();
    assert_eq!(forwarded.header.ttl, 63);
    assert_eq!(
        TcpSegment::parse(&forwarded.payload).expect("segment survives"),
        segment
    );
}

/// Round-trip a frame through its wire form, as a real fabric would.
fn reserialize(frame: &EthernetFrame) -> EthernetFrame {
    EthernetFrame::parse(&frame.to_bytes()).expect("valid frame")
}
