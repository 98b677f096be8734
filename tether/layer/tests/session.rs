//! A whole connection, with the host agent on the other side of the queues.

use rstest::{fixture, rstest};
use tether_config::{LayerConfig, TargetVariant};
use tether_layer::{patch::encode_call, CallArgs, HandlerId, InstallOutcome, Layer};
use tether_protocol::{host::HostEndpoint, Address, AddressSpace, FlatMemory, Request};

const RAM_SIZE: usize = 0x0040_0000;
const SEND_SITE: Address = 0x0038_1fb4;
const BUFFER: Address = 0x0020_0000;
const STATUS: Address = 0x0020_1000;

struct Emulator {
    layer: Layer,
    ram: FlatMemory,
}

impl Emulator {
    fn call(&mut self, handler: HandlerId, args: [u32; 4]) -> u32 {
        let pc = self.layer.setup().trampolines().address_of(handler);
        self.layer
            .on_call(&mut self.ram, pc, CallArgs::from(args))
            .expect("trampoline address")
    }
}

#[fixture]
fn emulator() -> Emulator {
    let config = LayerConfig {
        target: TargetVariant::Ps2Rpc,
        debug: false,
        ..LayerConfig::default()
    };

    let mut emulator = Emulator {
        layer: Layer::new(config).unwrap(),
        ram: FlatMemory::new(0, RAM_SIZE),
    };
    let outcome = emulator.layer.install(&mut emulator.ram);
    assert!(matches!(outcome, InstallOutcome::Installed { skipped: 0, .. }));

    emulator
}

#[rstest]
fn connection_round_trip(mut emulator: Emulator) {
    let host = HostEndpoint::attach(*emulator.layer.setup().layout(), &emulator.ram).unwrap();

    // application connects to the rendezvous host
    let socket = emulator.call(HandlerId::TcpOpen, [0x0077, 0x5e0d, 0, 0]);
    let command = host.take_request(&mut emulator.ram).unwrap().unwrap();
    assert_eq!(command.request, Request::Open);
    assert_eq!(command.params[..3], [1, 0x0077, 0x0d5e]);
    assert_eq!(host.take_request(&mut emulator.ram).unwrap(), None);

    // nothing to read yet
    assert_eq!(emulator.call(HandlerId::TcpGetStatus, [socket, STATUS, 0, 0]), u32::MAX);
    assert_eq!(emulator.call(HandlerId::TcpRecv, [socket, BUFFER, 4, 0]), u32::MAX);

    // server greets
    assert_eq!(host.fill_inbound(&mut emulator.ram, b"\x0e\x00hello"), 7);
    assert_eq!(emulator.call(HandlerId::TcpGetStatus, [socket, STATUS, 0, 0]), 0);
    assert_eq!(emulator.ram.read32(STATUS + 4), 7);

    assert_eq!(emulator.call(HandlerId::TcpRecv, [socket, BUFFER, 2, 0]), 2);
    assert_eq!(emulator.call(HandlerId::ReceiveAvailable, [BUFFER + 2, 64, 0, 0]), 5);
    let mut received = [0u8; 7];
    emulator.ram.read_bytes(BUFFER, &mut received);
    assert_eq!(&received, b"\x0e\x00hello");

    // application answers
    emulator.ram.write_bytes(BUFFER, b"login");
    assert_eq!(emulator.call(HandlerId::TcpSend, [socket, BUFFER, 5, 0]), 5);
    assert_eq!(host.drain_outbound(&mut emulator.ram), b"login");

    // and hangs up
    assert_eq!(emulator.call(HandlerId::TcpClose, [socket, 0, 0, 0]), 0);
    let command = host.take_request(&mut emulator.ram).unwrap().unwrap();
    assert_eq!(command.request, Request::Close);
    assert_eq!(command.params[0], socket);
}

#[rstest]
fn close_discards_unread_data(mut emulator: Emulator) {
    let host = HostEndpoint::attach(*emulator.layer.setup().layout(), &emulator.ram).unwrap();
    host.fill_inbound(&mut emulator.ram, b"stale");

    emulator.call(HandlerId::TcpClose, [7, 0, 0, 0]);

    assert_eq!(emulator.call(HandlerId::ReceiveAvailable, [BUFFER, 64, 0, 0]), 0);
}

#[rstest]
fn reinstalling_changes_nothing(mut emulator: Emulator) {
    let before = emulator.ram.clone();

    assert_eq!(
        emulator.layer.install(&mut emulator.ram),
        InstallOutcome::AlreadyInstalled
    );
    assert_eq!(emulator.ram, before);
}

#[rstest]
fn call_sites_reach_their_handlers(emulator: Emulator) {
    let trampolines = emulator.layer.setup().trampolines();
    let send = trampolines.address_of(HandlerId::TcpSend);

    assert_eq!(emulator.ram.read32(SEND_SITE), encode_call(send));
    assert_eq!(trampolines.handler_at(send), Some(HandlerId::TcpSend));
}

#[rstest]
fn unknown_addresses_are_not_handled(mut emulator: Emulator) {
    let ram = &mut emulator.ram;

    assert_eq!(emulator.layer.on_call(ram, SEND_SITE, CallArgs::default()), None);
}
