//! Cross-peer delivery over a loopback network.

use std::cell::RefCell;
use std::net::{IpAddr, Ipv4Addr};
use std::rc::Rc;

use postbox_transport::{
    ArgReader, ArgWriter, LoopbackNetwork, MailboxTransport, MessagingError, NetworkAddress,
    RawMailbox, Receipt, TransportConfig,
};

fn address(port: u16) -> NetworkAddress {
    NetworkAddress::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

/// Mailbox decoding `(u64, String)` and recording it.
fn greeting_mailbox(transport: &Rc<MailboxTransport>) -> (RawMailbox, Rc<RefCell<Vec<(u64, String)>>>) {
    let received = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&received);
    let mailbox = RawMailbox::new(transport, move |payload: &[u8], receipt: Receipt| {
        let decode = || -> Result<(u64, String), postbox_transport::CodecError> {
            let mut input = ArgReader::new(payload);
            let id = input.read::<u64>()?;
            let name = input.read::<String>()?;
            input.finish()?;
            Ok((id, name))
        };
        let message = decode().map_err(|e| MessagingError::DeserializationFailed {
            message: e.to_string(),
        })?;
        receipt.done();
        sink.borrow_mut().push(message);
        Ok(())
    });
    (mailbox, received)
}

fn send_greeting(
    from: &MailboxTransport,
    mailbox: &RawMailbox,
    id: u64,
    name: &str,
) -> Result<(), MessagingError> {
    from.send(&mailbox.address(), |out| {
        let mut out = ArgWriter::new(out);
        out.write(&id)?;
        out.write(&name)?;
        Ok(())
    })
}

#[test]
fn test_send_to_remote_peer() {
    let network = LoopbackNetwork::new();
    let alice = MailboxTransport::new(address(4500), &network, TransportConfig::default());
    let bob = MailboxTransport::new(address(4501), &network, TransportConfig::default());
    let (mailbox, received) = greeting_mailbox(&bob);

    send_greeting(&alice, &mailbox, 7, "hello bob").expect("send should succeed");

    // Queued on bob's side, not alice's.
    assert_eq!(alice.pending(), 0);
    assert_eq!(bob.pending(), 1);
    assert_eq!(alice.packets_sent(), 1);

    assert_eq!(bob.pump(), 1);
    assert_eq!(*received.borrow(), vec![(7, "hello bob".to_string())]);
    assert_eq!(bob.receipts_acknowledged(), 1);
}

#[test]
fn test_dropped_peer_unreachable() {
    let network = LoopbackNetwork::new();
    let alice = MailboxTransport::new(address(4500), &network, TransportConfig::default());
    let bob = MailboxTransport::new(address(4501), &network, TransportConfig::default());
    let (mailbox, _) = greeting_mailbox(&bob);
    let bob_address = mailbox.address();

    drop(mailbox);
    drop(bob);

    let result = alice.send(&bob_address, |_out| Ok(()));
    assert!(matches!(
        result,
        Err(MessagingError::PeerUnreachable { .. })
    ));
    assert_eq!(network.peer_count(), 1);
}

#[test]
fn test_malformed_payload_not_acknowledged() {
    let network = LoopbackNetwork::new();
    let alice = MailboxTransport::new(address(4500), &network, TransportConfig::default());
    let bob = MailboxTransport::new(address(4501), &network, TransportConfig::default());
    let (mailbox, received) = greeting_mailbox(&bob);

    // Only one of the two expected arguments.
    alice
        .send(&mailbox.address(), |out| ArgWriter::new(out).write(&1u64))
        .expect("send should succeed");

    assert_eq!(bob.pump(), 0);
    assert!(received.borrow().is_empty());
    assert_eq!(bob.receive_failures(), 1);
    assert_eq!(bob.receipts_acknowledged(), 0);
}

#[test]
fn test_run_delivers_until_closed() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime should build");
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, async {
        let network = LoopbackNetwork::new();
        let alice = MailboxTransport::new(address(4500), &network, TransportConfig::default());
        let bob = MailboxTransport::new(address(4501), &network, TransportConfig::default());
        let (mailbox, received) = greeting_mailbox(&bob);

        let runner = {
            let bob = Rc::clone(&bob);
            tokio::task::spawn_local(async move { bob.run().await })
        };

        for id in 0..3 {
            send_greeting(&alice, &mailbox, id, "tick").expect("send should succeed");
            tokio::task::yield_now().await;
        }
        send_greeting(&alice, &mailbox, 3, "last").expect("send should succeed");
        bob.close();

        runner.await.expect("run loop should exit cleanly");

        let ids: Vec<u64> = received.borrow().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(bob.pending(), 0);
    });
}
