//! Failure paths: callback errors on either side of the channel.

use std::io::{self, Read, Write};
use std::path::Path;
use std::thread;

use pagepipe::{ChannelName, ChannelPaths, ReceiveError, Receiver, SendError, Sender, page_size};

fn channel(dir: &Path, name: &str) -> ChannelPaths {
    ChannelPaths::new(dir, ChannelName::new(name).unwrap())
}

fn read_message(receiver: &mut Receiver) -> Vec<u8> {
    receiver
        .receive_message(|r| {
            let mut buf = Vec::new();
            r.read_to_end(&mut buf)?;
            Ok(buf)
        })
        .unwrap()
        .expect("receiver was not disposed")
}

/// A send callback that fails before filling a chunk surfaces as an empty
/// message on the receiving side, and the original error comes back to the
/// sending caller.
#[test]
fn sender_abort_surfaces_empty_message() {
    let dir = tempfile::tempdir().unwrap();
    let paths = channel(dir.path(), "abortsend");

    let sender_paths = paths.clone();
    let tx = thread::spawn(move || {
        let mut sender = Sender::open(&sender_paths).unwrap();
        sender.send_message(|w| {
            w.write_all(b"message")?;
            Err(io::Error::other("serializer exploded"))
        })
    });

    let mut receiver = Receiver::open(&paths).unwrap();
    assert_eq!(read_message(&mut receiver), b"");

    // The channel stays usable for the next message.
    let sent = tx.join().unwrap();
    match sent {
        Err(SendError::Callback(e)) => assert_eq!(e.to_string(), "serializer exploded"),
        other => panic!("expected callback error, got {other:?}"),
    }
}

/// Chunks already handed over before the failure stay with the receiver; the
/// abort only truncates the tail.
#[test]
fn sender_abort_after_full_chunk_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let paths = channel(dir.path(), "abortmid");
    let window = page_size() - 6;

    let sender_paths = paths.clone();
    let tx = thread::spawn(move || {
        let mut sender = Sender::open(&sender_paths).unwrap();
        sender.send_message(move |w| {
            w.write_all(&vec![0x5Au8; window + 10])?;
            Err(io::Error::other("late failure"))
        })
    });

    let mut receiver = Receiver::open(&paths).unwrap();
    let received = read_message(&mut receiver);
    assert_eq!(received.len(), window);
    assert!(received.iter().all(|&b| b == 0x5A));

    assert!(matches!(tx.join().unwrap(), Err(SendError::Callback(_))));
}

/// After a sender abort, the same channel carries the next message intact.
#[test]
fn channel_survives_sender_abort() {
    let dir = tempfile::tempdir().unwrap();
    let paths = channel(dir.path(), "abortthen");

    let sender_paths = paths.clone();
    let tx = thread::spawn(move || {
        let mut sender = Sender::open(&sender_paths).unwrap();
        let aborted = sender.send_message(|_| Err(io::Error::other("nope")));
        assert!(matches!(aborted, Err(SendError::Callback(_))));

        sender.send_message(|w| w.write_all(b"recovered")).unwrap();
    });

    let mut receiver = Receiver::open(&paths).unwrap();
    assert_eq!(read_message(&mut receiver), b"");
    assert_eq!(read_message(&mut receiver), b"recovered");

    tx.join().unwrap();
}

/// A receive callback that fails propagates to the caller and withholds the
/// message acknowledgement, leaving the channel unusable.
#[test]
fn receiver_abort_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let paths = channel(dir.path(), "abortrecv");

    let sender_paths = paths.clone();
    // The sender never gets its MessageRead and stays blocked; the thread is
    // deliberately left behind.
    let _tx = thread::spawn(move || {
        let mut sender = Sender::open(&sender_paths).unwrap();
        let _ = sender.send_message(|w| w.write_all(b"message"));
    });

    let mut receiver = Receiver::open(&paths).unwrap();
    let result: Result<Option<()>, _> = receiver.receive_message(|r| {
        let mut buf = Vec::new();
        r.read_to_end(&mut buf)?;
        assert_eq!(buf, b"message");
        Err(io::Error::other("consumer rejected payload"))
    });

    match result {
        Err(ReceiveError::Callback(e)) => {
            assert_eq!(e.to_string(), "consumer rejected payload")
        }
        other => panic!("expected callback error, got {other:?}"),
    }
}
