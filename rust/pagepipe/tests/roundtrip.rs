//! End-to-end message transfer between a sender thread and a receiver.

use std::io::{self, Read, Write};
use std::path::Path;
use std::thread;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use pagepipe::{ChannelName, ChannelPaths, Receiver, Sender, page_size};

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

#[test]
fn two_messages_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let paths = channel(dir.path(), "Local\\test");

    let sender_paths = paths.clone();
    let tx = thread::spawn(move || {
        let mut sender = Sender::open(&sender_paths).unwrap();
        sender.send_message(|w| w.write_all(b"message1")).unwrap();
        sender.send_message(|w| w.write_all(b"message2")).unwrap();
    });

    let mut receiver = Receiver::open(&paths).unwrap();
    assert_eq!(read_message(&mut receiver), b"message1");
    assert_eq!(read_message(&mut receiver), b"message2");

    tx.join().unwrap();
}

#[test]
fn empty_message() {
    let dir = tempfile::tempdir().unwrap();
    let paths = channel(dir.path(), "empty");

    let sender_paths = paths.clone();
    let tx = thread::spawn(move || {
        let mut sender = Sender::open(&sender_paths).unwrap();
        sender.send_message(|_| Ok(())).unwrap();
    });

    let mut receiver = Receiver::open(&paths).unwrap();
    assert_eq!(read_message(&mut receiver), b"");

    tx.join().unwrap();
}

/// 2.5 pages of random bytes: two full chunks plus a partial final chunk.
#[test]
fn large_message_spans_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let paths = channel(dir.path(), "large");

    let mut payload = vec![0u8; page_size() * 5 / 2];
    rand::rng().fill_bytes(&mut payload);

    let sender_paths = paths.clone();
    let expected = payload.clone();
    let tx = thread::spawn(move || {
        let mut sender = Sender::open(&sender_paths).unwrap();
        sender.send_message(|w| w.write_all(&payload)).unwrap();
    });

    let mut receiver = Receiver::open(&paths).unwrap();
    let received = read_message(&mut receiver);

    assert_eq!(received.len(), expected.len());
    assert_eq!(received, expected);

    tx.join().unwrap();
}

/// Payloads of exactly 1 and 2 window sizes end with an empty final chunk.
#[test]
fn window_multiple_payloads() {
    let dir = tempfile::tempdir().unwrap();
    let paths = channel(dir.path(), "exact");
    let window = page_size() - 6;

    let sender_paths = paths.clone();
    let tx = thread::spawn(move || {
        let mut sender = Sender::open(&sender_paths).unwrap();
        for chunks in [1usize, 2] {
            sender
                .send_message(|w| w.write_all(&vec![0xA5u8; chunks * window]))
                .unwrap();
        }
    });

    let mut receiver = Receiver::open(&paths).unwrap();
    for chunks in [1usize, 2] {
        let received = read_message(&mut receiver);
        assert_eq!(received.len(), chunks * window);
        assert!(received.iter().all(|&b| b == 0xA5));
    }

    tx.join().unwrap();
}

/// The receiver's bytes are independent of the sender's write granularity.
#[test]
fn chunking_independent_of_write_granularity() {
    let dir = tempfile::tempdir().unwrap();
    let paths = channel(dir.path(), "granularity");

    let mut payload = vec![0u8; page_size() + 37];
    rand::rng().fill_bytes(&mut payload);

    let sender_paths = paths.clone();
    let expected = payload.clone();
    let tx = thread::spawn(move || {
        let mut sender = Sender::open(&sender_paths).unwrap();

        // One big write.
        sender.send_message(|w| w.write_all(&payload)).unwrap();

        // The same payload in ragged slices.
        sender
            .send_message(|w| {
                for piece in payload.chunks(13) {
                    w.write_all(piece)?;
                }
                Ok(())
            })
            .unwrap();
    });

    let mut receiver = Receiver::open(&paths).unwrap();
    assert_eq!(read_message(&mut receiver), expected);
    assert_eq!(read_message(&mut receiver), expected);

    tx.join().unwrap();
}

/// Small reads within one chunk advance the cursor without skew.
#[test]
fn small_reads_drain_one_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let paths = channel(dir.path(), "smallreads");

    let sender_paths = paths.clone();
    let tx = thread::spawn(move || {
        let mut sender = Sender::open(&sender_paths).unwrap();
        sender
            .send_message(|w| w.write_all(b"abcdefghijklmnopqrstuvwxyz"))
            .unwrap();
    });

    let mut receiver = Receiver::open(&paths).unwrap();
    let out = receiver
        .receive_message(|r| {
            let mut out = Vec::new();
            let mut buf = [0u8; 5];
            loop {
                let k = r.read(&mut buf)?;
                if k == 0 {
                    break;
                }
                out.extend_from_slice(&buf[..k]);
            }
            Ok(out)
        })
        .unwrap()
        .unwrap();
    assert_eq!(out, b"abcdefghijklmnopqrstuvwxyz");

    tx.join().unwrap();
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Record {
    bar: String,
}

/// A byte-oriented serializer works directly against the streams.
#[test]
fn structured_payload() {
    let dir = tempfile::tempdir().unwrap();
    let paths = channel(dir.path(), "structured");

    let sender_paths = paths.clone();
    let tx = thread::spawn(move || {
        let mut sender = Sender::open(&sender_paths).unwrap();
        sender
            .send_message(|w| {
                serde_json::to_writer(
                    w,
                    &Record {
                        bar: "FooBar".to_string(),
                    },
                )
                .map_err(io::Error::from)
            })
            .unwrap();
    });

    let mut receiver = Receiver::open(&paths).unwrap();
    let record: Record = receiver
        .receive_message(|r| serde_json::from_reader(r).map_err(io::Error::from))
        .unwrap()
        .unwrap();
    assert_eq!(record.bar, "FooBar");

    tx.join().unwrap();
}
