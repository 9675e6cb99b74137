use std::sync::Arc;
use std::thread;
use std::time::Duration;

use boundq::{ErrorKind, Mode};

use crate::*;

/// The classic sender/receiver exchange: sender creates `/jobs`, sends one
/// message, receiver prints it and deletes the queue.
#[test]
fn test_jobs_exchange() {
    let t = TestNamespace::new();

    let sender = t
        .ns
        .open(
            "/jobs",
            OpenOptions::new()
                .write(true)
                .create(true)
                .capacity(10)
                .max_message_size(128),
        )
        .unwrap();
    assert_eq!(sender.mode(), Mode::WriteOnly);
    sender.send(b"build:42", 1).unwrap();
    sender.close();

    let receiver = t.attach("/jobs", true, false);
    let m = receiver.receive().unwrap();
    assert_eq!(text(&m.payload), "build:42");
    assert_eq!(m.priority, 1);
    receiver.close();

    t.ns.delete("/jobs").unwrap();
    assert!(!t.ns.exists("/jobs").unwrap());

    let err = t.ns.open("/jobs", OpenOptions::new().read(true)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

/// Opening with different attributes attaches to the existing queue; its
/// original attributes win.
#[test]
fn test_existing_attributes_win() {
    let t = TestNamespace::new();
    let first = t.queue("/attrs", 4, 32);
    let second = t.queue("/attrs", 99, 4096);
    assert_eq!(second.capacity(), 4);
    assert_eq!(second.max_message_size(), 32);
    first.send(b"seen by both", 2).unwrap();
    assert_eq!(second.attributes().unwrap().len, 1);
}

#[test]
fn test_create_new_rejects_existing() {
    let t = TestNamespace::new();
    let _q = t.queue("/once", 2, 8);
    let err = t
        .ns
        .open(
            "/once",
            OpenOptions::new().read(true).create_new(true).capacity(2).max_message_size(8),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[test]
fn test_invalid_configuration() {
    let t = TestNamespace::new();
    for (capacity, max) in [(0, 8), (2, 0)] {
        let err = t
            .ns
            .open(
                "/bad",
                OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .capacity(capacity)
                    .max_message_size(max),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }
    assert!(!t.ns.exists("/bad").unwrap());
}

#[test]
fn test_invalid_names() {
    let t = TestNamespace::new();
    for name in ["", "/", "a/b", "../escape", "sp ace"] {
        let err = t.ns.open(name, OpenOptions::new().read(true)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName, "name {name:?}");
    }
}

/// Close is idempotent and only affects the closed handle.
#[test]
fn test_close_is_local_and_idempotent() {
    let t = TestNamespace::new();
    let a = t.queue("/close", 4, 16);
    let b = t.attach("/close", true, true);

    a.send(b"kept", 1).unwrap();
    a.close();
    a.close();
    assert!(a.is_closed());
    assert_eq!(a.send(b"x", 1).unwrap_err().kind(), ErrorKind::InvalidHandle);
    assert_eq!(a.try_receive().unwrap_err().kind(), ErrorKind::InvalidHandle);

    assert_eq!(text(&b.receive().unwrap().payload), "kept");
}

/// Operations outside a handle's access mode fail with `InvalidHandle`.
#[test]
fn test_wrong_mode() {
    let t = TestNamespace::new();
    let _owner = t.queue("/modes", 2, 16);
    let reader = t.attach("/modes", true, false);
    let writer = t.attach("/modes", false, true);

    assert_eq!(reader.send(b"x", 1).unwrap_err().kind(), ErrorKind::InvalidHandle);
    assert_eq!(writer.try_receive().unwrap_err().kind(), ErrorKind::InvalidHandle);
}

/// Deleting a queue invalidates existing handles and wakes blocked callers.
#[test]
fn test_delete_invalidates_open_handles() {
    let t = TestNamespace::new();
    let q = Arc::new(t.queue("/doomed", 2, 16));

    let waiter = {
        let q = q.clone();
        thread::spawn(move || q.receive())
    };
    thread::sleep(Duration::from_millis(100));

    t.ns.delete("/doomed").unwrap();
    let err = waiter.join().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(q.try_send(b"x", 1).unwrap_err().kind(), ErrorKind::NotFound);

    assert_eq!(t.ns.delete("/doomed").unwrap_err().kind(), ErrorKind::NotFound);
}

/// A fresh queue may reuse a deleted queue's name.
#[test]
fn test_recreate_after_delete() {
    let t = TestNamespace::new();
    let old = t.queue("/again", 2, 16);
    old.send(b"stale", 1).unwrap();
    t.ns.delete("/again").unwrap();

    let new = t.queue("/again", 3, 16);
    assert_eq!(new.capacity(), 3);
    assert_eq!(new.try_receive().unwrap_err().kind(), ErrorKind::WouldBlock);
    assert_eq!(old.try_receive().unwrap_err().kind(), ErrorKind::NotFound);
}

/// Closing a handle wakes its own blocked receivers.
#[test]
fn test_close_wakes_blocked_receiver() {
    let t = TestNamespace::new();
    let q = Arc::new(t.queue("/wake", 2, 16));
    let waiter = {
        let q = q.clone();
        thread::spawn(move || q.receive())
    };
    thread::sleep(Duration::from_millis(100));
    q.close();
    let err = waiter.join().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);
}

#[test]
fn test_list() {
    let t = TestNamespace::new();
    assert!(t.ns.list().unwrap().is_empty());
    let _b = t.queue("/beta", 1, 8);
    let _a = t.queue("alpha", 1, 8);
    let names: Vec<String> = t.ns.list().unwrap().iter().map(|n| n.to_string()).collect();
    assert_eq!(names, vec!["/alpha", "/beta"]);
}

/// A receiver may open with create and no attributes; the sender's
/// queue is joined as-is.
#[test]
fn test_receiver_create_without_attributes() {
    let t = TestNamespace::new();
    let sender = t.queue("/jobs", 10, 128);
    sender.send(b"build:42", 1).unwrap();

    let receiver = t
        .ns
        .open("/jobs", OpenOptions::new().read(true).create(true))
        .unwrap();
    assert_eq!(receiver.capacity(), 10);
    assert_eq!(text(&receiver.receive().unwrap().payload), "build:42");
}
