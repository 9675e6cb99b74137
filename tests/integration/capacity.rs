use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use boundq::ErrorKind;

use crate::*;

/// A full queue rejects non-blocking sends and the queue is unchanged.
#[test]
fn test_full_queue_would_block() {
    let t = TestNamespace::new();
    let q = t.queue("/full", 2, 16);
    q.send(b"x", 1).unwrap();
    q.send(b"y", 1).unwrap();

    let err = q.try_send(b"z", 9).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WouldBlock);
    assert_eq!(q.attributes().unwrap().len, 2);
    assert_eq!(text(&q.receive().unwrap().payload), "x");
}

/// The third send on a capacity-2 queue blocks until a receive frees a slot.
#[test]
fn test_blocked_send_resumes_after_receive() {
    let t = TestNamespace::new();
    let q = Arc::new(t.queue("/cap", 2, 16));
    q.send(b"x", 1).unwrap();
    q.send(b"y", 1).unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let sender = {
        let q = q.clone();
        thread::spawn(move || {
            let result = q.send(b"z", 1);
            done_tx.send(()).unwrap();
            result
        })
    };

    assert!(
        done_rx.recv_timeout(Duration::from_millis(200)).is_err(),
        "send should block while the queue is full"
    );

    assert_eq!(text(&q.receive().unwrap().payload), "x");
    done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("send should complete after a receive");
    sender.join().unwrap().unwrap();

    assert_eq!(q.attributes().unwrap().len, 2);
    assert_eq!(text(&q.receive().unwrap().payload), "y");
    assert_eq!(text(&q.receive().unwrap().payload), "z");
}

/// Timed operations give up with `Timeout` and leave the queue alone.
#[test]
fn test_timeouts() {
    let t = TestNamespace::new();
    let q = t.queue("/slow", 1, 16);

    let err = q.receive_timeout(Duration::from_millis(40)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    q.send(b"only", 1).unwrap();
    let err = q
        .send_timeout(b"extra", 1, Duration::from_millis(40))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);

    let attrs = q.attributes().unwrap();
    assert_eq!(attrs.len, 1);
    assert_eq!(attrs.total_sent, 1);
    assert_eq!(attrs.total_received, 0);
}

/// Oversized messages are refused before touching the queue.
#[test]
fn test_message_too_large() {
    let t = TestNamespace::new();
    let q = t.queue("/small", 4, 8);

    q.send(b"12345678", 1).unwrap();
    let err = q.send(b"123456789", 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MessageTooLarge);
    assert_eq!(q.attributes().unwrap().len, 1);
}

/// Slots recycle: many more messages than capacity flow through.
#[test]
fn test_slots_recycle() {
    let t = TestNamespace::new();
    let q = t.queue("/ring", 3, 16);
    for round in 0..50u32 {
        q.send(format!("m{round}").as_bytes(), round % 4).unwrap();
        let m = q.receive().unwrap();
        assert_eq!(text(&m.payload), format!("m{round}"));
    }
    let attrs = q.attributes().unwrap();
    assert_eq!(attrs.len, 0);
    assert_eq!(attrs.total_sent, 50);
    assert_eq!(attrs.total_received, 50);
}
