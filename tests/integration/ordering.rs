use crate::*;

/// Highest priority first, FIFO within a priority.
#[test]
fn test_priority_then_fifo() {
    let t = TestNamespace::new();
    let q = t.queue("/jobs", 16, 64);

    let sends = [
        ("a", 1),
        ("b", 5),
        ("c", 3),
        ("d", 5),
        ("e", 1),
        ("f", 0),
        ("g", 3),
    ];
    for (payload, priority) in sends {
        q.send(payload.as_bytes(), priority).unwrap();
    }

    let mut got = Vec::new();
    while let Ok(m) = q.try_receive() {
        got.push((text(&m.payload), m.priority));
    }
    let expected: Vec<(String, u32)> = [("b", 5), ("d", 5), ("c", 3), ("g", 3), ("a", 1), ("e", 1), ("f", 0)]
        .into_iter()
        .map(|(p, pr)| (p.to_string(), pr))
        .collect();
    assert_eq!(got, expected);
}

/// Priorities 1, 5, 3 come back as 5, 3, 1.
#[test]
fn test_three_priorities() {
    let t = TestNamespace::new();
    let q = t.queue("/prio", 8, 16);
    q.send(b"one", 1).unwrap();
    q.send(b"five", 5).unwrap();
    q.send(b"three", 3).unwrap();

    let order: Vec<u32> = (0..3).map(|_| q.receive().unwrap().priority).collect();
    assert_eq!(order, vec![5, 3, 1]);
}

/// Ordering holds across handles, not just within one.
#[test]
fn test_ordering_across_handles() {
    let t = TestNamespace::new();
    let _owner = t.queue("/shared", 8, 32);
    let writer = t.attach("/shared", false, true);
    let reader = t.attach("/shared", true, false);

    writer.send(b"low", 0).unwrap();
    writer.send(b"high", u32::MAX).unwrap();

    let first = reader.receive().unwrap();
    assert_eq!(text(&first.payload), "high");
    assert_eq!(first.priority, u32::MAX);
    assert_eq!(text(&reader.receive().unwrap().payload), "low");
}

/// Payloads come back byte-for-byte, including empty and maximum sizes.
#[test]
fn test_payload_fidelity() {
    let t = TestNamespace::new();
    let q = t.queue("/bytes", 4, 256);

    let full: Vec<u8> = (0..=255u8).collect();
    q.send(&full, 1).unwrap();
    q.send(b"", 1).unwrap();
    q.send(b"\0\xffbinary\n", 1).unwrap();

    assert_eq!(q.receive().unwrap().payload.as_ref(), full.as_slice());
    assert!(q.receive().unwrap().payload.is_empty());
    assert_eq!(q.receive().unwrap().payload.as_ref(), b"\0\xffbinary\n");
}
