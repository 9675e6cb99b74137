use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use crate::*;

const PRODUCERS: usize = 4;
const CONSUMERS: usize = 3;
const PER_PRODUCER: usize = 200;

/// Every message is delivered exactly once with threads sharing handles.
#[test]
fn test_shared_handle_exactly_once() {
    let t = TestNamespace::new();
    let q = Arc::new(t.queue("/mpmc", 8, 32));
    let total = PRODUCERS * PER_PRODUCER;

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let q = q.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    q.send(format!("{p}:{i}").as_bytes(), (i % 3) as u32).unwrap();
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|c| {
            let q = q.clone();
            let share = total / CONSUMERS + usize::from(c < total % CONSUMERS);
            thread::spawn(move || {
                (0..share)
                    .map(|_| text(&q.receive().unwrap().payload))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }
    let mut seen = HashSet::new();
    for c in consumers {
        for payload in c.join().unwrap() {
            assert!(seen.insert(payload.clone()), "duplicate delivery of {payload}");
        }
    }
    assert_eq!(seen.len(), total);
    assert_eq!(q.attributes().unwrap().len, 0);
}

/// Same guarantee with every thread holding its own handle, which
/// exercises the cross-handle file lock rather than the in-process mutex.
#[test]
fn test_separate_handles_exactly_once() {
    let t = Arc::new(TestNamespace::new());
    let _owner = t.queue("/handles", 4, 32);
    let total = PRODUCERS * PER_PRODUCER;

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let t = t.clone();
            thread::spawn(move || {
                let q = t.attach("/handles", false, true);
                for i in 0..PER_PRODUCER {
                    q.send(format!("{p}:{i}").as_bytes(), 1).unwrap();
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..CONSUMERS)
        .map(|c| {
            let t = t.clone();
            let share = total / CONSUMERS + usize::from(c < total % CONSUMERS);
            thread::spawn(move || {
                let q = t.attach("/handles", true, false);
                (0..share)
                    .map(|_| text(&q.receive().unwrap().payload))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }
    let mut seen = HashSet::new();
    for c in consumers {
        let got = c.join().unwrap();
        // Per-producer FIFO holds within each consumer's view.
        let mut last: Vec<Option<usize>> = vec![None; PRODUCERS];
        for payload in &got {
            let (p, i) = payload.split_once(':').unwrap();
            let (p, i): (usize, usize) = (p.parse().unwrap(), i.parse().unwrap());
            if let Some(prev) = last[p] {
                assert!(i > prev, "producer {p} reordered: {prev} then {i}");
            }
            last[p] = Some(i);
        }
        for payload in got {
            assert!(seen.insert(payload.clone()), "duplicate delivery of {payload}");
        }
    }
    assert_eq!(seen.len(), total);
}
