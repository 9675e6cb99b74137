use std::time::Duration;

use boundq::{AsyncHandle, ErrorKind};
use bytes::Bytes;

use crate::*;

/// Async producers and a blocking consumer share one queue.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_producers() {
    let t = TestNamespace::new();
    let q = AsyncHandle::new(t.queue("/async", 4, 32));

    let mut tasks = Vec::new();
    for p in 0..3u32 {
        let q = q.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..20 {
                q.send(Bytes::from(format!("{p}:{i}")), p).await.unwrap();
            }
        }));
    }

    let reader = t.attach("/async", true, false);
    let received = tokio::task::spawn_blocking(move || {
        (0..60).map(|_| reader.receive().unwrap()).count()
    })
    .await
    .unwrap();
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(received, 60);
}

#[tokio::test]
async fn test_async_timeout() {
    let t = TestNamespace::new();
    let q = AsyncHandle::new(t.queue("/async-empty", 1, 8));
    let err = q
        .receive_timeout(Duration::from_millis(30))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(q.try_receive().unwrap_err().kind(), ErrorKind::WouldBlock);
}
