use beget_gateway::producer::ObserveProducer;
use beget_kernel::{CanonicalMessage, Producer};
use beget_testing::{SpyProducer, TestGateway, produce_request, topics};
use axum::http::StatusCode;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const PARALLEL: usize = 100;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_requests_each_publish_once() {
    let spy = SpyProducer::new().with_delay(Duration::from_millis(5));
    let app = TestGateway::new(&["foo"], Arc::new(spy.clone())).app();

    let mut handles = Vec::with_capacity(PARALLEL);
    for i in 0..PARALLEL {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let body = format!(r#"{{"topic":"foo","key":"k{i}","value":{{"n":{i}}}}}"#);
            app.oneshot(produce_request(body)).await.unwrap().status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }

    let published: HashSet<Vec<u8>> = spy
        .messages()
        .await
        .iter()
        .map(|m| m.payload().to_vec())
        .collect();
    let expected: HashSet<Vec<u8>> = (0..PARALLEL)
        .map(|i| format!(r#"{{"n":{i}}}"#).into_bytes())
        .collect();

    assert_eq!(spy.call_count(), PARALLEL);
    assert_eq!(published, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_observe_producer_concurrent_publish() {
    let registry = topics(&["orders"]);
    let producer = Arc::new(ObserveProducer::with_journal_capacity(PARALLEL));

    let mut handles = Vec::with_capacity(PARALLEL);
    for i in 0..PARALLEL {
        let producer = Arc::clone(&producer);
        let message = CanonicalMessage::new(&registry, "orders", "", i.to_string()).unwrap();
        handles.push(tokio::spawn(async move { producer.publish(message).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(producer.published_count(), PARALLEL as u64);
    let recorded: HashSet<String> = producer
        .recent()
        .iter()
        .map(|m| String::from_utf8_lossy(m.payload()).into_owned())
        .collect();
    let expected: HashSet<String> = (0..PARALLEL).map(|i| i.to_string()).collect();
    assert_eq!(recorded, expected);
}
