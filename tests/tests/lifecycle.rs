use beget_gateway::producer;
use beget_gateway::server::GatewayServer;
use beget_kernel::{Config, ConfigError, ProducerError, RunMode, config};
use beget_kernel::{CanonicalMessage, Producer};
use beget_testing::{SpyProducer, topics};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[test]
fn test_connect_requires_topics() {
    let config = Config::new(Vec::<String>::new());
    assert!(matches!(
        producer::connect(&config),
        Err(ProducerError::Config(ConfigError::NoTopicsConfigured))
    ));
}

#[test]
fn test_connect_deliver_requires_brokers() {
    let config = Config::new(["orders"]).with_mode(RunMode::Deliver);
    assert!(matches!(
        producer::connect(&config),
        Err(ProducerError::Config(ConfigError::NoBrokersConfigured))
    ));
}

#[test]
fn test_connect_deliver_without_kafka_feature() {
    // This crate builds the gateway without the `kafka` feature unless
    // another workspace member turns it on.
    let config = Config::new(["orders"])
        .with_mode(RunMode::Deliver)
        .with_brokers(["localhost:9092"]);
    match producer::connect(&config) {
        Err(ProducerError::DeliverUnavailable) => {}
        Ok(producer) => assert_eq!(producer.mode(), RunMode::Deliver),
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_observe_mode_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "app:\n  mode: debug\nkafka:\n  topics: [orders]\n").unwrap();

    let cfg = config::load_with_env(&path, Some(Default::default())).unwrap();
    let producer = producer::connect(&cfg).unwrap();
    assert_eq!(producer.mode(), RunMode::Observe);

    let registry = topics(&["orders"]);
    let message = CanonicalMessage::new(&registry, "orders", "k", "v").unwrap();
    producer.publish(message.clone()).await.unwrap();
    producer.close().await.unwrap();

    assert!(matches!(
        producer.publish(message).await,
        Err(ProducerError::Closed)
    ));
}

#[tokio::test]
async fn test_spy_rejects_publish_after_close() {
    let spy = SpyProducer::new();
    spy.close().await.unwrap();
    spy.close().await.unwrap();
    assert!(spy.is_closed());

    let registry = topics(&["foo"]);
    let message = CanonicalMessage::new(&registry, "foo", "", "x").unwrap();
    assert!(matches!(spy.publish(message).await, Err(ProducerError::Closed)));
    beget_testing::assert_published!(spy, 0);
}

#[tokio::test]
async fn test_serve_answers_until_shutdown() {
    let spy = SpyProducer::new();
    let server =
        GatewayServer::new(Arc::new(Config::new(["foo"])), Arc::new(spy.clone())).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let serving = tokio::spawn(async move {
        server
            .serve(listener, async {
                let _ = stop_rx.await;
            })
            .await
    });

    let client = reqwest::Client::new();
    let health = client
        .get(format!("http://{addr}/healthz"))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), reqwest::StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), "OK");

    let produced = client
        .post(format!("http://{addr}/produce"))
        .header("content-type", "application/json")
        .body(r#"{"topic":"foo","value_str":"hello"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(produced.status(), reqwest::StatusCode::OK);
    beget_testing::assert_published!(spy, 1);

    drop(client);
    stop_tx.send(()).unwrap();
    serving.await.unwrap().unwrap();
}
