use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use beget_gateway::server::GatewayServer;
use beget_kernel::{Config, Producer};
use std::sync::Arc;

/// A gateway router wired to an arbitrary producer.
pub struct TestGateway {
    pub server: GatewayServer,
}

impl TestGateway {
    /// Observe-mode gateway allowing `topics`.
    pub fn new(topics: &[&str], producer: Arc<dyn Producer>) -> Self {
        Self::with_config(Config::new(topics.iter().copied()), producer)
    }

    pub fn with_config(config: Config, producer: Arc<dyn Producer>) -> Self {
        let server =
            GatewayServer::new(Arc::new(config), producer).expect("valid test configuration");
        Self { server }
    }

    pub fn app(&self) -> Router {
        self.server.build_app()
    }
}

/// `POST /produce` with `Content-Type: application/json`.
pub fn produce_request(body: impl Into<Body>) -> Request<Body> {
    Request::post("/produce")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .expect("valid request")
}

/// Collect a response body as UTF-8 text.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8_lossy(&bytes).into_owned()
}
