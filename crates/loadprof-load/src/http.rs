// HTTP shot client

use crate::generator::{ShotClient, ShotOutcome};
use async_trait::async_trait;
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

const USER_AGENT: &str = concat!("loadprof/", env!("CARGO_PKG_VERSION"));

/// In-process HTTP GET client with a bounded per-request timeout.
///
/// The timeout covers connecting, the response head and draining the body.
/// The body itself is discarded.
#[derive(Clone)]
pub struct HttpShotClient {
    client: Client<HttpConnector, Empty<Bytes>>,
    request_timeout: Duration,
}

impl HttpShotClient {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            client: Client::builder(TokioExecutor::new()).build_http(),
            request_timeout,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Perform one GET and return the response status.
    pub async fn get(&self, target: &str) -> Result<u16, String> {
        self.get_within(target, self.request_timeout).await
    }

    /// Like `get`, bounded by `limit` instead of the configured timeout.
    pub async fn get_within(&self, target: &str, limit: Duration) -> Result<u16, String> {
        let uri: Uri = target.parse().map_err(|e| format!("Invalid URI: {}", e))?;

        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("User-Agent", USER_AGENT)
            .body(Empty::<Bytes>::new())
            .map_err(|e| format!("Failed to build request: {}", e))?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| format!("Connection failed: {}", e))?;
            let status = response.status().as_u16();
            response
                .into_body()
                .collect()
                .await
                .map_err(|e| format!("Failed to read body: {}", e))?;
            Ok::<u16, String>(status)
        };

        match timeout(limit, exchange).await {
            Ok(result) => result,
            Err(_) => Err(format!("Timeout after {:?}", limit)),
        }
    }
}

#[async_trait]
impl ShotClient for HttpShotClient {
    async fn fire(&self, target: &str) -> ShotOutcome {
        match self.get(target).await {
            Ok(status) if (200..300).contains(&status) => ShotOutcome::Hit { status },
            Ok(status) => ShotOutcome::Miss {
                reason: format!("Unexpected status code: {}", status),
            },
            Err(reason) => {
                debug!("GET {} failed: {}", target, reason);
                ShotOutcome::Miss { reason }
            }
        }
    }
}
