use std::time::{Duration, Instant};

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client, StatusCode, Url,
};
use serde::Deserialize;
use typed_builder::TypedBuilder;

pub const DEFAULT_URL: &str = "http://localhost:2080/freeswitch_json";

/// What a single POST looked like from the sender's side.
#[derive(Debug, Clone, PartialEq)]
pub struct PostMetric {
    pub latency: Duration,
    pub status_code: u16,
    pub bytes_sent: u64,
}

/// How HTTP status codes on the response are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StatusPolicy {
    /// Any response counts as delivered; only the emission rate matters.
    #[default]
    Ignore,
    /// Non-2xx responses are failures.
    RequireSuccess,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}")]
    Status { url: Url, status: StatusCode },
}

pub fn cdr_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));
    headers
}

#[derive(TypedBuilder)]
pub struct Transport {
    #[builder(default = Client::new())]
    client: Client,

    url: Url,

    #[builder(default = cdr_headers())]
    headers: HeaderMap,

    #[builder(default)]
    status_policy: StatusPolicy,

    #[builder(default = None)]
    timeout: Option<Duration>,
}

impl Transport {
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Sends one payload and waits for the response head. The body is dropped unread.
    pub async fn post(&self, payload: String) -> Result<PostMetric, TransportError> {
        let bytes_sent = payload.len() as u64;
        let mut req = self
            .client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .body(payload);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let start = Instant::now();
        let res = req.send().await.map_err(|source| TransportError::Request {
            url: self.url.clone(),
            source,
        })?;
        let latency = start.elapsed();
        let status = res.status();

        if self.status_policy == StatusPolicy::RequireSuccess && !status.is_success() {
            return Err(TransportError::Status {
                url: self.url.clone(),
                status,
            });
        }

        Ok(PostMetric {
            latency,
            status_code: status.as_u16(),
            bytes_sent,
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{body_string, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn url(server: &MockServer) -> Url {
        Url::parse(&format!("{}/freeswitch_json", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn posts_payload_with_cdr_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/freeswitch_json"))
            .and(header("content-type", "application/json"))
            .and(header("accept", "text/plain"))
            .and(body_string(r#"{"billsec":1}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = Transport::builder().url(url(&server)).build();
        let metric = transport.post(r#"{"billsec":1}"#.into()).await.unwrap();
        assert_eq!(metric.status_code, 200);
        assert_eq!(metric.bytes_sent, 13);
    }

    #[tokio::test]
    async fn error_status_is_ignored_by_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let transport = Transport::builder().url(url(&server)).build();
        let metric = transport.post("{}".into()).await.unwrap();
        assert_eq!(metric.status_code, 500);
    }

    #[tokio::test]
    async fn error_status_fails_when_success_required() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let transport = Transport::builder()
            .url(url(&server))
            .status_policy(StatusPolicy::RequireSuccess)
            .build();
        match transport.post("{}".into()).await {
            Err(TransportError::Status { status, .. }) => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_endpoint_hits_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let transport = Transport::builder()
            .url(url(&server))
            .timeout(Some(Duration::from_millis(50)))
            .build();
        assert!(matches!(
            transport.post("{}".into()).await,
            Err(TransportError::Request { .. })
        ));
    }
}
