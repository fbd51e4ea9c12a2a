//! Forwarder (C8): issues the outbound HTTP request with a hard deadline
//! and a body-size cap, surfaces the response back untouched (no redirect
//! following, no response rewriting).

use std::time::Duration;

use shared::errors::ApiError;
use tracing::warn;

use crate::service::Headers;

/// Declared + actual body size cap. 10 MiB.
pub const MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

/// Default outbound forward deadline; also used for the approved-execute
/// forward, which shares the same budget.
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

pub struct Forwarder {
    http: reqwest::Client,
    timeout: Duration,
}

impl Forwarder {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    pub async fn forward(
        &self,
        method: &str,
        target_url: &str,
        headers: &Headers,
        body: Option<&[u8]>,
    ) -> Result<ForwardResponse, ApiError> {
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|_| ApiError::TargetInvalid { message: format!("unsupported method: {method}") })?;

        let mut request = self.http.request(method, target_url);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(err)) => {
                warn!(error = %err, "forward failed at the transport level");
                return Err(ApiError::BadGateway);
            }
            Err(_) => return Err(ApiError::GatewayTimeout),
        };

        if let Some(declared_len) = response.content_length() {
            if declared_len > MAX_BODY_BYTES {
                return Err(ApiError::PayloadTooLarge);
            }
        }

        let status = response.status().as_u16();
        let mut response_headers = Headers::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                // Last-value-wins on repeated header names.
                response_headers.insert(name.to_string(), value.to_string());
            }
        }

        let body = match tokio::time::timeout(self.timeout, response.bytes()).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(err)) => {
                warn!(error = %err, "failed reading forwarded response body");
                return Err(ApiError::BadGateway);
            }
            Err(_) => return Err(ApiError::GatewayTimeout),
        };

        if body.len() as u64 > MAX_BODY_BYTES {
            return Err(ApiError::PayloadTooLarge);
        }

        Ok(ForwardResponse { status, headers: response_headers, body: body.to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn forwards_method_headers_and_body_and_returns_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/widgets"))
            .and(header("Authorization", "Bearer ghp_X"))
            .respond_with(ResponseTemplate::new(201).set_body_string("{\"id\":1}"))
            .mount(&server)
            .await;

        let forwarder = Forwarder::new(reqwest::Client::new(), DEFAULT_FORWARD_TIMEOUT);
        let mut headers = Headers::new();
        headers.insert("Authorization".to_string(), "Bearer ghp_X".to_string());

        let response = forwarder
            .forward("POST", &format!("{}/widgets", server.uri()), &headers, Some(b"{}"))
            .await
            .unwrap();

        assert_eq!(response.status, 201);
        assert_eq!(response.body, b"{\"id\":1}");
    }

    #[tokio::test]
    async fn rejects_response_declaring_body_over_the_size_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/huge"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-length", (MAX_BODY_BYTES + 1).to_string().as_str()),
            )
            .mount(&server)
            .await;

        let forwarder = Forwarder::new(reqwest::Client::new(), DEFAULT_FORWARD_TIMEOUT);
        let err = forwarder
            .forward("GET", &format!("{}/huge", server.uri()), &Headers::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::PayloadTooLarge));
    }

    #[tokio::test]
    async fn times_out_when_the_upstream_is_slower_than_the_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(200)))
            .mount(&server)
            .await;

        let forwarder = Forwarder::new(reqwest::Client::new(), Duration::from_millis(20));
        let err = forwarder
            .forward("GET", &format!("{}/slow", server.uri()), &Headers::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::GatewayTimeout));
    }
}
