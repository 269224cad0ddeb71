//! JSON transport against the configured backend origin.
//!
//! Builds URLs from [`BackendConfig`], serializes request bodies as JSON,
//! merges caller headers (caller wins), surfaces non-2xx responses as
//! [`ApiError::Http`] with the raw body text, and parses successful bodies
//! as JSON. Retry policy is the caller's responsibility; nothing here
//! retries.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::config::BackendConfig;
use crate::error::ApiError;
use crate::http_client::{HttpClient, HttpMethod, HttpRequest, ReqwestHttpClient};

/// Thin JSON request layer shared by every feature fetch.
#[derive(Clone)]
pub struct ApiTransport {
    config: BackendConfig,
    http: Arc<dyn HttpClient>,
}

impl ApiTransport {
    /// Production transport with the reqwest-backed client.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            http: Arc::new(ReqwestHttpClient::new()),
        }
    }

    /// Transport with an injected client (offline tests, recording).
    pub fn with_http_client(config: BackendConfig, http: Arc<dyn HttpClient>) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(path, HttpMethod::Get, None, BTreeMap::new())
            .await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(path, HttpMethod::Post, Some(body), BTreeMap::new())
            .await
    }

    /// Issue one request. Standard JSON headers are applied first and any
    /// caller-supplied headers are merged on top, so the caller wins on
    /// conflict.
    pub async fn request(
        &self,
        path: &str,
        method: HttpMethod,
        body: Option<&Value>,
        extra_headers: BTreeMap<String, String>,
    ) -> Result<Value, ApiError> {
        let url = self.config.endpoint(path);
        let mut request = HttpRequest::new(method, url)
            .with_header("content-type", "application/json")
            .with_header("accept", "application/json");

        for (name, value) in extra_headers {
            request = request.with_header(name, value);
        }

        if let Some(body) = body {
            request = request.with_body(body.to_string());
        }

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|error| ApiError::Network(error.message().to_owned()))?;

        if !response.is_success() {
            return Err(ApiError::Http {
                status: response.status,
                body: response.body,
            });
        }

        serde_json::from_str(&response.body).map_err(|error| ApiError::Parse(error.to_string()))
    }
}

/// Percent-encode a path segment such as a symbol in
/// `/api/v1/market/stock/{symbol}`.
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse, QueueHttpClient, ScriptedExchange};

    fn transport_with(client: QueueHttpClient) -> ApiTransport {
        let config = BackendConfig::new("http://localhost:8000").expect("valid");
        ApiTransport::with_http_client(config, Arc::new(client))
    }

    #[tokio::test]
    async fn success_parses_body_as_json() {
        let client = QueueHttpClient::new([ScriptedExchange::reply(HttpResponse::ok_json(
            r#"{"status":"healthy"}"#,
        ))]);
        let transport = transport_with(client);

        let value = transport.get("/health").await.expect("should parse");
        assert_eq!(value["status"], "healthy");
    }

    #[tokio::test]
    async fn non_2xx_surfaces_status_and_body_text() {
        let client = QueueHttpClient::new([ScriptedExchange::reply(HttpResponse::with_status(
            503,
            "service warming up",
        ))]);
        let transport = transport_with(client);

        let error = transport.get("/api/v1/market/overview").await.expect_err("503");
        assert_eq!(
            error,
            ApiError::Http {
                status: 503,
                body: "service warming up".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn invalid_json_is_a_parse_failure() {
        let client = QueueHttpClient::new([ScriptedExchange::reply(HttpResponse::ok_json(
            "<html>not json</html>",
        ))]);
        let transport = transport_with(client);

        let error = transport.get("/health").await.expect_err("bad json");
        assert!(matches!(error, ApiError::Parse(_)));
    }

    #[tokio::test]
    async fn transport_failure_maps_to_network_error() {
        let client = QueueHttpClient::new([ScriptedExchange::fail(HttpError::new(
            "connection refused",
        ))]);
        let transport = transport_with(client);

        let error = transport.get("/health").await.expect_err("unreachable");
        assert_eq!(error, ApiError::Network("connection refused".to_owned()));
    }

    #[tokio::test]
    async fn caller_headers_win_on_conflict() {
        let client = QueueHttpClient::new([ScriptedExchange::reply(HttpResponse::ok_json("{}"))]);
        let transport = {
            let config = BackendConfig::new("http://localhost:8000").expect("valid");
            // Keep a handle on the client to inspect recorded requests.
            let client = Arc::new(client);
            (ApiTransport::with_http_client(config, client.clone()), client)
        };
        let (transport, client) = transport;

        let mut headers = BTreeMap::new();
        headers.insert("accept".to_owned(), "text/event-stream".to_owned());
        transport
            .request("/api/v1/query", HttpMethod::Post, None, headers)
            .await
            .expect("scripted success");

        let recorded = client.recorded_requests();
        assert_eq!(
            recorded[0].headers.get("accept").map(String::as_str),
            Some("text/event-stream")
        );
        assert_eq!(
            recorded[0].headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(encode_segment("M&M"), "M%26M");
    }
}
