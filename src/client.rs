// Protocol client: builds request envelopes, dispatches them over HTTP and
// classifies every failure before the caller sees it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::envelope::{Envelope, Params};
use crate::error::ProtocolError;
use crate::normalize::{parse_response, unwrap_payload, NormalizedValue};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub namespace: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            namespace: namespace.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Raw transport result before classification.
#[derive(Debug)]
pub struct WireResponse {
    pub status: u16,
    pub body: String,
}

/// The dispatch seam. Production uses `HttpTransport`; tests substitute a
/// mock to drive the classification paths without a network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_xml(
        &self,
        url: &str,
        soap_action: &str,
        body: String,
    ) -> Result<WireResponse, ProtocolError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    timeout_ms: u64,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ProtocolError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProtocolError::Network(e.to_string()))?;
        Ok(Self {
            client,
            timeout_ms: timeout.as_millis() as u64,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_xml(
        &self,
        url: &str,
        soap_action: &str,
        body: String,
    ) -> Result<WireResponse, ProtocolError> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", soap_action)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    // A timed-out call aborts the in-flight request; reqwest
                    // drops the connection when the future is discarded.
                    ProtocolError::Timeout(self.timeout_ms)
                } else {
                    ProtocolError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ProtocolError::Network(e.to_string()))?;
        Ok(WireResponse { status, body })
    }
}

/// One client per supplier connection. Builds the envelope, dispatches with a
/// bounded timeout and returns the normalized payload or a classified error.
/// There is no built-in retry: each failure surfaces exactly once.
pub struct ProtocolClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl ProtocolClient {
    pub fn new(config: ClientConfig) -> Result<Self, ProtocolError> {
        let transport = Arc::new(HttpTransport::new(config.timeout)?);
        Ok(Self { config, transport })
    }

    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    pub async fn call(
        &self,
        operation: &str,
        params: Params,
    ) -> Result<NormalizedValue, ProtocolError> {
        let envelope = Envelope::new(operation, self.config.namespace.clone(), params);
        let xml = envelope.to_xml()?;

        debug!(operation, "dispatching supplier call");

        let response = self
            .transport
            .post_xml(&self.config.endpoint, &envelope.soap_action(), xml)
            .await
            .map_err(|e| {
                error!(operation, error = %e, "supplier call failed before response");
                e
            })?;

        if !(200..300).contains(&response.status) {
            let err = ProtocolError::from_status(operation, response.status, response.body);
            error!(operation, error = %err, "supplier returned non-success status");
            return Err(err);
        }

        let tree = parse_response(&response.body)?;
        unwrap_payload(tree, operation).map_err(|e| {
            if matches!(e, ProtocolError::Fault(_)) {
                error!(operation, error = %e, "supplier signaled fault");
            }
            e
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned-response transport capturing each request for assertions.
    pub struct MockTransport {
        responses: Mutex<Vec<Result<WireResponse, ProtocolError>>>,
        pub calls: AtomicUsize,
        pub last_request: Mutex<Option<(String, String)>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        pub fn enqueue_ok(&self, body: &str) {
            self.responses.lock().push(Ok(WireResponse {
                status: 200,
                body: body.to_string(),
            }));
        }

        pub fn enqueue_status(&self, status: u16, body: &str) {
            self.responses.lock().push(Ok(WireResponse {
                status,
                body: body.to_string(),
            }));
        }

        pub fn enqueue_err(&self, err: ProtocolError) {
            self.responses.lock().push(Err(err));
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn post_xml(
            &self,
            _url: &str,
            soap_action: &str,
            body: String,
        ) -> Result<WireResponse, ProtocolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock() = Some((soap_action.to_string(), body));
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                panic!("mock transport exhausted");
            }
            responses.remove(0)
        }
    }

    pub fn connect_response(token: &str) -> String {
        format!(
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
                <soap:Body><ConnectResponse xmlns="http://suppliers.example.com/">
                    <ConnectResult>{token}</ConnectResult>
                </ConnectResponse></soap:Body>
            </soap:Envelope>"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use crate::normalize::NormalizedValue;

    fn test_client(transport: Arc<MockTransport>) -> ProtocolClient {
        ProtocolClient::with_transport(
            ClientConfig::new(
                "https://suppliers.example.com/service.asmx",
                "http://suppliers.example.com/",
            ),
            transport,
        )
    }

    #[tokio::test]
    async fn test_round_trip_recovers_flattened_payload() {
        let transport = Arc::new(MockTransport::new());
        transport.enqueue_ok(
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
                <soap:Body><SearchResponse xmlns="http://suppliers.example.com/">
                    <SearchResult>
                        <Hotel code="101" name="Aurora">
                            <Price>84.82</Price>
                        </Hotel>
                    </SearchResult>
                </SearchResponse></soap:Body>
            </soap:Envelope>"#,
        );
        let client = test_client(Arc::clone(&transport));

        let params = Params::new().push("a", 1).push("b", 2);
        let payload = client.call("Search", params).await.unwrap();

        let hotel = payload.get("Hotel").unwrap();
        assert_eq!(hotel.get("code").unwrap().as_str().unwrap(), "101");
        assert_eq!(hotel.get("name").unwrap().as_str().unwrap(), "Aurora");
        assert_eq!(hotel.get("Price").unwrap().as_str().unwrap(), "84.82");

        // The dispatched envelope preserves the parameter order.
        let (action, body) = transport.last_request.lock().clone().unwrap();
        assert_eq!(action, "\"http://suppliers.example.com/Search\"");
        assert!(body.find("<a>1</a>").unwrap() < body.find("<b>2</b>").unwrap());
    }

    #[tokio::test]
    async fn test_status_codes_map_to_typed_errors() {
        let transport = Arc::new(MockTransport::new());
        transport.enqueue_status(401, "unauthorized");
        transport.enqueue_status(403, "forbidden");
        transport.enqueue_status(404, "missing");
        transport.enqueue_status(400, "bad");
        transport.enqueue_status(503, "unavailable");
        let client = test_client(transport);

        let errors = [
            client.call("Connect", Params::new()).await.unwrap_err(),
            client.call("Connect", Params::new()).await.unwrap_err(),
            client.call("GetHotel", Params::new()).await.unwrap_err(),
            client.call("Search", Params::new()).await.unwrap_err(),
            client.call("Search", Params::new()).await.unwrap_err(),
        ];
        assert!(matches!(errors[0], ProtocolError::Auth(_)));
        assert!(matches!(errors[1], ProtocolError::Forbidden(_)));
        assert!(matches!(errors[2], ProtocolError::NotFound(_)));
        assert!(matches!(errors[3], ProtocolError::BadRequest(_)));
        assert!(matches!(errors[4], ProtocolError::Transport { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_fault_inside_success_status() {
        let transport = Arc::new(MockTransport::new());
        transport.enqueue_ok(
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
                <soap:Body><soap:Fault><faultstring>Session expired</faultstring></soap:Fault></soap:Body>
            </soap:Envelope>"#,
        );
        let client = test_client(transport);

        match client.call("Search", Params::new()).await {
            Err(ProtocolError::Fault(msg)) => assert_eq!(msg, "Session expired"),
            other => panic!("expected Fault, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_from_transport_failure() {
        let transport = Arc::new(MockTransport::new());
        transport.enqueue_err(ProtocolError::Timeout(30_000));
        let client = test_client(transport);

        assert!(matches!(
            client.call("Search", Params::new()).await,
            Err(ProtocolError::Timeout(30_000))
        ));
    }

    #[tokio::test]
    async fn test_scalar_result_payload() {
        let transport = Arc::new(MockTransport::new());
        transport.enqueue_ok(&connect_response("abc-123"));
        let client = test_client(transport);

        let payload = client.call("Connect", Params::new()).await.unwrap();
        assert_eq!(payload, NormalizedValue::Scalar("abc-123".to_string()));
    }
}
