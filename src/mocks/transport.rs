//! Mock HTTP transport for tests.

use crate::error::{NetworkError, StoreError};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, StreamingResponse};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl MockResponse {
    /// Create a successful response with empty body.
    pub fn ok() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create a successful response with body.
    pub fn ok_with_body(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Create a 204 No Content response.
    pub fn no_content() -> Self {
        Self {
            status: 204,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create an error response.
    pub fn error(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Add a header to the response.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add multiple headers to the response.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// Builder for mock transports.
pub struct MockResponseBuilder {
    responses: Vec<MockResponse>,
}

impl MockResponseBuilder {
    /// Create a new mock response builder.
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
        }
    }

    /// Add a response to return.
    pub fn respond(mut self, response: MockResponse) -> Self {
        self.responses.push(response);
        self
    }

    /// Add multiple responses.
    pub fn respond_all(mut self, responses: Vec<MockResponse>) -> Self {
        self.responses.extend(responses);
        self
    }

    /// Build the mock transport.
    pub fn build(self) -> MockTransport {
        MockTransport::with_responses(self.responses)
    }
}

impl Default for MockResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock HTTP transport that replays queued responses in order.
///
/// Every request is recorded before its response is taken from the
/// queue, so assertions can inspect exactly what was sent. A queue
/// entry may also be an error, for exercising network-failure paths.
pub struct MockTransport {
    /// Queue of outcomes to return.
    responses: Mutex<Vec<Result<MockResponse, StoreError>>>,
    /// Recorded requests.
    requests: Mutex<Vec<HttpRequest>>,
    /// Default response once the queue is drained.
    default_response: Option<MockResponse>,
}

impl MockTransport {
    /// Create a new mock transport with no responses.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            default_response: None,
        }
    }

    /// Create a mock transport with queued responses.
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
            default_response: None,
        }
    }

    /// Create a mock transport with a default response.
    pub fn with_default(response: MockResponse) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            default_response: Some(response),
        }
    }

    /// Create a builder for the mock transport.
    pub fn builder() -> MockResponseBuilder {
        MockResponseBuilder::new()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: MockResponse) {
        self.responses.lock().unwrap().push(Ok(response));
    }

    /// Queue an error to return in place of a response.
    pub fn queue_error(&self, error: StoreError) {
        self.responses.lock().unwrap().push(Err(error));
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Get the last request made.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    /// Clear all queued responses.
    pub fn clear_responses(&self) {
        self.responses.lock().unwrap().clear();
    }

    fn next_outcome(&self) -> Result<MockResponse, StoreError> {
        let queued = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                None
            } else {
                Some(responses.remove(0))
            }
        };
        match queued {
            Some(outcome) => outcome,
            None => match &self.default_response {
                Some(response) => Ok(response.clone()),
                None => Err(StoreError::Network(NetworkError::ConnectionFailed {
                    message: "No mock response available".to_string(),
                })),
            },
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, StoreError> {
        self.requests.lock().unwrap().push(request);

        let mock = self.next_outcome()?;
        Ok(HttpResponse {
            status: mock.status,
            headers: mock.headers,
            body: mock.body,
        })
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
        body_stream: Box<dyn futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + Unpin>,
    ) -> Result<HttpResponse, StoreError> {
        // Buffer the body so assertions can see what would have been sent.
        let mut collected = Vec::new();
        let mut body_stream = body_stream;
        while let Some(chunk) = body_stream.next().await {
            let chunk = chunk.map_err(|e| {
                StoreError::Network(NetworkError::ConnectionFailed {
                    message: e.to_string(),
                })
            })?;
            collected.extend_from_slice(&chunk);
        }
        self.send(request.with_body(Bytes::from(collected))).await
    }

    async fn send_download(&self, request: HttpRequest) -> Result<StreamingResponse, StoreError> {
        self.requests.lock().unwrap().push(request);

        let mock = self.next_outcome()?;
        let chunks: Vec<Result<Bytes, StoreError>> = if mock.body.is_empty() {
            Vec::new()
        } else {
            vec![Ok(mock.body)]
        };
        Ok(StreamingResponse {
            status: mock.status,
            headers: mock.headers,
            body: Box::new(futures::stream::iter(chunks)),
        })
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued_responses", &self.responses.lock().unwrap().len())
            .field("recorded_requests", &self.requests.lock().unwrap().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_queued_response_and_records_request() {
        let transport = MockTransport::with_responses(vec![MockResponse::ok()]);

        let request = HttpRequest::new("GET", "https://example.com");
        let response = transport.send(request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn returns_responses_in_queue_order() {
        let transport = MockTransport::with_responses(vec![
            MockResponse::ok_with_body("first"),
            MockResponse::ok_with_body("second"),
        ]);

        let response1 = transport
            .send(HttpRequest::new("GET", "https://example.com/1"))
            .await
            .unwrap();
        assert_eq!(response1.body, Bytes::from("first"));

        let response2 = transport
            .send(HttpRequest::new("GET", "https://example.com/2"))
            .await
            .unwrap();
        assert_eq!(response2.body, Bytes::from("second"));
    }

    #[tokio::test]
    async fn queued_error_is_returned_in_order() {
        let transport = MockTransport::with_responses(vec![MockResponse::ok()]);
        transport.queue_error(StoreError::Network(NetworkError::ConnectionFailed {
            message: "reset".to_string(),
        }));
        transport.queue_response(MockResponse::no_content());

        let request = HttpRequest::new("GET", "https://example.com");
        assert!(transport.send(request.clone()).await.is_ok());
        assert!(transport.send(request.clone()).await.is_err());
        let last = transport.send(request).await.unwrap();
        assert_eq!(last.status, 204);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn falls_back_to_default_response() {
        let transport = MockTransport::with_default(MockResponse::ok_with_body("default"));

        for _ in 0..2 {
            let response = transport
                .send(HttpRequest::new("GET", "https://example.com"))
                .await
                .unwrap();
            assert_eq!(response.body, Bytes::from("default"));
        }
    }

    #[tokio::test]
    async fn empty_queue_without_default_is_a_network_error() {
        let transport = MockTransport::new();

        let result = transport
            .send(HttpRequest::new("GET", "https://example.com"))
            .await;
        assert!(matches!(
            result,
            Err(StoreError::Network(NetworkError::ConnectionFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn records_request_method_url_and_body() {
        let transport = MockTransport::with_default(MockResponse::ok());

        let request = HttpRequest::new("POST", "https://example.com")
            .with_body(Bytes::from("request body"));
        transport.send(request).await.unwrap();

        let recorded = transport.last_request().unwrap();
        assert_eq!(recorded.method, "POST");
        assert_eq!(recorded.url, "https://example.com");
        assert_eq!(recorded.body, Some(Bytes::from("request body")));
    }

    #[tokio::test]
    async fn download_streams_the_queued_body() {
        let transport = MockTransport::with_responses(vec![
            MockResponse::ok_with_body("streamed").with_header("etag", "\"abc\""),
        ]);

        let response = transport
            .send_download(HttpRequest::new("GET", "https://example.com"))
            .await
            .unwrap();
        assert_eq!(response.etag(), Some("\"abc\""));
        let body = response.collect_body().await.unwrap();
        assert_eq!(body, Bytes::from("streamed"));
    }

    #[tokio::test]
    async fn builder_queues_responses() {
        let transport = MockTransport::builder()
            .respond(MockResponse::ok_with_body("first"))
            .respond(MockResponse::error(404, "Not Found"))
            .build();

        let response1 = transport
            .send(HttpRequest::new("GET", "https://example.com"))
            .await
            .unwrap();
        assert_eq!(response1.status, 200);

        let response2 = transport
            .send(HttpRequest::new("GET", "https://example.com"))
            .await
            .unwrap();
        assert_eq!(response2.status, 404);
    }
}
