use std::collections::BTreeMap;

use url::Url;

mod reqwest_transport;

pub use reqwest_transport::ReqwestTransport;

#[derive(Clone, Copy, Debug, PartialEq, Eq, derive_more::Display)]
pub enum Method {
    #[display(fmt = "GET")]
    Get,
    #[display(fmt = "POST")]
    Post,
}

/// A request to the service.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<String>,
}

impl std::fmt::Debug for HttpRequest {
    // Header values include the API key.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field(
                "headers",
                &self.headers.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("body", &self.body)
            .finish()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Response headers, keyed by lower-cased name.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

#[derive(derive_more::Display, Debug)]
#[display(fmt = "failed to send request")]
pub struct TransportError;

impl error_stack::Context for TransportError {}

/// The capability to send a request to the service.
///
/// Any HTTP status is a successful response at this level. Errors are
/// reserved for failing to get a response at all.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        request: HttpRequest,
    ) -> error_stack::Result<HttpResponse, TransportError>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn request(
        &self,
        request: HttpRequest,
    ) -> error_stack::Result<HttpResponse, TransportError> {
        self.as_ref().request(request).await
    }
}
