use error_stack::{IntoReport, ResultExt};
use reqwest::header::CONTENT_TYPE;

use crate::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};

/// [Transport] over a `reqwest` client.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn request(
        &self,
        request: HttpRequest,
    ) -> error_stack::Result<HttpResponse, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let describe = || format!("{method} {}", url.path());

        let mut builder = match method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        };
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder
            .send()
            .await
            .into_report()
            .change_context(TransportError)
            .attach_printable_lazy(describe)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_ascii_lowercase(), value.to_owned()))
            })
            .collect();
        let body = response
            .text()
            .await
            .into_report()
            .change_context(TransportError)
            .attach_printable_lazy(describe)?;

        tracing::trace!(%method, path = url.path(), status, "received response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
