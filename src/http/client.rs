use std::future::Future;
use std::io::Cursor;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, HeaderValue};
use reqwest::{Body, Client};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, TransportError};
use crate::http::builder::WireRequest;
use crate::state::result::ResponseHead;

/// Body bytes and response head returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub body: Bytes,
    pub head: ResponseHead,
}

/// Performs the actual exchange for an assembled request. TLS, pooling and
/// redirects are the implementation's business.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: &WireRequest,
        body: Option<Bytes>,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

pub fn build_client(timeout: Option<Duration>) -> Result<Client, AppError> {
    let mut builder = Client::builder().use_rustls_tls();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|err| AppError::Other(format!("failed to build HTTP client: {err}")))
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self, AppError> {
        Ok(Self::new(build_client(timeout)?))
    }
}

impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &WireRequest,
        body: Option<Bytes>,
    ) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url.as_url().clone())
            .headers(request.headers.clone());

        if let Some(body) = body {
            // Streamed as an upload; the explicit length keeps it out of chunked encoding.
            if !request.headers.contains_key(CONTENT_LENGTH) {
                builder = builder.header(CONTENT_LENGTH, HeaderValue::from(body.len()));
            }
            let stream = ReaderStream::new(Cursor::new(body));
            builder = builder.body(Body::wrap_stream(stream));
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let body = response.bytes().await?;

        Ok(TransportResponse {
            body,
            head: ResponseHead { status, headers },
        })
    }
}
