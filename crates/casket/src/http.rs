//! Small blocking HTTP wrapper with a typed request body.
//!
//! Each body kind carries its own payload, so there is no runtime guessing
//! about what a caller passed in.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::{multipart, Client, Response};
use reqwest::header::{HeaderName, HeaderValue};
pub use reqwest::Method;

use crate::error::{CasketError, Result};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Request payload.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    /// Serialized as JSON with `Content-Type: application/json`.
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded` key/value pairs.
    Form(Vec<(String, String)>),
    /// `multipart/form-data` with text fields and files.
    Multipart(Vec<FormPart>),
    /// Bytes sent as-is. Without a content type, set one via headers.
    Raw {
        bytes: Vec<u8>,
        content_type: Option<String>,
    },
}

/// One field of a multipart body.
#[derive(Debug, Clone)]
pub enum FormPart {
    Text { name: String, value: String },
    /// File read from disk; the part's file name is the path's base name.
    File { name: String, path: PathBuf },
    /// In-memory file content.
    Bytes {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

/// Status and full body of a completed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking client with a fixed timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CasketError::http("<client>", e))?;
        Ok(Self { client })
    }

    /// Send a request and read the whole response body.
    ///
    /// `headers` are applied last and replace any header the body set,
    /// including `Content-Type`. Non-2xx statuses are returned, not errors.
    pub fn send(
        &self,
        method: Method,
        url: &str,
        headers: &[(&str, &str)],
        body: RequestBody,
    ) -> Result<HttpResponse> {
        let builder = self.client.request(method.clone(), url);
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(pairs) => builder.form(&pairs),
            RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)?),
            RequestBody::Raw {
                bytes,
                content_type,
            } => {
                let builder = builder.body(bytes);
                match content_type {
                    Some(ct) => builder.header(reqwest::header::CONTENT_TYPE, ct),
                    None => builder,
                }
            }
        };

        let mut request = builder.build().map_err(|e| CasketError::http(url, e))?;
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| CasketError::Http {
                url: url.to_string(),
                message: format!("invalid header name {name:?}: {e}"),
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| CasketError::Http {
                url: url.to_string(),
                message: format!("invalid header value for {name}: {e}"),
            })?;
            request.headers_mut().insert(name, value);
        }

        let response = self
            .client
            .execute(request)
            .map_err(|e| CasketError::http(url, e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|e| CasketError::http(url, e))?
            .to_vec();

        tracing::debug!(%method, url, status, bytes = body.len(), "HTTP request complete");
        Ok(HttpResponse { status, body })
    }

    /// Start a GET and hand back the response for streaming.
    ///
    /// Fails with [`CasketError::HttpStatus`] on a non-2xx status.
    pub fn get_stream(&self, url: &str) -> Result<Response> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| CasketError::http(url, e))?;
        if !response.status().is_success() {
            return Err(CasketError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

fn multipart_form(parts: Vec<FormPart>) -> Result<multipart::Form> {
    let mut form = multipart::Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name, value),
            FormPart::File { name, path } => form
                .file(name, &path)
                .map_err(|e| CasketError::io("multipart", &path, e))?,
            FormPart::Bytes {
                name,
                file_name,
                bytes,
            } => form.part(name, multipart::Part::bytes(bytes).file_name(file_name)),
        };
    }
    Ok(form)
}
