//! HTTP client abstraction for testability

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tokio_util::io::ReaderStream;

use super::error::BackendError;

/// A raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with a JSON body.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One multipart field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        bytes: Vec<u8>,
        mime: String,
    },
    /// A file streamed from disk when the request is sent.
    DiskFile {
        file_name: String,
        path: PathBuf,
        len: u64,
        mime: String,
    },
}

/// An ordered multipart form body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    fields: Vec<(String, FormValue)>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a text field.
    pub fn text(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.fields
            .push((name.into(), FormValue::Text(value.to_string())));
        self
    }

    /// Appends a text field if the value is present.
    pub fn text_opt(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.text(name, v),
            None => self,
        }
    }

    /// Appends a file field.
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.fields.push((
            name.into(),
            FormValue::File {
                file_name: file_name.into(),
                bytes,
                mime: "application/octet-stream".to_string(),
            },
        ));
        self
    }

    /// Appends a file field read from disk while the body is sent.
    pub fn disk_file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        path: impl Into<PathBuf>,
        len: u64,
    ) -> Self {
        self.fields.push((
            name.into(),
            FormValue::DiskFile {
                file_name: file_name.into(),
                path: path.into(),
                len,
                mime: "application/octet-stream".to_string(),
            },
        ));
        self
    }

    /// All fields in insertion order.
    pub fn fields(&self) -> &[(String, FormValue)] {
        &self.fields
    }

    /// Looks up the first text field with the given name.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|(n, v)| match v {
            FormValue::Text(t) if n == name => Some(t.as_str()),
            _ => None,
        })
    }
}

/// Trait for async HTTP operations against the processing backend.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    fn get(&self, url: &str) -> impl Future<Output = Result<HttpResponse, BackendError>> + Send;

    /// Performs a multipart HTTP POST request.
    fn post_multipart(
        &self,
        url: &str,
        form: MultipartForm,
    ) -> impl Future<Output = Result<HttpResponse, BackendError>> + Send;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    async fn build_form(form: MultipartForm) -> Result<Form, BackendError> {
        let mut out = Form::new();
        for (name, value) in form.fields {
            let (part, file_name, mime) = match value {
                FormValue::Text(text) => {
                    out = out.text(name, text);
                    continue;
                }
                FormValue::File {
                    file_name,
                    bytes,
                    mime,
                } => (Part::bytes(bytes), file_name, mime),
                FormValue::DiskFile {
                    file_name,
                    path,
                    len,
                    mime,
                } => {
                    let file = tokio::fs::File::open(&path)
                        .await
                        .map_err(|e| BackendError::Io {
                            path: path.display().to_string(),
                            reason: e.to_string(),
                        })?;
                    let body = Body::wrap_stream(ReaderStream::new(file));
                    (Part::stream_with_length(body, len), file_name, mime)
                }
            };
            let part = part
                .file_name(file_name)
                .mime_str(&mime)
                .map_err(|e| BackendError::Client(e.to_string()))?;
            out = out.part(name, part);
        }
        Ok(out)
    }

    async fn read(url: &str, response: reqwest::Response) -> Result<HttpResponse, BackendError> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Transport {
                url: url.to_string(),
                reason: format!("Failed to read response: {}", e),
            })?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, BackendError> {
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| BackendError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        Self::read(url, response).await
    }

    async fn post_multipart(
        &self,
        url: &str,
        form: MultipartForm,
    ) -> Result<HttpResponse, BackendError> {
        let form = Self::build_form(form).await?;
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        Self::read(url, response).await
    }
}
