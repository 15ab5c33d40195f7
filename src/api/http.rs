//! Real backend transport using reqwest

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{multipart, Client, Response};
use tracing::debug;
use url::Url;

use crate::api::{ApiError, Attachment, ByteStream, ChatBackend, ChatRequest, Message, Session};
use crate::config::Config;

/// HTTP client for the chat service
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpBackend {
    /// Create backend from resolved configuration
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        Self::build(
            &config.base_url,
            config.request_timeout(),
            config.connect_timeout(),
        )
    }

    /// Create backend with default timeouts (tests, one-off tools)
    pub fn with_base_url(base_url: &str) -> Result<Self, ApiError> {
        let defaults = Config::default();
        Self::build(base_url, defaults.request_timeout(), defaults.connect_timeout())
    }

    fn build(
        base_url: &str,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Configuration(format!("invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Configuration(format!(
                "base URL '{}' cannot carry a path",
                base_url
            )));
        }
        // Url::join drops the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        // No client-wide timeout: it would also cut long streaming replies
        let client = Client::builder().connect_timeout(connect_timeout).build()?;

        Ok(Self {
            client,
            base_url,
            request_timeout,
        })
    }

    /// Base URL every endpoint is resolved against
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Configuration("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Turn a non-success status into `ApiError::Http`, keeping the body for diagnostics
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Guess a MIME type from the file extension
///
/// The backend forwards this to the model, so common document and image
/// types matter; everything else is sent as opaque bytes.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "rs" | "py" | "js" | "ts" | "go" | "c" | "h" | "cpp" | "java" | "toml" | "yaml" | "yml" => {
            "text/plain"
        }
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn list_sessions(&self) -> Result<Vec<Session>, ApiError> {
        let url = self.endpoint(&["sessions"])?;
        debug!(%url, "GET sessions");
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn create_session(&self) -> Result<Session, ApiError> {
        let url = self.endpoint(&["sessions"])?;
        debug!(%url, "POST sessions");
        let response = self
            .client
            .post(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["sessions", session_id])?;
        debug!(%url, "DELETE session");
        let response = self
            .client
            .delete(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, ApiError> {
        let url = self.endpoint(&["sessions", session_id, "messages"])?;
        debug!(%url, "GET messages");
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn upload(&self, filename: &str, content: Vec<u8>) -> Result<Attachment, ApiError> {
        let url = self.endpoint(&["upload"])?;
        debug!(%url, filename, bytes = content.len(), "POST upload");
        let part = multipart::Part::bytes(content)
            .file_name(filename.to_string())
            .mime_str(content_type_for(filename))?;
        let form = multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(url)
            .multipart(form)
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ApiError> {
        let url = self.endpoint(&["chat", "stream"])?;
        debug!(%url, session_id = %request.session_id, "POST chat stream");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ApiError::from))
            .boxed())
    }
}
