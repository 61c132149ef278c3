use crate::config::ResolverConfig;
use crate::network::errors::NetworkError;
use async_trait::async_trait;
use encoding_rs::Encoding;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

/// Body of a fetched page as a stream of byte chunks.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, NetworkError>>;

/// An opened remote resource whose body has not been read yet.
pub struct Page {
    pub content_type: Option<String>,
    pub body: ByteStream,
}

impl Page {
    // * Only HTML documents are scanned for a title
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    /// Encoding named by the `charset` parameter of the content type; UTF-8 when absent or unknown.
    pub fn encoding(&self) -> &'static Encoding {
        self.content_type
            .as_deref()
            .and_then(charset_from_content_type)
            .unwrap_or(encoding_rs::UTF_8)
    }
}

// * "text/html; charset=ISO-8859-1" -> windows-1252 (WHATWG label mapping)
fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    let lower = content_type.to_ascii_lowercase();
    let label = lower
        .split("charset=")
        .nth(1)?
        .trim_start_matches(['"', '\''])
        .split(['"', '\'', ';', ',', ' '])
        .next()?
        .trim();

    if label.is_empty() {
        return None;
    }
    Encoding::for_label(label.as_bytes())
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Opens remote resources for title scanning.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn open(&self, url: &str) -> Result<Page, NetworkError>;
}

// * The HTTP engine behind title resolution.
pub struct HttpFetcher {
    inner: Client,
}

impl HttpFetcher {
    // * Builds the client with explicit connect and total timeouts.
    pub fn new(config: &ResolverConfig) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout())
            .timeout(config.fetch_timeout())
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { inner: client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn open(&self, url: &str) -> Result<Page, NetworkError> {
        let parsed = url::Url::parse(url).map_err(|_| NetworkError::InvalidUrl(url.to_string()))?;

        let resp = self.inner.get(parsed).send().await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(NetworkError::Status(status.as_u16()));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        debug!(url = %url, content_type = ?content_type, "Opened page");

        let body = resp
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(NetworkError::from))
            .boxed();

        Ok(Page { content_type, body })
    }
}

// * Fetcher used when network access is disabled; every title falls back.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineFetcher;

#[async_trait]
impl PageFetcher for OfflineFetcher {
    async fn open(&self, _url: &str) -> Result<Page, NetworkError> {
        Err(NetworkError::Offline)
    }
}
