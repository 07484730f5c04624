use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::FetchError;

/// Where `design_{n}/{file}.txt` lives
#[async_trait]
pub trait DesignSource: Send + Sync {
    /// Full text of `design_{design_number}/{file}.txt`.
    async fn fetch(&self, design_number: u32, file: &str) -> Result<String, FetchError>;
}

fn design_dir(design_number: u32) -> String {
    format!("design_{design_number}")
}

/// Design files served over HTTP below a base url
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base: Url,
}

impl HttpSource {
    pub fn new(base: &str) -> Result<Self, FetchError> {
        Self::with_client(Client::new(), base)
    }

    pub fn with_client(client: Client, base: &str) -> Result<Self, FetchError> {
        let base = Url::parse(base)?;
        if base.cannot_be_a_base() {
            return Err(FetchError::NotABase(base.into()));
        }
        Ok(Self { client, base })
    }

    pub fn url_for(&self, design_number: u32, file: &str) -> Result<Url, FetchError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::NotABase(self.base.to_string()))?
            .pop_if_empty()
            .push(&design_dir(design_number))
            .push(&format!("{file}.txt"));
        Ok(url)
    }
}

#[async_trait]
impl DesignSource for HttpSource {
    async fn fetch(&self, design_number: u32, file: &str) -> Result<String, FetchError> {
        let url = self.url_for(design_number, file)?;
        debug!(%url, "fetching design file");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.into(),
                status,
            });
        }
        Ok(response.text().await?)
    }
}

/// Design files on the local filesystem
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, design_number: u32, file: &str) -> PathBuf {
        self.root
            .join(design_dir(design_number))
            .join(format!("{file}.txt"))
    }
}

#[async_trait]
impl DesignSource for DirSource {
    async fn fetch(&self, design_number: u32, file: &str) -> Result<String, FetchError> {
        let path = self.path_for(design_number, file);
        debug!(path = %path.display(), "reading design file");
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| FetchError::Io { path, source })
    }
}

/// `http://` and `https://` bases are fetched over the network, anything
/// else is read as a directory.
pub fn source_for(base: &str) -> Result<Box<dyn DesignSource>, FetchError> {
    if base.starts_with("http://") || base.starts_with("https://") {
        Ok(Box::new(HttpSource::new(base)?))
    } else {
        Ok(Box::new(DirSource::new(base)))
    }
}
