//! Attachment resolution for the email action.
//!
//! Raw attachment tokens come out of template substitution as a
//! comma-separated string. Each token is either a local file path, a
//! downloadable URL, or junk; junk is dropped with a diagnostic and never
//! fails the dispatch.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

/// File extensions accepted as email attachments. Downloads with any other
/// extension are renamed to `.tmp`; local files with any other extension are
/// dropped.
pub const ALLOWED_EXTENSIONS: [&str; 14] = [
    "pdf", "doc", "docx", "txt", "jpg", "jpeg", "gif", "png", "bmp", "xls", "xlsx", "csv", "zip",
    "rar",
];

/// Upstream template substitution sometimes yields this broken default;
/// it must never reach a gateway.
pub const PLACEHOLDER_BASENAME: &str = "placeholder.pdf";

/// An attachment token resolved to a readable file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttachment {
    pub source_path: PathBuf,
    pub size_bytes: u64,
}

/// Remote fetch seam; the production implementation wraps reqwest.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UrlFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        let response = self.client.get(url.clone()).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Result of resolving a raw attachment string. `downloaded` lists the
/// temp-cache files created along the way; the caller owns their cleanup.
#[derive(Debug, Default)]
pub struct ResolvedSet {
    pub attachments: Vec<ResolvedAttachment>,
    pub downloaded: Vec<PathBuf>,
}

pub struct AttachmentResolver<'a> {
    cache_dir: &'a Path,
    fetcher: &'a dyn UrlFetcher,
}

impl<'a> AttachmentResolver<'a> {
    pub fn new(cache_dir: &'a Path, fetcher: &'a dyn UrlFetcher) -> Self {
        Self { cache_dir, fetcher }
    }

    /// Resolve a comma-separated attachment string into readable files.
    pub async fn resolve(&self, raw: &str) -> ResolvedSet {
        let mut set = ResolvedSet::default();

        for token in raw.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }

            if let Some(attachment) = self.resolve_local(token) {
                set.attachments.push(attachment);
            } else if let Some(url) = parse_http_url(token) {
                match self.download(&url).await {
                    Ok(attachment) => {
                        set.downloaded.push(attachment.source_path.clone());
                        set.attachments.push(attachment);
                    }
                    Err(e) => {
                        warn!(url = %url, error = %e, "attachment download failed, dropping");
                    }
                }
            } else {
                warn!(token, "attachment not found or not accessible, dropping");
            }
        }

        set
    }

    fn resolve_local(&self, token: &str) -> Option<ResolvedAttachment> {
        let path = Path::new(token);
        let metadata = fs::metadata(path).ok()?;
        if !metadata.is_file() || fs::File::open(path).is_err() {
            return None;
        }

        let extension = extension_of(path);
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            warn!(token, extension, "attachment extension not allowed, dropping");
            return None;
        }

        debug!(token, size = metadata.len(), "resolved local attachment");
        Some(ResolvedAttachment {
            source_path: path.to_path_buf(),
            size_bytes: metadata.len(),
        })
    }

    async fn download(
        &self,
        url: &Url,
    ) -> Result<ResolvedAttachment, Box<dyn std::error::Error + Send + Sync>> {
        let bytes = self.fetcher.fetch(url).await?;

        fs::create_dir_all(self.cache_dir)?;
        let target = self.unique_target(url);
        fs::write(&target, &bytes)?;

        debug!(url = %url, path = %target.display(), size = bytes.len(), "downloaded url attachment");
        Ok(ResolvedAttachment {
            size_bytes: bytes.len() as u64,
            source_path: target,
        })
    }

    /// Sanitized, collision-safe target path for a downloaded URL.
    fn unique_target(&self, url: &Url) -> PathBuf {
        let basename = url
            .path_segments()
            .and_then(|segments| segments.last())
            .unwrap_or_default();

        let mut stem = sanitize_file_name(Path::new(basename).file_stem().and_then(|s| s.to_str()).unwrap_or(""));
        if stem.is_empty() {
            stem = Uuid::new_v4().simple().to_string();
        }

        let extension = {
            let ext = extension_of(Path::new(basename));
            if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                ext
            } else {
                "tmp".to_string()
            }
        };

        let mut target = self.cache_dir.join(format!("{}.{}", stem, extension));
        if target.exists() {
            target = self
                .cache_dir
                .join(format!("{}-{}.{}", stem, Uuid::new_v4().simple(), extension));
        }
        target
    }
}

/// Keep only `[A-Za-z0-9_()-]`; everything else is stripped.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '(' | ')'))
        .collect()
}

/// Drop attachments that vanished, are empty, or are the known placeholder.
pub fn validate_attachments(attachments: Vec<ResolvedAttachment>) -> Vec<ResolvedAttachment> {
    attachments
        .into_iter()
        .filter(|attachment| {
            let basename = attachment
                .source_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let size = fs::metadata(&attachment.source_path).map(|m| m.len()).unwrap_or(0);
            if size == 0 {
                warn!(path = %attachment.source_path.display(), "dropping missing or empty attachment");
                return false;
            }
            if basename == PLACEHOLDER_BASENAME {
                warn!(path = %attachment.source_path.display(), "dropping placeholder attachment");
                return false;
            }
            true
        })
        .collect()
}

fn parse_http_url(token: &str) -> Option<Url> {
    let url = Url::parse(token).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}
