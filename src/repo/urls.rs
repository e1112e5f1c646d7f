//! Munki repository URL construction.

use crate::error::{ConfigError, Error, Result};
use url::Url;

/// Base URLs of the four repository areas.
#[derive(Debug, Clone)]
pub struct RepoUrls {
    base: String,
}

impl RepoUrls {
    /// Validates `base` and strips trailing slashes.
    pub fn new(base: &str) -> Result<Self> {
        let trimmed = base.trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| ConfigError::InvalidRepository {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidRepository {
                url: base.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            }
            .into());
        }
        Ok(Self {
            base: trimmed.to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn is_https(&self) -> bool {
        self.base.starts_with("https://")
    }

    pub fn manifest(&self, name: &str) -> String {
        format!("{}/manifests/{}", self.base, encode_path(name))
    }

    pub fn catalog(&self, name: &str) -> String {
        format!("{}/catalogs/{}", self.base, encode_path(name))
    }

    pub fn pkg(&self, location: &str) -> String {
        format!("{}/pkgs/{}", self.base, encode_path(location))
    }

    pub fn icon(&self, name: &str) -> String {
        format!("{}/icons/{}", self.base, encode_path(name))
    }
}

/// Percent-encode each path segment, keeping `/` separators.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decoded last path segment of a URL, used as the cached file name.
pub fn url_basename(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| Error::Fetch {
        url: url.to_string(),
        reason: format!("invalid URL: {e}"),
    })?;
    let encoded = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Fetch {
            url: url.to_string(),
            reason: "URL has no file name".to_string(),
        })?;
    let decoded = urlencoding::decode(encoded).map_err(|e| Error::Fetch {
        url: url.to_string(),
        reason: format!("file name is not UTF-8: {e}"),
    })?;
    Ok(decoded.into_owned())
}
