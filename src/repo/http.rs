//! HTTP implementation of [`Fetcher`].
//!
//! Downloads go to `<name>.partial` next to the destination and are renamed
//! into place only after the body is complete and, when a hash is expected,
//! verified. Conditional requests use the validators recorded in
//! [`ValidatorStore`]; an interrupted download resumes with `Range` guarded by
//! `If-Range`, so a changed remote file restarts from scratch.

use crate::error::{ConfigError, Error, ErrorExt, Result};
use crate::repo::fetch::{FetchOutcome, FetchRequest, Fetcher, PARTIAL_SUFFIX};
use crate::repo::state::{ValidatorStore, Validators};
use crate::repo::urls::url_basename;
use crate::utils::{checksum, fs};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetcher backed by `reqwest`, sending the configured custom headers.
pub struct HttpFetcher {
    client: Client,
    headers: HeaderMap,
    state: ValidatorStore,
}

impl HttpFetcher {
    /// Create a fetcher with the default client.
    pub fn new(headers: &[String], state: ValidatorStore) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, headers, state)
    }

    /// Create a fetcher around an existing client.
    pub fn with_client(client: Client, headers: &[String], state: ValidatorStore) -> Result<Self> {
        Ok(Self {
            client,
            headers: parse_headers(headers)?,
            state,
        })
    }

    pub fn state(&self) -> &ValidatorStore {
        &self.state
    }

    /// Bytes already on disk for a resumable partial download.
    ///
    /// Only partials with recorded validators can resume; anything else is
    /// discarded so stale bytes never get spliced onto a new body.
    async fn resume_point(&mut self, partial: &Path) -> Result<Option<(u64, String)>> {
        let len = match tokio::fs::metadata(partial).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => meta.len(),
            _ => return Ok(None),
        };
        let guard = self
            .state
            .get(partial)
            .and_then(|v| v.etag.clone().or_else(|| v.last_modified.clone()));
        match guard {
            Some(guard) => Ok(Some((len, guard))),
            None => {
                log::debug!("Discarding unresumable partial {}", partial.display());
                self.discard_partial(partial).await?;
                Ok(None)
            }
        }
    }

    async fn discard_partial(&mut self, partial: &Path) -> Result<()> {
        fs::remove_file(partial).await?;
        self.state.remove(partial)
    }

    async fn send(
        &self,
        request: &FetchRequest<'_>,
        dest: &Path,
        resume: Option<&(u64, String)>,
        conditional: bool,
    ) -> Result<Response> {
        let mut builder = self.client.get(request.url).headers(self.headers.clone());

        if conditional && dest.is_file() {
            if let Some(validators) = self.state.get(dest) {
                if let Some(etag) = &validators.etag {
                    builder = builder.header(header::IF_NONE_MATCH, etag);
                }
                if let Some(modified) = &validators.last_modified {
                    builder = builder.header(header::IF_MODIFIED_SINCE, modified);
                }
            }
        }

        if let Some((offset, guard)) = resume {
            log::info!("Resuming {} at byte {}", request.url, offset);
            builder = builder
                .header(header::RANGE, format!("bytes={offset}-"))
                .header(header::IF_RANGE, guard);
        }

        Ok(builder.send().await?)
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&mut self, request: FetchRequest<'_>) -> Result<FetchOutcome> {
        let name = url_basename(request.url)?;
        let dest = request.dest_dir.join(&name);
        let partial = partial_path(&dest);

        // a local copy failing the catalog hash must not be revalidated
        let mut conditional = !request.force;
        if conditional {
            if let Some(hash) = request.expected_hash {
                if checksum::matches_sha256(&dest, hash).await {
                    log::debug!("{} matches catalog hash, not downloading", dest.display());
                    return Ok(FetchOutcome {
                        path: dest,
                        changed: false,
                    });
                }
                if dest.is_file() {
                    log::info!("{} does not match catalog hash, downloading again", dest.display());
                    conditional = false;
                }
            }
        }

        let mut resume = self.resume_point(&partial).await?;
        let response = loop {
            let response = self
                .send(&request, &dest, resume.as_ref(), conditional)
                .await?;
            match response.status() {
                StatusCode::NOT_MODIFIED => {
                    log::debug!("{} not modified", request.url);
                    return Ok(FetchOutcome {
                        path: dest,
                        changed: false,
                    });
                }
                StatusCode::RANGE_NOT_SATISFIABLE if resume.is_some() => {
                    self.discard_partial(&partial).await?;
                    resume = None;
                }
                status if status.is_success() => break response,
                status => {
                    return Err(Error::Fetch {
                        url: request.url.to_string(),
                        reason: format!("server returned {status}"),
                    });
                }
            }
        };

        let append = resume.is_some() && response.status() == StatusCode::PARTIAL_CONTENT;
        let validators = validators_of(&response);
        self.state.set(&partial, validators.clone())?;

        // an interrupted body leaves the partial and its validators for a later resume
        write_body(response, &partial, append).await?;

        if let Some(expected) = request.expected_hash {
            let actual = checksum::file_sha256(&partial).await?;
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                self.discard_partial(&partial).await?;
                return Err(Error::Fetch {
                    url: request.url.to_string(),
                    reason: format!("hash mismatch: expected {expected}, got {actual}"),
                });
            }
        }

        tokio::fs::rename(&partial, &dest)
            .await
            .fs_context("moving download into place", &dest)?;
        self.state.remove(&partial)?;
        self.state.set(&dest, validators)?;
        log::info!("Downloaded {}", dest.display());

        Ok(FetchOutcome {
            path: dest,
            changed: true,
        })
    }

    fn forget(&mut self, path: &Path) -> Result<()> {
        self.state.remove(path)
    }
}

async fn write_body(mut response: Response, partial: &Path, append: bool) -> Result<()> {
    if let Some(parent) = partial.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(partial)
        .await
        .fs_context("opening partial download", partial)?;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)
            .await
            .fs_context("writing partial download", partial)?;
    }
    file.flush()
        .await
        .fs_context("flushing partial download", partial)?;
    file.sync_all()
        .await
        .fs_context("syncing partial download", partial)
}

fn validators_of(response: &Response) -> Validators {
    let get = |name: HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    Validators {
        etag: get(header::ETAG),
        last_modified: get(header::LAST_MODIFIED),
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Parse `Name: value` header lines.
pub fn parse_headers(lines: &[String]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for line in lines.iter().filter(|l| !l.trim().is_empty()) {
        let invalid = |reason: String| ConfigError::InvalidHeader {
            header: line.clone(),
            reason,
        };
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| invalid("expected `Name: value`".to_string()))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| invalid(e.to_string()))?;
        let value = HeaderValue::from_str(value.trim()).map_err(|e| invalid(e.to_string()))?;
        headers.append(name, value);
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_authorization_header() {
        let headers = parse_headers(&["Authorization: Basic dXNlcjpwYXNz".to_string()]).unwrap();
        assert_eq!(
            headers.get(header::AUTHORIZATION).unwrap(),
            "Basic dXNlcjpwYXNz"
        );
    }

    #[test]
    fn rejects_malformed_header() {
        let err = parse_headers(&["Basic dXNlcjpwYXNz".to_string()]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert!(parse_headers(&["".to_string(), "  ".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn partial_sits_next_to_destination() {
        assert_eq!(
            partial_path(Path::new("/cache/downloads/a b.dmg")),
            PathBuf::from("/cache/downloads/a b.dmg.partial")
        );
    }
}
