//! Local file overrides.
//!
//! A request path maps onto `<root>/<path>`. The joined path is normalized
//! lexically and must stay under the root before the filesystem is touched
//! at all. The root prefix is compared byte-for-byte; only the part below it
//! keeps whatever case the request used.

use std::io;
use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::response::Response;
use futures_util::TryStreamExt;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::config::OverridesConfig;
use crate::http::error::ProxyError;

const CHUNK_SIZE: usize = 64 * 1024;

/// Maps request paths onto files under a fixed root.
#[derive(Debug, Clone)]
pub struct OverrideResolver {
    root: PathBuf,
}

/// An existing regular file that satisfies a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideFile {
    pub path: PathBuf,
    pub len: u64,
}

impl OverrideResolver {
    /// `root` should be absolute; it is normalized here.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: normalize(root.as_ref()),
        }
    }

    /// Root from config, relative to the working directory.
    pub fn from_config(config: &OverridesConfig) -> io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?.join(&config.directory)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for `request_path`, or `PathTraversal` if it leaves the root.
    pub fn sanitize(&self, request_path: &str) -> Result<PathBuf, ProxyError> {
        let joined = self.root.join(request_path.trim_start_matches('/'));
        let cleaned = normalize(&joined);

        // Component-wise and case-sensitive: `../OVERRIDES` is a sibling
        // directory on most filesystems, not the root.
        if cleaned.starts_with(&self.root) {
            Ok(cleaned)
        } else {
            Err(ProxyError::PathTraversal(request_path.to_string()))
        }
    }

    /// Look up an override. Missing paths and directories are a miss.
    pub async fn resolve(&self, request_path: &str) -> Result<Option<OverrideFile>, ProxyError> {
        let path = self.sanitize(request_path)?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => Ok(None),
            Ok(meta) => Ok(Some(OverrideFile {
                path,
                len: meta.len(),
            })),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ProxyError::OverrideIo { path, source }),
        }
    }
}

impl OverrideFile {
    /// Stream the file in bounded chunks.
    pub async fn into_response(self) -> Result<Response, ProxyError> {
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(source) => {
                return Err(ProxyError::OverrideIo {
                    path: self.path,
                    source,
                })
            }
        };

        tracing::debug!(path = %self.path.display(), bytes = self.len, "Serving override");

        let path = self.path;
        let stream = ReaderStream::with_capacity(file, CHUNK_SIZE).inspect_err(move |e| {
            tracing::warn!(path = %path.display(), error = %e, "Override stream aborted");
        });

        let mut response = Response::new(Body::from_stream(stream));
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(self.len));
        Ok(response)
    }
}

/// Lexical cleanup: drop `.`, resolve `..` against what precedes it.
/// `..` at the filesystem root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_sanitize_inside_root() {
        let resolver = OverrideResolver::new("/srv/proxy/overrides");
        assert_eq!(
            resolver.sanitize("/images/logo.png").unwrap(),
            PathBuf::from("/srv/proxy/overrides/images/logo.png")
        );
        assert_eq!(
            resolver.sanitize("/a/./b/../logo.png").unwrap(),
            PathBuf::from("/srv/proxy/overrides/a/logo.png")
        );
        assert_eq!(
            resolver.sanitize("/").unwrap(),
            PathBuf::from("/srv/proxy/overrides")
        );
    }

    #[test]
    fn test_sanitize_keeps_request_case() {
        let resolver = OverrideResolver::new("/srv/Proxy/overrides");
        assert_eq!(
            resolver.sanitize("/Logo.PNG").unwrap(),
            PathBuf::from("/srv/Proxy/overrides/Logo.PNG")
        );
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        let resolver = OverrideResolver::new("/srv/proxy/overrides");
        for path in [
            "/../main.rs",
            "/a/../../secret",
            "/../overrides-private/key",
            "/../../../../etc/passwd",
        ] {
            assert!(
                matches!(resolver.sanitize(path), Err(ProxyError::PathTraversal(_))),
                "{path} accepted"
            );
        }
    }

    #[test]
    fn test_sanitize_rejects_case_variant_of_root() {
        let resolver = OverrideResolver::new("/srv/Proxy/overrides");
        for path in [
            "/../OVERRIDES/secret.txt",
            "/../Overrides/secret.txt",
            "/../../proxy/overrides/secret.txt",
            "/../../PROXY/overrides",
        ] {
            assert!(
                matches!(resolver.sanitize(path), Err(ProxyError::PathTraversal(_))),
                "{path} accepted"
            );
        }
        assert_eq!(
            resolver.sanitize("/../overrides/Logo.png").unwrap(),
            PathBuf::from("/srv/Proxy/overrides/Logo.png")
        );
    }

    #[tokio::test]
    async fn test_resolve_refuses_sibling_with_folded_name() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("overrides");
        let sibling = parent.path().join("OVERRIDES");
        std::fs::create_dir(&root).unwrap();
        // Case-insensitive filesystems make these the same directory.
        if std::fs::create_dir(&sibling).is_ok() {
            std::fs::write(sibling.join("secret.txt"), "sibling secret").unwrap();
        }
        let resolver = OverrideResolver::new(&root);

        assert!(matches!(
            resolver.resolve("/../OVERRIDES/secret.txt").await,
            Err(ProxyError::PathTraversal(_))
        ));
    }

    #[test]
    fn test_encoded_dots_are_literal() {
        let resolver = OverrideResolver::new("/srv/proxy/overrides");
        assert!(resolver.sanitize("/%2e%2e/secret").is_ok());
    }

    #[tokio::test]
    async fn test_resolve_file_dir_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("static")).unwrap();
        std::fs::write(dir.path().join("static/logo.png"), b"png-bytes").unwrap();
        let resolver = OverrideResolver::new(dir.path());

        let file = resolver.resolve("/static/logo.png").await.unwrap().unwrap();
        assert_eq!(file.len, 9);

        assert_eq!(resolver.resolve("/static").await.unwrap(), None);
        assert_eq!(resolver.resolve("/missing.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_override_response_streams_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(dir.path().join("blob.bin"), &content).unwrap();
        let resolver = OverrideResolver::new(dir.path());

        let file = resolver.resolve("/blob.bin").await.unwrap().unwrap();
        let response = file.into_response().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "200000");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body.as_ref(), content.as_slice());
    }
}
