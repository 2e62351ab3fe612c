//! Target resolution.
//!
//! Turns a logical target (local file, local dev server, deployed URL) into
//! one absolute URI the browser can navigate to.

use crate::result::{HarnessError, HarnessResult};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Hosts accepted in the `host:PORT` shorthand
const LOCAL_HOSTS: [&str; 2] = ["localhost", "127.0.0.1"];

/// A logical navigation target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// File on the local filesystem
    LocalPath(PathBuf),
    /// Local dev server given as `localhost:PORT[/path]`
    LocalServer {
        /// Host name (`localhost` or `127.0.0.1`)
        host: String,
        /// TCP port
        port: u16,
        /// Request path, always starting with `/`
        path: String,
    },
    /// Absolute URL (`http`, `https` or `file`)
    Url(Url),
}

impl Target {
    /// Classify a raw target string
    ///
    /// # Errors
    ///
    /// Returns `InvalidTarget` for empty input, bad ports, malformed URLs
    /// and unsupported schemes.
    pub fn parse(input: &str) -> HarnessResult<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(HarnessError::invalid_target(input, "target is empty"));
        }

        if let Some(server) = Self::parse_local_server(raw)? {
            return Ok(server);
        }

        if raw.contains("://") {
            let url = Url::parse(raw)
                .map_err(|e| HarnessError::invalid_target(raw, format!("malformed URL: {e}")))?;
            return match url.scheme() {
                "http" | "https" => {
                    if url.host_str().map_or(true, str::is_empty) {
                        Err(HarnessError::invalid_target(raw, "URL has no host"))
                    } else {
                        Ok(Self::Url(url))
                    }
                }
                "file" => Ok(Self::Url(url)),
                other => Err(HarnessError::invalid_target(
                    raw,
                    format!("unsupported scheme '{other}'"),
                )),
            };
        }

        Ok(Self::LocalPath(PathBuf::from(raw)))
    }

    fn parse_local_server(raw: &str) -> HarnessResult<Option<Self>> {
        for host in LOCAL_HOSTS {
            let Some(rest) = raw
                .strip_prefix(host)
                .and_then(|rest| rest.strip_prefix(':'))
            else {
                continue;
            };

            let (port_str, suffix) = rest.split_at(rest.find(['/', '?', '#']).unwrap_or(rest.len()));
            let path = if suffix.starts_with('/') {
                suffix.to_string()
            } else {
                format!("/{suffix}")
            };
            let port: u16 = port_str.parse().map_err(|_| {
                HarnessError::invalid_target(raw, format!("'{port_str}' is not a valid port"))
            })?;
            if port == 0 {
                return Err(HarnessError::invalid_target(raw, "port 0 is not navigable"));
            }

            return Ok(Some(Self::LocalServer {
                host: host.to_string(),
                port,
                path,
            }));
        }
        Ok(None)
    }

    /// Produce the canonical absolute URI for this target
    ///
    /// # Errors
    ///
    /// Returns `InvalidTarget` if a local file does not exist.
    pub fn resolve(&self) -> HarnessResult<String> {
        match self {
            Self::LocalPath(path) => file_uri(path, &path.display().to_string()),
            Self::LocalServer { host, port, path } => Ok(format!("http://{host}:{port}{path}")),
            Self::Url(url) if url.scheme() == "file" => {
                let path = url.to_file_path().map_err(|()| {
                    HarnessError::invalid_target(url.as_str(), "file URL has no local path")
                })?;
                file_uri(&path, url.as_str())
            }
            Self::Url(url) => Ok(url.to_string()),
        }
    }

    /// Whether this target is served by a local dev server
    #[must_use]
    pub const fn is_local_server(&self) -> bool {
        matches!(self, Self::LocalServer { .. })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalPath(path) => write!(f, "{}", path.display()),
            Self::LocalServer { host, port, path } => write!(f, "{host}:{port}{path}"),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

fn file_uri(path: &Path, shown: &str) -> HarnessResult<String> {
    let canonical = path
        .canonicalize()
        .map_err(|e| HarnessError::invalid_target(shown, format!("path does not exist: {e}")))?;
    if !canonical.is_file() {
        return Err(HarnessError::invalid_target(shown, "path is not a file"));
    }
    Url::from_file_path(&canonical)
        .map(String::from)
        .map_err(|()| HarnessError::invalid_target(shown, "path cannot be expressed as a URI"))
}

/// Parse and resolve in one step
///
/// # Errors
///
/// See [`Target::parse`] and [`Target::resolve`].
pub fn resolve_target(input: &str) -> HarnessResult<String> {
    Target::parse(input)?.resolve()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_localhost_port() {
            let target = Target::parse("localhost:3000").unwrap();
            assert_eq!(
                target,
                Target::LocalServer {
                    host: "localhost".to_string(),
                    port: 3000,
                    path: "/".to_string()
                }
            );
            assert!(target.is_local_server());
        }

        #[test]
        fn test_localhost_port_with_path() {
            let target = Target::parse("127.0.0.1:7777/index.html").unwrap();
            assert_eq!(target.resolve().unwrap(), "http://127.0.0.1:7777/index.html");
        }

        #[test]
        fn test_localhost_port_with_query_or_fragment() {
            let query = Target::parse("localhost:3000?x=1").unwrap();
            assert_eq!(query.resolve().unwrap(), "http://localhost:3000/?x=1");

            let fragment = Target::parse("localhost:3000#top").unwrap();
            assert_eq!(
                fragment,
                Target::LocalServer {
                    host: "localhost".to_string(),
                    port: 3000,
                    path: "/#top".to_string()
                }
            );

            let both = Target::parse("127.0.0.1:8080/cart?id=7#reviews").unwrap();
            assert_eq!(both.resolve().unwrap(), "http://127.0.0.1:8080/cart?id=7#reviews");
        }

        #[test]
        fn test_bad_port_is_invalid() {
            let err = Target::parse("localhost:http").unwrap_err();
            assert!(matches!(err, HarnessError::InvalidTarget { .. }));
            let err = Target::parse("localhost:70000").unwrap_err();
            assert!(matches!(err, HarnessError::InvalidTarget { .. }));
            let err = Target::parse("localhost:0").unwrap_err();
            assert!(matches!(err, HarnessError::InvalidTarget { .. }));
        }

        #[test]
        fn test_absolute_url() {
            let target = Target::parse("https://example.com/drop").unwrap();
            assert_eq!(target.resolve().unwrap(), "https://example.com/drop");
        }

        #[test]
        fn test_malformed_url() {
            let err = Target::parse("http://").unwrap_err();
            assert!(matches!(err, HarnessError::InvalidTarget { .. }));
        }

        #[test]
        fn test_unsupported_scheme() {
            let err = Target::parse("ftp://example.com/file").unwrap_err();
            assert!(err.to_string().contains("unsupported scheme"));
        }

        #[test]
        fn test_empty_target() {
            assert!(Target::parse("   ").is_err());
        }

        #[test]
        fn test_bare_path_is_local() {
            let target = Target::parse("site/index.html").unwrap();
            assert_eq!(target, Target::LocalPath(PathBuf::from("site/index.html")));
        }
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_existing_file_becomes_file_uri() {
            let dir = TempDir::new().unwrap();
            let page = dir.path().join("fixture.html");
            fs::write(&page, "<html></html>").unwrap();

            let uri = resolve_target(page.to_str().unwrap()).unwrap();
            assert!(uri.starts_with("file://"));
            assert!(uri.ends_with("fixture.html"));
        }

        #[test]
        fn test_missing_file_is_invalid_target() {
            let dir = TempDir::new().unwrap();
            let missing = dir.path().join("nope.html");
            let err = resolve_target(missing.to_str().unwrap()).unwrap_err();
            assert!(matches!(err, HarnessError::InvalidTarget { .. }));
        }

        #[test]
        fn test_directory_is_not_a_page() {
            let dir = TempDir::new().unwrap();
            let err = resolve_target(dir.path().to_str().unwrap()).unwrap_err();
            assert!(err.to_string().contains("not a file"));
        }

        #[test]
        fn test_file_url_checked_for_existence() {
            let dir = TempDir::new().unwrap();
            let missing = dir.path().join("gone.html");
            let url = Url::from_file_path(&missing).unwrap();
            let err = resolve_target(url.as_str()).unwrap_err();
            assert!(matches!(err, HarnessError::InvalidTarget { .. }));
        }

        #[test]
        fn test_resolution_is_stable() {
            let dir = TempDir::new().unwrap();
            let page = dir.path().join("a.html");
            fs::write(&page, "").unwrap();
            let first = resolve_target(page.to_str().unwrap()).unwrap();
            let second = resolve_target(&first).unwrap();
            assert_eq!(first, second);
        }
    }
}
