//! Request classification.
//!
//! [`route`] picks exactly one [`HandlerKind`] per request. First match
//! wins:
//!
//! 1. `Upgrade: websocket` (any case) → [`HandlerKind::WebSocket`], any path.
//! 2. decoded path `/` → [`HandlerKind::Root`].
//! 3. an existing file under the asset root → [`HandlerKind::Asset`].
//! 4. anything else → [`HandlerKind::NotFound`].
//!
//! A path that cannot be decoded yields [`HandlerKind::BadRequest`];
//! routing itself never fails.

use std::path::{Component, Path, PathBuf};

use axum::http::header::UPGRADE;
use axum::http::{HeaderMap, Request};

use crate::error::StatusError;

/// Handler chosen for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerKind {
    /// Upgrade to a WebSocket session.
    WebSocket,
    /// Render the dashboard page.
    Root,
    /// Serve the resolved file.
    Asset(PathBuf),
    /// Respond 404.
    NotFound,
    /// Respond 400.
    BadRequest,
}

/// Directory the dashboard page and its static assets live in.
///
/// Lookups never leave this directory: parent segments are rejected and
/// the canonical target must stay below the canonical root, which also
/// defeats symlinks pointing outside.
#[derive(Debug, Clone)]
pub struct AssetRoot {
    root: PathBuf,
}

impl AssetRoot {
    /// Creates an asset root. The directory does not have to exist yet.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the configured directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Location of the root page template.
    #[must_use]
    pub fn index_page(&self) -> PathBuf {
        self.root.join("index.html")
    }

    /// Maps a decoded request path onto an existing regular file inside the
    /// root. Any filesystem error counts as "not found".
    #[must_use]
    pub fn resolve(&self, decoded_path: &str) -> Option<PathBuf> {
        let mut candidate = self.root.clone();
        let mut depth = 0usize;

        for segment in decoded_path.split('/') {
            if segment.is_empty() || segment == "." {
                continue;
            }
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => {
                    candidate.push(part);
                    depth += 1;
                }
                _ => return None,
            }
        }

        if depth == 0 {
            return None;
        }

        let canonical_root = std::fs::canonicalize(&self.root).ok()?;
        let canonical = std::fs::canonicalize(&candidate).ok()?;
        if !canonical.starts_with(&canonical_root) {
            tracing::warn!(path = %decoded_path, "asset lookup escaped the asset root");
            return None;
        }

        std::fs::metadata(&canonical)
            .ok()
            .filter(std::fs::Metadata::is_file)
            .map(|_| canonical)
    }
}

/// Classifies `request`.
pub fn route<B>(request: &Request<B>, assets: &AssetRoot) -> HandlerKind {
    if is_websocket_upgrade(request.headers()) {
        return HandlerKind::WebSocket;
    }

    tracing::debug!(uri = %request.uri(), "request");

    let path = match decode_path(request.uri().path()) {
        Ok(path) => path,
        Err(err) => {
            tracing::debug!(uri = %request.uri(), error = %err, "rejecting request");
            return HandlerKind::BadRequest;
        }
    };

    if path == "/" {
        return HandlerKind::Root;
    }

    match assets.resolve(&path) {
        Some(file) => HandlerKind::Asset(file),
        None => HandlerKind::NotFound,
    }
}

/// Returns `true` if the `Upgrade` header equals `websocket`, ignoring case.
#[must_use]
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(UPGRADE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("websocket"))
}

/// Percent-decodes a request path.
///
/// # Errors
///
/// Returns [`StatusError::BadRequest`] for a `%` not followed by two hex
/// digits, decoded bytes that are not UTF-8, or an embedded NUL.
pub fn decode_path(raw: &str) -> Result<String, StatusError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while let Some(&byte) = bytes.get(i) {
        if byte == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                return Err(StatusError::BadRequest(format!(
                    "malformed percent escape at byte {i}"
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let decoded = urlencoding::decode(raw)
        .map_err(|_| StatusError::BadRequest("path is not valid UTF-8".to_string()))?;
    if decoded.contains('\0') {
        return Err(StatusError::BadRequest("path contains NUL".to_string()));
    }
    Ok(decoded.into_owned())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn public_dir() -> (TempDir, AssetRoot) {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("temp dir");
        };
        let public = dir.path().join("public");
        let written = fs::create_dir_all(public.join("js"))
            .and_then(|()| fs::write(public.join("style.css"), "body {}"))
            .and_then(|()| fs::write(public.join("js").join("app.js"), "// app"))
            .and_then(|()| fs::write(public.join("index.html"), "<title>%title%</title>"))
            .and_then(|()| fs::write(dir.path().join("secret.txt"), "outside"));
        if written.is_err() {
            panic!("fixture files");
        }
        (dir, AssetRoot::new(public))
    }

    fn get(uri: &str) -> Request<()> {
        let Ok(request) = Request::builder().uri(uri).body(()) else {
            panic!("valid request for {uri}");
        };
        request
    }

    fn upgrade(uri: &str, value: &str) -> Request<()> {
        let Ok(request) = Request::builder()
            .uri(uri)
            .header(UPGRADE, value)
            .body(())
        else {
            panic!("valid request for {uri}");
        };
        request
    }

    #[test]
    fn root_path_selects_root() {
        let (_dir, assets) = public_dir();
        assert_eq!(route(&get("/"), &assets), HandlerKind::Root);
        assert_eq!(route(&get("/?refresh=1"), &assets), HandlerKind::Root);
    }

    #[test]
    fn existing_asset_selects_asset() {
        let (_dir, assets) = public_dir();
        let HandlerKind::Asset(file) = route(&get("/style.css"), &assets) else {
            panic!("style.css exists");
        };
        assert!(file.ends_with("style.css"));

        assert!(matches!(route(&get("/js/app.js"), &assets), HandlerKind::Asset(_)));
        assert!(matches!(route(&get("/js/%61pp.js"), &assets), HandlerKind::Asset(_)));
    }

    #[test]
    fn missing_asset_selects_not_found() {
        let (_dir, assets) = public_dir();
        assert_eq!(route(&get("/missing.xyz"), &assets), HandlerKind::NotFound);
        assert_eq!(route(&get("/js"), &assets), HandlerKind::NotFound);
    }

    #[test]
    fn upgrade_header_wins_regardless_of_path() {
        let (_dir, assets) = public_dir();
        for uri in ["/missing.xyz", "/", "/style.css", "/%zz"] {
            assert_eq!(route(&upgrade(uri, "WebSocket"), &assets), HandlerKind::WebSocket);
        }
        assert_eq!(route(&upgrade("/", "websocket"), &assets), HandlerKind::WebSocket);
        assert_eq!(route(&upgrade("/", "WEBSOCKET"), &assets), HandlerKind::WebSocket);
    }

    #[test]
    fn other_upgrade_values_are_ignored() {
        let (_dir, assets) = public_dir();
        assert_eq!(route(&upgrade("/", "h2c"), &assets), HandlerKind::Root);
        assert_eq!(route(&upgrade("/missing.xyz", "websockets"), &assets), HandlerKind::NotFound);
    }

    #[test]
    fn malformed_path_selects_bad_request() {
        let (_dir, assets) = public_dir();
        assert_eq!(route(&get("/%zz"), &assets), HandlerKind::BadRequest);
        assert_eq!(route(&get("/style%2"), &assets), HandlerKind::BadRequest);
        assert_eq!(route(&get("/%FF%FE"), &assets), HandlerKind::BadRequest);
        assert_eq!(route(&get("/a%00b"), &assets), HandlerKind::BadRequest);
    }

    #[test]
    fn traversal_never_leaves_the_root() {
        let (_dir, assets) = public_dir();
        assert_eq!(route(&get("/../secret.txt"), &assets), HandlerKind::NotFound);
        assert_eq!(route(&get("/js/../../secret.txt"), &assets), HandlerKind::NotFound);
        assert_eq!(route(&get("/%2e%2e/secret.txt"), &assets), HandlerKind::NotFound);
        assert_eq!(route(&get("/..%2fsecret.txt"), &assets), HandlerKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_out_of_root_is_not_served() {
        let (dir, assets) = public_dir();
        let link = assets.path().join("leak.txt");
        if std::os::unix::fs::symlink(dir.path().join("secret.txt"), &link).is_err() {
            panic!("symlink");
        }
        assert_eq!(route(&get("/leak.txt"), &assets), HandlerKind::NotFound);
    }

    #[test]
    fn missing_root_resolves_nothing() {
        let assets = AssetRoot::new("/definitely/not/a/real/asset/root");
        assert_eq!(route(&get("/style.css"), &assets), HandlerKind::NotFound);
    }

    #[test]
    fn decode_path_handles_escapes() {
        let Ok(path) = decode_path("/a%20b/c.css") else {
            panic!("valid escape");
        };
        assert_eq!(path, "/a b/c.css");
        assert!(decode_path("/100%").is_err());
    }
}
