//! Module resource serving.
//!
//! # Responsibilities
//! - Map a module-relative path to what gets served (text, binary, 403, 404)
//! - Find the file in the module directory or up its extension chain
//! - Stream the file, rewriting links in text resources
//!
//! # Design Decisions
//! - Files are streamed in fixed-size chunks; nothing is read whole
//! - Text passes through one `LinkRewriter` per response
//! - `..` components are refused, so lookups stay inside module directories
//! - Lookups stat files, so they run on the blocking pool

use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::stream::{self, Stream};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::http::response;
use crate::modules::{Application, ModuleGraph};
use crate::rewrite::{LinkRewriter, ModuleLinks};

const CHUNK_SIZE: usize = 8 * 1024;

/// What a module-relative path is served as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// UTF-8 text passed through the link rewriter.
    Text { resource: String, content_type: &'static str },
    Binary { resource: String, content_type: &'static str },
    Forbidden,
    NotFound,
}

/// Classify `path` (relative to the module's mount point).
pub fn disposition(path: &str, marker: &str) -> Disposition {
    if path.split('/').any(|segment| segment == marker) {
        return Disposition::Forbidden;
    }

    if path.is_empty() || path.ends_with('/') {
        return Disposition::Text {
            resource: format!("{path}index.html"),
            content_type: "text/html; charset=utf-8",
        };
    }

    let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    let text = |content_type| Disposition::Text {
        resource: path.to_string(),
        content_type,
    };
    let binary = |content_type| Disposition::Binary {
        resource: path.to_string(),
        content_type,
    };
    match extension {
        "js" => text("text/javascript; charset=utf-8"),
        "css" => text("text/css; charset=utf-8"),
        "html" => text("text/html; charset=utf-8"),
        "xml" => text("application/xml; charset=utf-8"),
        "jpg" => binary("image/jpeg"),
        "gif" => binary("image/gif"),
        "png" => binary("image/png"),
        _ => Disposition::NotFound,
    }
}

/// Locate `resource` for module `module`.
///
/// Looks in the module directory first, then in each extended module's.
/// `@@name@@` skips the module itself and starts at its parent.
pub fn find_resource(graph: &ModuleGraph, module: &str, resource: &str) -> Option<PathBuf> {
    let (resource, skip) = match resource.strip_prefix("@@").and_then(|r| r.strip_suffix("@@")) {
        Some(inner) => (inner, 1),
        None => (resource, 0),
    };
    let resource = Path::new(resource.trim_start_matches('/'));
    if !resource.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir)) {
        tracing::debug!(resource = %resource.display(), "Refusing resource outside the module");
        return None;
    }

    graph
        .extension_chain(module)
        .skip(skip)
        .map(|m| m.path().join(resource))
        .find(|candidate| candidate.is_file())
}

/// Serve `path` (relative to the mount point) from module `module`.
///
/// `base_url` prefixes rewritten links; it is the context path the client
/// sees.
pub async fn process(app: Arc<Application>, module: &str, path: &str, base_url: &str, marker: &str) -> Response {
    let (resource, content_type, rewrite) = match disposition(path, marker) {
        Disposition::Forbidden => return response::forbidden(path),
        Disposition::NotFound => return response::not_found(path),
        Disposition::Text { resource, content_type } => (resource, content_type, true),
        Disposition::Binary { resource, content_type } => (resource, content_type, false),
    };

    let lookup = {
        let app = app.clone();
        let module = module.to_string();
        let resource = resource.clone();
        tokio::task::spawn_blocking(move || find_resource(app.graph(), &module, &resource)).await
    };
    let file_path = match lookup {
        Ok(Some(file_path)) => file_path,
        Ok(None) => {
            tracing::debug!(module = %module, resource = %resource, "Resource not found");
            return response::not_found(path);
        }
        Err(e) => {
            tracing::warn!(module = %module, resource = %resource, error = %e, "Resource lookup aborted");
            return response::not_found(path);
        }
    };

    let file = match File::open(&file_path).await {
        Ok(file) => file,
        Err(e) => {
            tracing::warn!(path = %file_path.display(), error = %e, "Failed to open resource");
            return response::not_found(path);
        }
    };

    tracing::trace!(module = %module, path = %file_path.display(), rewrite, "Sending resource");
    let body = if rewrite {
        let links = ModuleLinks::new(app.clone(), module);
        let rewriter = LinkRewriter::new(Vec::with_capacity(CHUNK_SIZE), links).with_base_url(base_url);
        Body::from_stream(rewritten_chunks(file, rewriter))
    } else {
        Body::from_stream(file_chunks(file))
    };

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static(content_type))],
        body,
    )
        .into_response()
}

fn file_chunks(file: File) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    stream::unfold(Some(file), |file| async move {
        let mut file = file?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        match file.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some(file)))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error while streaming resource");
                Some((Err(e), None))
            }
        }
    })
}

struct Rewriting {
    file: File,
    rewriter: LinkRewriter<Vec<u8>, ModuleLinks>,
}

fn rewritten_chunks(file: File, rewriter: LinkRewriter<Vec<u8>, ModuleLinks>) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    stream::unfold(Some(Rewriting { file, rewriter }), |state| async move {
        let mut state = state?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let read = match state.file.read(&mut buf).await {
                Ok(read) => read,
                Err(e) => {
                    tracing::warn!(error = %e, "Error while streaming resource");
                    return Some((Err(e), None));
                }
            };

            if read == 0 {
                return match state.rewriter.finish() {
                    Ok(rest) if rest.is_empty() => None,
                    Ok(rest) => Some((Ok(Bytes::from(rest)), None)),
                    Err(e) => Some((Err(e), None)),
                };
            }

            if let Err(e) = state.rewriter.write_all(&buf[..read]) {
                return Some((Err(e), None));
            }
            // Empty when the whole chunk is a partial token held back.
            let out = std::mem::take(state.rewriter.get_mut());
            if !out.is_empty() {
                return Some((Ok(Bytes::from(out)), Some(state)));
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::Module;
    use std::fs;

    fn write(root: &Path, path: &str, contents: &str) {
        let file = root.join(path);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, contents).unwrap();
    }

    /// `child` extends `base`; both directories live under `root`.
    fn graph(root: &Path) -> ModuleGraph {
        let mut graph = ModuleGraph::new();
        let mut base = Module::new("base", root.join("base"));
        base.extended_by.insert("child".into());
        graph.insert(base);
        let mut child = Module::new("child", root.join("child"));
        child.extends = Some("base".into());
        graph.insert(child);
        graph
    }

    #[test]
    fn test_find_resource_up_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "base/index.html", "base");
        write(dir.path(), "base/shared.css", "shared");
        write(dir.path(), "child/index.html", "child");
        let graph = graph(dir.path());

        assert_eq!(
            find_resource(&graph, "child", "index.html"),
            Some(dir.path().join("child/index.html"))
        );
        assert_eq!(
            find_resource(&graph, "child", "shared.css"),
            Some(dir.path().join("base/shared.css"))
        );
        assert_eq!(find_resource(&graph, "base", "missing.css"), None);
        assert_eq!(find_resource(&graph, "unknown", "index.html"), None);
    }

    #[test]
    fn test_find_resource_parent_marker() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "base/index.html", "base");
        write(dir.path(), "child/index.html", "child");
        let graph = graph(dir.path());

        assert_eq!(
            find_resource(&graph, "child", "@@index.html@@"),
            Some(dir.path().join("base/index.html"))
        );
        assert_eq!(find_resource(&graph, "base", "@@index.html@@"), None);
    }

    #[test]
    fn test_find_resource_stays_inside_modules() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "base/index.html", "base");
        write(dir.path(), "secret.html", "secret");
        let graph = graph(dir.path());

        assert_eq!(find_resource(&graph, "base", "../secret.html"), None);
        assert_eq!(find_resource(&graph, "base", "a/../../secret.html"), None);
        // Directories are never served as resources.
        write(dir.path(), "base/dir.html/inner", "x");
        assert_eq!(find_resource(&graph, "base", "dir.html"), None);
    }

    #[test]
    fn test_disposition() {
        let text = |resource: &str, content_type| Disposition::Text {
            resource: resource.to_string(),
            content_type,
        };
        assert_eq!(disposition("", "MOD-INF"), text("index.html", "text/html; charset=utf-8"));
        assert_eq!(disposition("docs/", "MOD-INF"), text("docs/index.html", "text/html; charset=utf-8"));
        assert_eq!(disposition("app.js", "MOD-INF"), text("app.js", "text/javascript; charset=utf-8"));
        assert_eq!(disposition("feed.xml", "MOD-INF"), text("feed.xml", "application/xml; charset=utf-8"));
        assert_eq!(
            disposition("img/logo.png", "MOD-INF"),
            Disposition::Binary {
                resource: "img/logo.png".into(),
                content_type: "image/png"
            }
        );
        assert_eq!(disposition("MOD-INF/module.properties", "MOD-INF"), Disposition::Forbidden);
        assert_eq!(disposition("a/MOD-INF/x.html", "MOD-INF"), Disposition::Forbidden);
        assert_eq!(disposition("archive.zip", "MOD-INF"), Disposition::NotFound);
        assert_eq!(disposition("README", "MOD-INF"), Disposition::NotFound);
    }
}
