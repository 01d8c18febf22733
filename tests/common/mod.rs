//! Shared utilities for integration testing: module trees on disk and
//! in-process requests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use modhost::config::HostConfig;
use modhost::lifecycle;
use modhost::HostServer;

/// A host home directory with a `modules/` tree and a wiring file.
pub struct Site {
    dir: TempDir,
}

impl Site {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("modules")).unwrap();
        fs::write(dir.path().join("modules.properties"), "").unwrap();
        Self { dir }
    }

    pub fn home(&self) -> &Path {
        self.dir.path()
    }

    /// Create module `name` with the given descriptor text.
    pub fn module(&self, name: &str, descriptor: &str) -> &Self {
        let marker = self.module_dir(name).join("MOD-INF");
        fs::create_dir_all(&marker).unwrap();
        fs::write(marker.join("module.properties"), descriptor).unwrap();
        self
    }

    /// Write `contents` at `path` inside module `name`.
    pub fn file(&self, name: &str, path: &str, contents: &str) -> &Self {
        let file = self.module_dir(name).join(path);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, contents).unwrap();
        self
    }

    pub fn wirings(&self, text: &str) -> &Self {
        fs::write(self.home().join("modules.properties"), text).unwrap();
        self
    }

    pub fn module_dir(&self, name: &str) -> PathBuf {
        self.home().join("modules").join(name)
    }

    /// Default configuration anchored at this site.
    pub fn config(&self) -> HostConfig {
        HostConfig {
            home: Some(self.home().to_path_buf()),
            ..HostConfig::default()
        }
    }
}

/// A server whose first configuration pass has already been published.
pub async fn ready_server(config: HostConfig) -> HostServer {
    let server = HostServer::new(config.clone());
    lifecycle::reconfigure(&server.snapshot(), config).await;
    server
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Send `GET uri` with extra headers through the router in-process.
pub async fn get(router: &Router, uri: &str, headers: &[(&str, &str)]) -> TestResponse {
    let mut request = Request::builder().uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = router
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}
