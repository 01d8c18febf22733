//! Zones: named virtual routing contexts.
//!
//! A zone is declared either as an absolute URL (`http://foo.com/main/`, used
//! behind rewriting proxies) or as a bare context path (`/main/`). The `prefix`
//! is the `scheme://host[:port]` part, empty for path-only zones; `full` is
//! `prefix + path` and is the key requests are matched against.

use std::fmt;

use url::Url;

use crate::error::{WiringError, WiringResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    name: String,
    path: String,
    prefix: String,
    full: String,
}

impl Zone {
    /// Create a zone from an absolute URL or a context path.
    pub fn new(name: impl Into<String>, zone_path: &str) -> WiringResult<Self> {
        let name = name.into();

        let (prefix, raw_path) = match zone_path.find("://") {
            Some(index) if index > 0 => {
                let url = Url::parse(zone_path).map_err(|source| WiringError::MalformedZone {
                    zone: name.clone(),
                    url: zone_path.to_string(),
                    source,
                })?;
                let mut prefix = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
                if let Some(port) = url.port() {
                    prefix.push(':');
                    prefix.push_str(&port.to_string());
                }
                (prefix, url.path().to_string())
            }
            _ => (String::new(), zone_path.to_string()),
        };

        let mut path = if raw_path.starts_with('/') {
            raw_path
        } else {
            format!("/{raw_path}")
        };
        if path.ends_with('/') {
            path.pop();
        }

        let full = format!("{prefix}{path}");
        Ok(Self {
            name,
            path,
            prefix,
            full,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Context path without trailing slash (`""` for a root context).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn full(&self) -> &str {
        &self.full
    }

    pub fn is_absolute(&self) -> bool {
        !self.prefix.is_empty()
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}
