//! Routing view of an incoming request.
//!
//! # Responsibilities
//! - Capture the request fields routing depends on (path, scheme, host)
//! - Resolve the "true" host and context path a client sees when the host
//!   sits behind a rewriting proxy (`X-Forwarded-Host`, `X-Context-Path`)
//! - Expose cookies for the routing cookie check

use std::str::Utf8Error;

use axum::http::{header, request::Parts, HeaderMap};
use percent_encoding::percent_decode_str;

/// Header carrying the externally visible host (comma list, last one wins).
pub const HOST_HEADER: &str = "x-forwarded-host";

/// Header carrying the externally visible context path.
pub const CONTEXT_HEADER: &str = "x-context-path";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub scheme: String,
    pub server_name: String,
    pub server_port: u16,
    /// Request path relative to the host's own context path.
    pub path: String,
    /// The host's own context path (`""` when served at the root).
    pub context_path: String,
    pub forwarded_host: Option<String>,
    pub context_header: Option<String>,
    pub cookie_header: Option<String>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            server_name: "localhost".to_string(),
            server_port: 80,
            path: "/".to_string(),
            context_path: String::new(),
            forwarded_host: None,
            context_header: None,
            cookie_header: None,
        }
    }
}

impl RequestContext {
    /// Build the routing view from HTTP request parts.
    ///
    /// The path is percent-decoded before the context path is stripped.
    /// Fails when the decoded path isn't UTF-8.
    pub fn from_parts(parts: &Parts, context_path: &str) -> Result<Self, Utf8Error> {
        let scheme = parts.uri.scheme_str().unwrap_or("http").to_string();
        let default_port = if scheme == "https" { 443 } else { 80 };

        let authority = header_str(&parts.headers, header::HOST.as_str())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());
        let (server_name, server_port) = split_authority(&authority, default_port);

        let decoded = percent_decode_str(parts.uri.path()).decode_utf8()?;
        let full_path = decoded.as_ref();
        let path = match full_path.strip_prefix(context_path) {
            Some(rest) if !context_path.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
            _ => full_path,
        };
        let path = if path.is_empty() { "/" } else { path };

        Ok(Self {
            scheme,
            server_name,
            server_port,
            path: path.to_string(),
            context_path: context_path.to_string(),
            forwarded_host: header_str(&parts.headers, HOST_HEADER).map(str::to_string),
            context_header: header_str(&parts.headers, CONTEXT_HEADER).map(str::to_string),
            cookie_header: header_str(&parts.headers, header::COOKIE.as_str()).map(str::to_string),
        })
    }

    pub fn has_context_header(&self) -> bool {
        self.context_header.is_some()
    }

    /// The host a proxy forwarded for, if any.
    pub fn true_host(&self) -> Option<&str> {
        self.forwarded_host
            .as_deref()
            .and_then(|hosts| hosts.split(',').last())
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }

    /// `scheme://host[:port]` as the client sees it. Default ports are omitted.
    pub fn full_host(&self) -> String {
        match self.true_host() {
            Some(host) => format!("{}://{}", self.scheme, host),
            None => {
                let default_port = matches!(
                    (self.scheme.as_str(), self.server_port),
                    ("http", 80) | ("https", 443)
                );
                if default_port {
                    format!("{}://{}", self.scheme, self.server_name)
                } else {
                    format!("{}://{}:{}", self.scheme, self.server_name, self.server_port)
                }
            }
        }
    }

    /// Context path as the client sees it, without trailing slash.
    /// With `absolute`, prefixed by [`full_host`](Self::full_host).
    pub fn true_context_path(&self, absolute: bool) -> String {
        let context = match self.context_header.as_deref() {
            Some(header) => header.strip_suffix('/').unwrap_or(header),
            None => self.context_path.as_str(),
        };
        if absolute {
            format!("{}{}", self.full_host(), context)
        } else {
            context.to_string()
        }
    }

    /// Value of the named cookie, if the request carries it.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        cookie_value(self.cookie_header.as_deref()?, name)
    }
}

/// Value of cookie `name` in a `Cookie` header value.
pub fn cookie_value<'a>(cookies: &'a str, name: &str) -> Option<&'a str> {
    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name).then(|| value.trim())
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn split_authority(authority: &str, default_port: u16) -> (String, u16) {
    // Bracketed IPv6 literals keep their colons.
    if let Some(end) = authority.rfind(']') {
        let port = authority[end + 1..]
            .strip_prefix(':')
            .and_then(|p| p.parse().ok())
            .unwrap_or(default_port);
        return (authority[..=end].to_string(), port);
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (authority.to_string(), default_port),
        },
        None => (authority.to_string(), default_port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_from_parts_reads_host_and_path() {
        let ctx = RequestContext::from_parts(&parts("/blah/index.html", &[("host", "example.com:8080")]), "").unwrap();
        assert_eq!(ctx.server_name, "example.com");
        assert_eq!(ctx.server_port, 8080);
        assert_eq!(ctx.path, "/blah/index.html");
        assert_eq!(ctx.full_host(), "http://example.com:8080");
    }

    #[test]
    fn test_context_path_is_stripped() {
        let ctx = RequestContext::from_parts(&parts("/app/blah/", &[("host", "localhost")]), "/app").unwrap();
        assert_eq!(ctx.path, "/blah/");
        assert_eq!(ctx.true_context_path(false), "/app");
        assert_eq!(ctx.true_context_path(true), "http://localhost/app");
    }

    #[test]
    fn test_forwarded_headers_win() {
        let ctx = RequestContext::from_parts(
            &parts(
                "/index.html",
                &[
                    ("host", "localhost:8080"),
                    ("x-forwarded-host", "proxy.internal, foo.com"),
                    ("x-context-path", "/main/"),
                ],
            ),
            "",
        )
        .unwrap();
        assert_eq!(ctx.true_host(), Some("foo.com"));
        assert_eq!(ctx.true_context_path(false), "/main");
        assert_eq!(ctx.true_context_path(true), "http://foo.com/main");
    }

    #[test]
    fn test_path_is_percent_decoded() {
        let ctx = RequestContext::from_parts(&parts("/app/my%20docs/caf%C3%A9.html", &[]), "/app").unwrap();
        assert_eq!(ctx.path, "/my docs/café.html");

        // Decoding happens before the context path is matched.
        let ctx = RequestContext::from_parts(&parts("/%61pp/x.html", &[]), "/app").unwrap();
        assert_eq!(ctx.path, "/x.html");

        assert!(RequestContext::from_parts(&parts("/bad%FF.html", &[]), "").is_err());
    }

    #[test]
    fn test_cookie_lookup() {
        let ctx = RequestContext::from_parts(&parts("/", &[("cookie", "a=1; host=.modhost")]), "").unwrap();
        assert_eq!(ctx.cookie("host"), Some(".modhost"));
        assert_eq!(ctx.cookie("missing"), None);
    }

    #[test]
    fn test_split_authority_ipv6() {
        assert_eq!(split_authority("[::1]:9000", 80), ("[::1]".to_string(), 9000));
        assert_eq!(split_authority("[::1]", 80), ("[::1]".to_string(), 80));
    }
}
