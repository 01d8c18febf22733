//! Host-generated responses.
//!
//! # Responsibilities
//! - Status pages: initializing (503), configuration failure (500),
//!   not found (404), forbidden (403)
//! - The routing cookie sticky load balancers key on
//!
//! # Design Decisions
//! - Pages are small inline HTML; nothing here touches module content
//! - Error text is HTML-escaped before it reaches a page

use std::error::Error as _;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::error::WiringError;

/// Name of the routing cookie.
pub const ROUTING_COOKIE: &str = "host";

/// Seconds before the initializing page reloads itself.
const REFRESH_SECS: u32 = 3;

/// Served until the first configuration pass completes.
pub fn initializing_page() -> Response {
    let body = format!(
        "<html><head><meta http-equiv=\"refresh\" content=\"{REFRESH_SECS}\"><title>Initializing</title></head>\
         <body><h1>Initializing</h1><p>The modules are being wired. This page will reload shortly.</p></body></html>"
    );
    let mut response = (StatusCode::SERVICE_UNAVAILABLE, Html(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(REFRESH_SECS));
    response
}

/// Served while the last configuration pass is failed.
pub fn error_page(error: &WiringError) -> Response {
    let mut chain = format!("<li>{}</li>", escape(&error.to_string()));
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(&format!("<li>{}</li>", escape(&cause.to_string())));
        source = cause.source();
    }
    let body = format!(
        "<html><head><title>Configuration error</title></head>\
         <body><h1>Configuration error</h1><p>The modules could not be wired:</p><ul>{chain}</ul></body></html>"
    );
    (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
}

pub fn not_found(path: &str) -> Response {
    let body = format!(
        "<html><head><title>Not found</title></head><body><h1>Not found</h1><p>{}</p></body></html>",
        escape(path)
    );
    (StatusCode::NOT_FOUND, Html(body)).into_response()
}

pub fn forbidden(path: &str) -> Response {
    let body = format!(
        "<html><head><title>Forbidden</title></head><body><h1>Forbidden</h1><p>{}</p></body></html>",
        escape(path)
    );
    (StatusCode::FORBIDDEN, Html(body)).into_response()
}

/// `Set-Cookie` value for the routing cookie of host `name`. The leading dot
/// in the value is what balancers expect.
pub fn routing_cookie(name: &str, max_age_secs: Option<u64>) -> Option<HeaderValue> {
    let mut cookie = format!("{ROUTING_COOKIE}=.{name}; Path=/");
    if let Some(max_age) = max_age_secs {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    HeaderValue::from_str(&cookie).ok()
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_cookie() {
        assert_eq!(routing_cookie("site", None).unwrap(), "host=.site; Path=/");
        assert_eq!(routing_cookie("site", Some(60)).unwrap(), "host=.site; Path=/; Max-Age=60");
        assert!(routing_cookie("bad\nname", None).is_none());
    }

    #[test]
    fn test_status_pages() {
        assert_eq!(initializing_page().status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error_page(&WiringError::NoRootModule).status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(not_found("/x").status(), StatusCode::NOT_FOUND);
        assert_eq!(forbidden("/x").status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
