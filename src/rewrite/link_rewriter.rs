//! Streaming link rewriter.
//!
//! Wraps an [`io::Write`] and replaces `[#name#]` and `[#name/#]` tokens with
//! the mount path of the module `name` resolves to. Text that cannot be part
//! of a token is forwarded in place; only a partial token is ever held back,
//! so the output is the same however the input is split across writes.
//!
//! ```text
//! Start --'['--> Opening --'#'--> Opened --'#'--> Closing --']'--> Closed --any--> substitute
//!                                   |
//!                                   '--'/'--> SelfClosing --'#'--> Closing --']'--> substitute
//! ```
//!
//! `[#name#]` becomes the mount path with its trailing slash, unless a `/`
//! follows the token, in which case the slash is dropped so `[#name#]/x`
//! doesn't double it. `[#name/#]` always drops it. Unresolved tokens are
//! written out unchanged.

use std::io::{self, Write};
use std::sync::Arc;

use crate::modules::Application;

/// Longest module name a token may carry. Longer runs are not tokens.
pub const MAX_NAME_LEN: usize = 256;

/// Resolves a module name referenced from content to its mount path.
pub trait LinkResolver {
    /// Mount path (with trailing `/`) of the module `name`, if any.
    fn resolve(&self, name: &str) -> Option<String>;
}

impl<F> LinkResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Resolves names the way module `module` sees them: its wired dependencies
/// first (up its extension chain), then the global module table.
#[derive(Debug, Clone)]
pub struct ModuleLinks {
    app: Arc<Application>,
    module: String,
}

impl ModuleLinks {
    pub fn new(app: Arc<Application>, module: impl Into<String>) -> Self {
        Self {
            app,
            module: module.into(),
        }
    }
}

impl LinkResolver for ModuleLinks {
    fn resolve(&self, name: &str) -> Option<String> {
        self.app
            .graph()
            .resolve(&self.module, name)
            .and_then(|m| m.mount_point())
            .map(|mp| mp.path().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Opening,
    Opened,
    SelfClosing,
    Closing { self_closing: bool },
    Closed,
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$' || byte >= 0x80
}

pub struct LinkRewriter<W, R> {
    inner: W,
    resolver: R,
    base_url: Option<String>,
    state: State,
    /// Bytes of the token being matched, starting at its `[`.
    pending: Vec<u8>,
    name_len: usize,
}

impl<W: Write, R: LinkResolver> LinkRewriter<W, R> {
    pub fn new(inner: W, resolver: R) -> Self {
        Self {
            inner,
            resolver,
            base_url: None,
            state: State::Start,
            pending: Vec::with_capacity(32),
            name_len: 0,
        }
    }

    /// Prefix every substituted mount path with `base_url`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into()).filter(|b| !b.is_empty());
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Direct access to the wrapped writer. Bytes of a partial token are not
    /// in it yet.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// End of input: settle any partial token and return the wrapped writer.
    ///
    /// A complete `[#name#]` with nothing after it resolves normally; any
    /// other partial token is written out literally.
    pub fn finish(mut self) -> io::Result<W> {
        match self.state {
            State::Start => {}
            State::Closed => self.substitute(false)?,
            _ => self.abandon()?,
        }
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn accept(&mut self, byte: u8, next: State) -> bool {
        self.pending.push(byte);
        self.state = next;
        true
    }

    /// Give up on the current token, forwarding what was held back.
    fn abandon(&mut self) -> io::Result<()> {
        self.inner.write_all(&self.pending)?;
        self.reset();
        Ok(())
    }

    fn substitute(&mut self, drop_slash: bool) -> io::Result<()> {
        let name = &self.pending[2..2 + self.name_len];
        let resolved = std::str::from_utf8(name)
            .ok()
            .and_then(|name| self.resolver.resolve(name));

        match resolved {
            Some(mount_path) => {
                tracing::trace!(name = %String::from_utf8_lossy(name), mount_path = %mount_path, "Link rewritten");
                if let Some(base_url) = &self.base_url {
                    self.inner.write_all(base_url.trim_end_matches('/').as_bytes())?;
                }
                let mount_path = if drop_slash {
                    mount_path.strip_suffix('/').unwrap_or(mount_path.as_str())
                } else {
                    mount_path.as_str()
                };
                self.inner.write_all(mount_path.as_bytes())?;
            }
            None => {
                tracing::trace!(name = %String::from_utf8_lossy(name), "Link target not found");
                self.inner.write_all(&self.pending)?;
            }
        }
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.name_len = 0;
        self.state = State::Start;
    }
}

impl<W: Write, R: LinkResolver> Write for LinkRewriter<W, R> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Start of the not yet forwarded plain text in `buf`.
        let mut run = 0;
        let mut i = 0;

        while i < buf.len() {
            let byte = buf[i];
            let consumed = match self.state {
                State::Start => {
                    if byte == b'[' {
                        self.inner.write_all(&buf[run..i])?;
                        self.pending.push(byte);
                        self.state = State::Opening;
                        run = i + 1;
                    }
                    i += 1;
                    continue;
                }
                State::Opening if byte == b'#' => self.accept(byte, State::Opened),
                State::Opened if is_name_byte(byte) && self.name_len < MAX_NAME_LEN => {
                    self.name_len += 1;
                    self.accept(byte, State::Opened)
                }
                State::Opened if byte == b'#' && self.name_len > 0 => {
                    self.accept(byte, State::Closing { self_closing: false })
                }
                State::Opened if byte == b'/' && self.name_len > 0 => self.accept(byte, State::SelfClosing),
                State::SelfClosing if byte == b'#' => self.accept(byte, State::Closing { self_closing: true }),
                State::Closing { self_closing: false } if byte == b']' => self.accept(byte, State::Closed),
                State::Closing { self_closing: true } if byte == b']' => {
                    self.pending.push(byte);
                    self.substitute(true)?;
                    true
                }
                // One byte of look-ahead decides the form; the byte itself is
                // scanned again as plain text.
                State::Closed => {
                    self.substitute(byte == b'/')?;
                    false
                }
                _ => {
                    self.abandon()?;
                    false
                }
            };

            if consumed {
                i += 1;
            }
            run = i;
        }

        self.inner.write_all(&buf[run..])?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::{Captures, Regex};

    fn mounts(name: &str) -> Option<String> {
        match name {
            "main" => Some("/".into()),
            "docs" => Some("/modules/docs/".into()),
            "skin" => Some("/style/classic/".into()),
            "über" => Some("/unicode/".into()),
            _ => None,
        }
    }

    fn rewrite_in_chunks(input: &[u8], chunk: usize) -> String {
        let mut rewriter = LinkRewriter::new(Vec::new(), mounts);
        for part in input.chunks(chunk) {
            rewriter.write_all(part).unwrap();
        }
        String::from_utf8(rewriter.finish().unwrap()).unwrap()
    }

    fn rewrite(input: &str) -> String {
        rewrite_in_chunks(input.as_bytes(), input.len().max(1))
    }

    /// Whole-document substitution to compare the streaming output against.
    fn reference(input: &str) -> String {
        let re = Regex::new(r"\[#(?P<name>[A-Za-z0-9_$]+)(?:(?P<open>#\])(?P<slash>/)?|/#\])").unwrap();
        re.replace_all(input, |caps: &Captures| match mounts(&caps["name"]) {
            None => caps[0].to_string(),
            Some(mount) if caps.name("open").is_some() && caps.name("slash").is_none() => mount,
            Some(mount) => {
                let trimmed = mount.strip_suffix('/').unwrap_or(mount.as_str()).to_string();
                match caps.name("slash") {
                    Some(_) => trimmed + "/",
                    None => trimmed,
                }
            }
        })
        .into_owned()
    }

    const DOCUMENT: &str = r#"<html><head>
<link rel="stylesheet" href="[#skin#]/main.css">
<script src="[#docs#]search.js"></script>
</head><body>
<a href="[#main/#]">home</a> [#missing#] [#docs/#] [[#docs#]] [#[#skin#]x
array[0] = map["key"]; x = [#]; y = [##]; z = [# docs #]; [#docs#
<p>[#skin#][#docs#]/[#docs#]</p> #] ] [ # [#$tmp_1#]
trailing [#docs#]"#;

    #[test]
    fn test_basic_substitution() {
        assert_eq!(rewrite("a [#docs#] b"), "a /modules/docs/ b");
        assert_eq!(rewrite("[#docs#]/index.html"), "/modules/docs/index.html");
        assert_eq!(rewrite("[#docs/#]"), "/modules/docs");
        assert_eq!(rewrite("[#main#]x"), "/x");
        assert_eq!(rewrite("[#main#]/"), "/");
    }

    #[test]
    fn test_unresolved_token_is_kept() {
        assert_eq!(rewrite("see [#nope#]/x and [#nope/#]"), "see [#nope#]/x and [#nope/#]");
    }

    #[test]
    fn test_non_tokens_pass_through() {
        for input in ["[", "[#", "[#docs", "[#docs/", "[#docs#", "[#docs/#", "[x]", "[#a b#]", "##]]", "[##]"] {
            assert_eq!(rewrite(input), input, "input {input:?}");
        }
    }

    #[test]
    fn test_bracket_restarts_token() {
        assert_eq!(rewrite("[[#docs#]"), "[/modules/docs/");
        assert_eq!(rewrite("[#[#docs#]"), "[#/modules/docs/");
        assert_eq!(rewrite("[#docs#][#docs#]"), "/modules/docs//modules/docs/");
    }

    #[test]
    fn test_token_at_end_of_stream() {
        assert_eq!(rewrite("go to [#docs#]"), "go to /modules/docs/");
        let mut rewriter = LinkRewriter::new(Vec::new(), mounts);
        rewriter.write_all(b"[#docs#").unwrap();
        assert!(rewriter.get_ref().is_empty());
        assert_eq!(rewriter.finish().unwrap(), b"[#docs#");
    }

    #[test]
    fn test_base_url_prefix() {
        let mut rewriter = LinkRewriter::new(Vec::new(), mounts).with_base_url("/app/");
        rewriter.write_all(b"[#docs#]/a [#main#] [#docs/#]").unwrap();
        assert_eq!(rewriter.finish().unwrap(), b"/app/modules/docs/a /app/ /app/modules/docs");
    }

    #[test]
    fn test_non_ascii_names() {
        assert_eq!(rewrite("[#über#]x, ok"), "/unicode/x, ok");
    }

    #[test]
    fn test_name_length_is_bounded() {
        let long = "a".repeat(MAX_NAME_LEN + 1);
        let input = format!("[#{long}#]");
        assert_eq!(rewrite(&input), input);

        let longest = "b".repeat(MAX_NAME_LEN);
        let resolver = |name: &str| (name.len() == MAX_NAME_LEN).then(|| "/long/".to_string());
        let mut rewriter = LinkRewriter::new(Vec::new(), resolver);
        rewriter.write_all(format!("[#{longest}#]").as_bytes()).unwrap();
        assert_eq!(rewriter.finish().unwrap(), b"/long/");
    }

    #[test]
    fn test_matches_reference_for_every_chunk_size() {
        let expected = reference(DOCUMENT);
        assert_ne!(expected, DOCUMENT);
        for chunk in (1..=64).chain([100, 512, 1024]) {
            assert_eq!(rewrite_in_chunks(DOCUMENT.as_bytes(), chunk), expected, "chunk size {chunk}");
        }
        assert_eq!(rewrite(DOCUMENT), expected);
    }

    #[test]
    fn test_plain_text_is_not_held_back() {
        let mut rewriter = LinkRewriter::new(Vec::new(), mounts);
        rewriter.write_all(b"plain text, no tokens").unwrap();
        assert_eq!(rewriter.get_ref().as_slice(), b"plain text, no tokens");
        rewriter.write_all(b" then [#do").unwrap();
        assert_eq!(rewriter.get_ref().as_slice(), b"plain text, no tokens then ");
        rewriter.write_all(b"cs#]!").unwrap();
        assert_eq!(rewriter.get_ref().as_slice(), b"plain text, no tokens then /modules/docs/!");
    }
}
