//! Mount point values.
//!
//! A mount point is parsed from `/path/` or `/path/ [zone]`. The path is always
//! normalized to start and end with `/`; the zone is lowercased. A mount point
//! without a zone matches any zone.

use std::fmt;
use std::str::FromStr;

/// A normalized mount path plus an optional zone restriction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountPoint {
    path: String,
    zone: Option<String>,
}

impl MountPoint {
    /// Parse a mount point spec. Never fails: anything unrecognized is taken
    /// as a literal path.
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        let (raw_path, zone) = match spec.find(' ') {
            Some(separator) if separator > 0 => {
                let rest = spec[separator + 1..].trim();
                let zone = rest
                    .strip_prefix('[')
                    .and_then(|r| r.strip_suffix(']'))
                    .map(|z| z.trim().to_lowercase())
                    .filter(|z| !z.is_empty());
                (&spec[..separator], zone)
            }
            _ => (spec, None),
        };

        let mut path = String::with_capacity(raw_path.len() + 2);
        if !raw_path.starts_with('/') {
            path.push('/');
        }
        path.push_str(raw_path);
        if !path.ends_with('/') {
            path.push('/');
        }

        Self { path, zone }
    }

    /// The bare root mount point: `/`, any zone.
    pub fn root() -> Self {
        Self {
            path: "/".to_string(),
            zone: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.path == "/" && self.zone.is_none()
    }
}

impl FromStr for MountPoint {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Renders back into the `/path/ [zone]` form, so `parse(mp.to_string()) == mp`.
impl fmt::Display for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.zone {
            Some(zone) => write!(f, "{} [{}]", self.path, zone),
            None => f.write_str(&self.path),
        }
    }
}

impl serde::Serialize for MountPoint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_slashes() {
        assert_eq!(MountPoint::parse("blah").path(), "/blah/");
        assert_eq!(MountPoint::parse("/blah").path(), "/blah/");
        assert_eq!(MountPoint::parse("blah/").path(), "/blah/");
        assert_eq!(MountPoint::parse("  /blah/whatever/ ").path(), "/blah/whatever/");
        assert_eq!(MountPoint::parse("").path(), "/");
    }

    #[test]
    fn test_zone_parsing() {
        let mp = MountPoint::parse("/blah/ [Whatever]");
        assert_eq!(mp.path(), "/blah/");
        assert_eq!(mp.zone(), Some("whatever"));

        // Not bracketed: the trailing part is ignored and no zone applies.
        let mp = MountPoint::parse("/blah/ whatever");
        assert_eq!(mp.path(), "/blah/");
        assert_eq!(mp.zone(), None);
    }

    #[test]
    fn test_equality_includes_zone() {
        assert_eq!(MountPoint::parse("/a/"), MountPoint::parse("a"));
        assert_ne!(MountPoint::parse("/a/"), MountPoint::parse("/a/ [x]"));
        assert_ne!(MountPoint::parse("/a/ [x]"), MountPoint::parse("/a/ [y]"));
        assert!(MountPoint::parse("/").is_root());
        assert!(!MountPoint::parse("/ [blah]").is_root());
    }

    #[test]
    fn test_display_reparses_to_same_value() {
        for spec in ["/", "blah", "/blah/blah/", "/ [blah]", "/blah/ [WHATEVER]", "x/y [z]"] {
            let mp = MountPoint::parse(spec);
            assert_eq!(MountPoint::parse(&mp.to_string()), mp, "spec {spec:?}");
        }
    }
}
