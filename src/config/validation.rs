//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check referential integrity (default zone names a declared zone)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: HostConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Module graph problems are wiring errors, not validation errors

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::HostConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidBindAddress(String),
    InvalidMetricsAddress(String),
    ZeroRequestTimeout,
    NoModulePaths,
    EmptyMarker,
    InvalidContextPath(String),
    InvalidDefaultMountPoint(String),
    EmptyZoneName,
    EmptyZoneUrl(String),
    UnknownDefaultZone(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidBindAddress(a) => write!(f, "invalid listener bind address '{}'", a),
            ValidationError::InvalidMetricsAddress(a) => write!(f, "invalid metrics address '{}'", a),
            ValidationError::ZeroRequestTimeout => write!(f, "request timeout must be greater than zero"),
            ValidationError::NoModulePaths => write!(f, "at least one module path is required"),
            ValidationError::EmptyMarker => write!(f, "module marker directory name cannot be empty"),
            ValidationError::InvalidContextPath(p) => {
                write!(f, "context path '{}' must be empty or start with '/' and not end with '/'", p)
            }
            ValidationError::InvalidDefaultMountPoint(p) => {
                write!(f, "default mount point '{}' must start with '/'", p)
            }
            ValidationError::EmptyZoneName => write!(f, "zone names cannot be empty"),
            ValidationError::EmptyZoneUrl(z) => write!(f, "zone '{}' has an empty url", z),
            ValidationError::UnknownDefaultZone(z) => write!(f, "default zone '{}' is not declared in [zones]", z),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &HostConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.modules.paths.is_empty() {
        errors.push(ValidationError::NoModulePaths);
    }
    if config.modules.marker.trim().is_empty() {
        errors.push(ValidationError::EmptyMarker);
    }

    let context = &config.context_path;
    if !context.is_empty() && (!context.starts_with('/') || context.ends_with('/')) {
        errors.push(ValidationError::InvalidContextPath(context.clone()));
    }
    if !config.modules.default_mount_point.starts_with('/') {
        errors.push(ValidationError::InvalidDefaultMountPoint(
            config.modules.default_mount_point.clone(),
        ));
    }

    for (name, url) in &config.zones {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyZoneName);
        }
        if url.trim().is_empty() {
            errors.push(ValidationError::EmptyZoneUrl(name.clone()));
        }
    }
    if let Some(default_zone) = &config.default_zone {
        if !config.zones.contains_key(default_zone) {
            errors.push(ValidationError::UnknownDefaultZone(default_zone.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&HostConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = HostConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.timeouts.request_secs = 0;
        config.context_path = "app/".into();
        config.default_zone = Some("missing".into());
        config.zones.insert("empty".into(), " ".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidBindAddress("nowhere".into()),
                ValidationError::ZeroRequestTimeout,
                ValidationError::InvalidContextPath("app/".into()),
                ValidationError::EmptyZoneUrl("empty".into()),
                ValidationError::UnknownDefaultZone("missing".into()),
            ]
        );
    }
}
