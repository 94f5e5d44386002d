//! Container options.
//!
//! Options are fixed when a root container is created and shared by every
//! child created from it. They can be built in code, read from environment
//! variables, or (with the `config` feature) deserialized with serde.

use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};
use crate::lifetime::Lifetime;

pub const ENV_MAX_DEPTH: &str = "FERROUS_CONTAINER_MAX_DEPTH";
pub const ENV_DETECT_CYCLES: &str = "FERROUS_CONTAINER_DETECT_CYCLES";
pub const ENV_IMPLICIT_LIFETIME: &str = "FERROUS_CONTAINER_IMPLICIT_LIFETIME";

/// Tunables of a container tree.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{ContainerOptions, Lifetime};
///
/// let options = ContainerOptions::default()
///     .with_max_resolution_depth(64)
///     .with_implicit_lifetime(Lifetime::PerScope);
///
/// assert_eq!(options.max_resolution_depth, 64);
/// assert!(options.detect_cycles);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerOptions {
    /// Deepest nesting of resolutions on one thread before `DepthExceeded`
    pub max_resolution_depth: usize,
    /// Report re-entrant resolution of a key as `Circular`
    pub detect_cycles: bool,
    /// Lifetime of implicitly built concrete types
    pub implicit_lifetime: Lifetime,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            max_resolution_depth: 256,
            detect_cycles: true,
            implicit_lifetime: Lifetime::Transient,
        }
    }
}

impl ContainerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    pub fn with_cycle_detection(mut self, enabled: bool) -> Self {
        self.detect_cycles = enabled;
        self
    }

    pub fn with_implicit_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.implicit_lifetime = lifetime;
        self
    }

    /// Defaults overridden by the `FERROUS_CONTAINER_*` environment variables.
    pub fn from_env() -> DiResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the environment keys.
    pub fn from_lookup<F>(lookup: F) -> DiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            options.max_resolution_depth = raw
                .trim()
                .parse()
                .map_err(|_| DiError::Configuration(format!("{}: `{}` is not a depth", ENV_MAX_DEPTH, raw)))?;
        }
        if let Some(raw) = lookup(ENV_DETECT_CYCLES) {
            options.detect_cycles = parse_bool(&raw)
                .ok_or_else(|| DiError::Configuration(format!("{}: `{}` is not a boolean", ENV_DETECT_CYCLES, raw)))?;
        }
        if let Some(raw) = lookup(ENV_IMPLICIT_LIFETIME) {
            options.implicit_lifetime = parse_lifetime(&raw).ok_or_else(|| {
                DiError::Configuration(format!("{}: `{}` is not a lifetime", ENV_IMPLICIT_LIFETIME, raw))
            })?;
        }
        Ok(options)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_lifetime(raw: &str) -> Option<Lifetime> {
    match raw.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
        "singleton" => Some(Lifetime::Singleton),
        "perscope" | "scoped" => Some(Lifetime::PerScope),
        "transient" => Some(Lifetime::Transient),
        _ => None,
    }
}
