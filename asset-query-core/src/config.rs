//! Query compilation settings

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_FILTER_DEPTH: usize = 10;
pub const MAX_FILTER_NODES: usize = 50;
pub const MAX_FILTER_LENGTH: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    pub default_page: u32,
    pub default_page_size: u32,
    /// Hard ceiling, applied whatever the caller asks for
    pub max_page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page: DEFAULT_PAGE,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterLimits {
    pub max_depth: usize,
    pub max_nodes: usize,
    /// Longest filter text, in characters, accepted for parsing
    pub max_length: usize,
}

impl Default for FilterLimits {
    fn default() -> Self {
        Self {
            max_depth: MAX_FILTER_DEPTH,
            max_nodes: MAX_FILTER_NODES,
            max_length: MAX_FILTER_LENGTH,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub paging: PagingConfig,
    pub limits: FilterLimits,
}

impl QueryConfig {
    /// Load from `ASSET_QUERY_*` environment variables.
    /// Missing or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_page_size = env_or("ASSET_QUERY_DEFAULT_PAGE_SIZE", defaults.paging.default_page_size);
        let max_page_size = env_or("ASSET_QUERY_MAX_PAGE_SIZE", defaults.paging.max_page_size);
        let max_depth = env_or("ASSET_QUERY_MAX_FILTER_DEPTH", defaults.limits.max_depth);
        let max_nodes = env_or("ASSET_QUERY_MAX_FILTER_NODES", defaults.limits.max_nodes);
        let max_length = env_or("ASSET_QUERY_MAX_FILTER_LENGTH", defaults.limits.max_length);

        Self {
            paging: PagingConfig {
                default_page: defaults.paging.default_page,
                default_page_size: default_page_size.max(1),
                max_page_size: max_page_size.max(1),
            },
            limits: FilterLimits {
                max_depth: max_depth.max(1),
                max_nodes: max_nodes.max(1),
                max_length: max_length.max(1),
            },
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key = key, value = %raw, "Ignoring unparsable query setting");
                default
            }
        },
        Err(_) => default,
    }
}
