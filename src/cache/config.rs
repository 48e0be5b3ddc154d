//! Cache system configuration.

use serde::{Deserialize, Serialize};

use crate::cache::tier::memory::DEFAULT_CACHE_SIZE;
use crate::cache::types::CacheError;

/// Configuration for a cascading cache and its request coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Fast-tier capacity in entries. Must be at least 1.
    pub capacity: usize,
    /// Worker threads running background loads. Must be at least 1.
    pub worker_threads: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_SIZE,
            worker_threads: 2,
        }
    }
}

impl CacheConfig {
    /// Validate the configuration, failing fast on invalid values.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.capacity == 0 {
            return Err(CacheError::invalid_configuration(
                "capacity must be at least 1",
            ));
        }
        if self.worker_threads == 0 {
            return Err(CacheError::invalid_configuration(
                "worker_threads must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_values_fail_validation() {
        let config = CacheConfig {
            capacity: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfiguration(_))
        ));

        let config = CacheConfig {
            worker_threads: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfiguration(_))
        ));
    }
}
