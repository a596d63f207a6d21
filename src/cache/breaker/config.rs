//! Circuit breaker configuration

use crate::cache::types::error_types::CacheError;

/// Tunables for one layer's circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CircuitBreakerConfig {
    /// Fraction of failed outcomes in a full window that opens the
    /// circuit, in `(0.0, 1.0]`
    pub failure_threshold: f64,
    /// Number of recent outcomes tracked, at least 1
    pub window_size: usize,
    /// Seconds an open circuit waits before allowing a probe
    pub timeout_secs: u64,
    /// Consecutive half-open successes required to close
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 0.5,
            window_size: 10,
            timeout_secs: 30,
            success_threshold: 1,
        }
    }
}

impl CircuitBreakerConfig {
    /// Check the invariants the state machine relies on
    pub fn validate(&self) -> Result<(), CacheError> {
        if !(self.failure_threshold > 0.0 && self.failure_threshold <= 1.0) {
            return Err(CacheError::InvalidConfiguration(format!(
                "breaker failure_threshold must be in (0, 1], got {}",
                self.failure_threshold
            )));
        }
        if self.window_size == 0 {
            return Err(CacheError::InvalidConfiguration(
                "breaker window_size must be at least 1".to_string(),
            ));
        }
        if self.success_threshold == 0 {
            return Err(CacheError::InvalidConfiguration(
                "breaker success_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(CircuitBreakerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let mut config = CircuitBreakerConfig::default();
        config.failure_threshold = 0.0;
        assert!(config.validate().is_err());

        config.failure_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_window() {
        let mut config = CircuitBreakerConfig::default();
        config.window_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_success_threshold() {
        let mut config = CircuitBreakerConfig::default();
        config.success_threshold = 0;
        assert!(config.validate().is_err());
    }
}
