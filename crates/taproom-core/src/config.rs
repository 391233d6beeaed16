//! Configuration for taproom-core
//!
//! Centralized knobs for session limits, memory assembly, and reply
//! generation.

use serde::{Deserialize, Serialize};

/// System-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaproomConfig {
    /// Session limit settings
    pub limits: LimitsConfig,
    /// Memory assembly settings
    pub memory: MemoryConfig,
    /// Token cap for generated replies
    pub reply_max_tokens: u32,
}

impl Default for TaproomConfig {
    fn default() -> Self {
        Self {
            limits: LimitsConfig::default(),
            memory: MemoryConfig::default(),
            reply_max_tokens: 150,
        }
    }
}

/// Session limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Hard cap on messages per session
    pub message_limit: u32,
    /// Message count at which the last-call warning fires
    pub last_call_at: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            message_limit: 30,
            last_call_at: 25,
        }
    }
}

/// Memory assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// How many finished sessions feed cold storage
    pub max_cold_sessions: u32,
    /// Token budget for the assembled context block
    pub context_max_tokens: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_cold_sessions: 4,
            context_max_tokens: 5000,
        }
    }
}

impl TaproomConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.message_limit == 0 {
            return Err(ConfigError::OutOfRange(
                "message_limit must be positive".to_string(),
            ));
        }

        // The warning has to land before the hard cap or it never fires.
        if self.limits.last_call_at >= self.limits.message_limit {
            return Err(ConfigError::InvalidLimits(
                "last_call_at must be below message_limit".to_string(),
            ));
        }

        if self.memory.context_max_tokens == 0 {
            return Err(ConfigError::OutOfRange(
                "context_max_tokens must be positive".to_string(),
            ));
        }

        if self.reply_max_tokens == 0 {
            return Err(ConfigError::OutOfRange(
                "reply_max_tokens must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Limit values are invalid relative to each other
    #[error("Invalid limits: {0}")]
    InvalidLimits(String),
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TaproomConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits.message_limit, 30);
        assert_eq!(config.limits.last_call_at, 25);
        assert_eq!(config.memory.max_cold_sessions, 4);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = TaproomConfig::default();
        let toml = config.to_toml().unwrap();
        let parsed = TaproomConfig::from_toml(&toml).unwrap();
        assert_eq!(config.limits.message_limit, parsed.limits.message_limit);
        assert_eq!(
            config.memory.context_max_tokens,
            parsed.memory.context_max_tokens
        );
    }

    #[test]
    fn test_last_call_must_precede_limit() {
        let mut config = TaproomConfig::default();
        config.limits.last_call_at = 30;
        assert!(config.validate().is_err());

        config.limits.last_call_at = 35;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_budgets_rejected() {
        let mut config = TaproomConfig::default();
        config.memory.context_max_tokens = 0;
        assert!(config.validate().is_err());

        let mut config = TaproomConfig::default();
        config.reply_max_tokens = 0;
        assert!(config.validate().is_err());
    }
}
