//! Configuration access port trait.

use crate::domain::error::EngineError;

/// INI-style `[section] key` lookup.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Non-blank value, or `ConfigMissing`.
    fn require_string(&self, section: &str, key: &str) -> Result<String, EngineError> {
        match self.get_string(section, key) {
            Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            _ => Err(EngineError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            }),
        }
    }

    fn has_key(&self, section: &str, key: &str) -> bool {
        self.get_string(section, key).is_some()
    }
}
