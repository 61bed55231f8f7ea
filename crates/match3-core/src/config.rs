//! Session configuration.

use crate::objective::{default_levels, Objective};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Grid must have at least one column and one row")]
    EmptyGrid,

    #[error("Level table is empty")]
    NoLevels,

    #[error("Level {level} has no colors")]
    NoColors { level: usize },

    #[error("Animation duration must be positive")]
    InvalidDuration,
}

/// Tunables for a game session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub columns: usize,
    pub rows: usize,
    /// Depth of each column's preview queue
    pub preview_rows: usize,
    /// Seconds each animation phase lasts
    pub animation_seconds: f64,
    /// Seconds the bot waits in `Ready` before choosing a move
    pub bot_delay_seconds: f64,
    /// Whole-grid regenerations before level generation gives up
    pub max_generation_attempts: usize,
    /// Cascade waves per generation attempt before it is abandoned
    pub max_cascade_waves: usize,
    /// Objective table, level 1 first
    pub levels: Vec<Objective>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            columns: 8,
            rows: 8,
            preview_rows: 3,
            animation_seconds: 0.3,
            bot_delay_seconds: 0.3,
            max_generation_attempts: 100,
            max_cascade_waves: 1000,
            levels: default_levels(),
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        if self.levels.is_empty() {
            return Err(ConfigError::NoLevels);
        }
        if let Some(idx) = self.levels.iter().position(|l| l.color_count == 0) {
            return Err(ConfigError::NoColors { level: idx + 1 });
        }
        if !(self.animation_seconds > 0.0) {
            return Err(ConfigError::InvalidDuration);
        }
        Ok(())
    }

    /// Objective for a 1-based level number
    pub fn objective(&self, level: usize) -> Option<&Objective> {
        level.checked_sub(1).and_then(|idx| self.levels.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::Constraint;

    #[test]
    fn test_default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.columns, 8);
        assert_eq!(config.preview_rows, 3);
        assert!(config.objective(0).is_none());
        assert_eq!(config.objective(1).map(|o| o.target_score), Some(50));
        assert!(config.objective(5).is_none());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = GameConfig::default();
        config.rows = 0;
        assert_eq!(config.validate(), Err(ConfigError::EmptyGrid));

        let mut config = GameConfig::default();
        config.levels.push(Objective::new("bad", "", 1, Constraint::Unlimited, 0));
        assert_eq!(config.validate(), Err(ConfigError::NoColors { level: 5 }));

        let config = GameConfig {
            levels: vec![],
            ..GameConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoLevels));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GameConfig = serde_json::from_str(r#"{"columns": 6, "rows": 7}"#).unwrap();
        assert_eq!(config.columns, 6);
        assert_eq!(config.rows, 7);
        assert_eq!(config.levels.len(), 4);
    }
}
