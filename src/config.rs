use serde::Deserialize;

use crate::types::Color;

/// Named search depths offered to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn depth(self) -> u8 {
        match self {
            Self::Easy => 3,
            Self::Medium => 4,
            Self::Hard => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Adversarial,
    Evolutionary,
}

/// Settings fixed before a game starts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub difficulty: Difficulty,
    /// Overrides the difficulty's depth when set.
    pub depth: Option<u8>,
    pub strategy: Strategy,
    /// Side played by the engine; `None` means both sides are driven by `select`.
    pub ai_color: Option<Color>,
    /// Seed for the evolutionary engine.
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            depth: None,
            strategy: Strategy::Adversarial,
            ai_color: Some(Color::B),
            seed: 0,
        }
    }
}

impl GameConfig {
    pub fn hot_seat() -> Self {
        Self {
            ai_color: None,
            ..Self::default()
        }
    }

    pub fn search_depth(&self) -> u8 {
        self.depth.unwrap_or_else(|| self.difficulty.depth())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.search_depth() == 0 {
            return Err("search depth must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_maps_to_search_depth() {
        assert_eq!(Difficulty::Easy.depth(), 3);
        assert_eq!(Difficulty::Medium.depth(), 4);
        assert_eq!(Difficulty::Hard.depth(), 5);
    }

    #[test]
    fn explicit_depth_overrides_difficulty() {
        let config = GameConfig {
            difficulty: Difficulty::Hard,
            depth: Some(2),
            ..GameConfig::default()
        };

        assert_eq!(config.search_depth(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_depth_is_rejected() {
        let config = GameConfig {
            depth: Some(0),
            ..GameConfig::default()
        };

        assert!(config.validate().unwrap_err().contains("at least 1"));
    }
}
