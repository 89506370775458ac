//! Player: a named person with a body model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::body::Body;

/// Body model family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerModel {
    #[default]
    Standard,
    Extended,
}

impl PlayerModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerModel::Standard => "standard",
            PlayerModel::Extended => "extended",
        }
    }

    /// Parse a model name, substituting `Standard` for anything unknown
    pub fn parse_or_standard(name: &str) -> PlayerModel {
        name.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown model type `{}`, using standard", name);
            PlayerModel::Standard
        })
    }
}

impl FromStr for PlayerModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(PlayerModel::Standard),
            "extended" => Ok(PlayerModel::Extended),
            other => Err(format!("unknown player model: {}", other)),
        }
    }
}

impl fmt::Display for PlayerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player and their body
#[derive(Debug, Clone)]
pub struct Player {
    pub name: String,
    pub model: PlayerModel,
    /// Height in metres; scales every rest offset
    pub height: f64,
    pub body: Body,
}

impl Player {
    /// Create a player. Unknown model names fall back to `standard` with a
    /// warning.
    pub fn new(name: impl Into<String>, model: &str, height: f64) -> Self {
        let model = PlayerModel::parse_or_standard(model);
        Self {
            name: name.into(),
            model,
            height,
            body: Body::new(height),
        }
    }

    /// Track-file descriptor line, `SA_Player,name,model,height`
    pub fn descriptor(&self) -> String {
        format!("SA_Player,{},{},{}", self.name, self.model, self.height)
    }

    /// Fresh copy of this player with a body in the rest pose
    pub fn snapshot(&self) -> Player {
        Player {
            name: self.name.clone(),
            model: self.model,
            height: self.height,
            body: Body::new(self.height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_models() {
        assert_eq!(Player::new("Marvin", "standard", 1.6).model, PlayerModel::Standard);
        assert_eq!(Player::new("Marvin", "Extended", 1.6).model, PlayerModel::Extended);
    }

    #[test]
    fn test_unknown_model_falls_back() {
        let player = Player::new("Marvin", "gorilla", 1.6);
        assert_eq!(player.model, PlayerModel::Standard);
        assert_eq!(player.body.segment_count(), 18);
    }

    #[test]
    fn test_descriptor() {
        let player = Player::new("Marvin", "standard", 1.6);
        assert_eq!(player.descriptor(), "SA_Player,Marvin,standard,1.6");
    }
}
