use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Validate;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub grid_size: i32,
    pub initial_speed_ms: u64,
    pub speed_step_ms: u64,
    pub min_speed_ms: u64,
    pub food_reward: u32,
    /// Granularity of the scheduling callback; ticks themselves fire every `speed` ms.
    pub frame_interval_ms: u64,
}

impl GameSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            grid_size: 20,
            initial_speed_ms: 150,
            speed_step_ms: 2,
            min_speed_ms: 50,
            food_reward: 10,
            frame_interval_ms: 16,
        }
    }
}

impl Validate for GameSettings {
    fn validate(&self) -> Result<(), String> {
        // A centred three-segment snake needs two cells behind the head.
        if !(4..=100).contains(&self.grid_size) {
            return Err("grid_size must be between 4 and 100".to_string());
        }
        if self.min_speed_ms == 0 {
            return Err("min_speed_ms must be greater than 0".to_string());
        }
        if self.min_speed_ms > self.initial_speed_ms {
            return Err("min_speed_ms must not exceed initial_speed_ms".to_string());
        }
        if self.speed_step_ms == 0 {
            return Err("speed_step_ms must be greater than 0".to_string());
        }
        if self.food_reward == 0 {
            return Err("food_reward must be greater than 0".to_string());
        }
        if self.frame_interval_ms == 0 || self.frame_interval_ms > self.min_speed_ms {
            return Err("frame_interval_ms must be between 1 and min_speed_ms".to_string());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectatorSettings {
    pub bot_count: usize,
    pub grid_size: i32,
    pub step_interval_ms: u64,
    pub food_reward: u32,
    /// Steps a crashed bot stays frozen on screen before it respawns.
    pub respawn_delay_steps: u32,
    pub min_length: usize,
    pub max_length: usize,
}

impl SpectatorSettings {
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }
}

impl Default for SpectatorSettings {
    fn default() -> Self {
        Self {
            bot_count: 3,
            grid_size: 20,
            step_interval_ms: 200,
            food_reward: 10,
            respawn_delay_steps: 10,
            min_length: 3,
            max_length: 7,
        }
    }
}

impl Validate for SpectatorSettings {
    fn validate(&self) -> Result<(), String> {
        if self.bot_count > 50 {
            return Err("bot_count must not exceed 50".to_string());
        }
        if !(5..=100).contains(&self.grid_size) {
            return Err("spectator grid_size must be between 5 and 100".to_string());
        }
        if self.step_interval_ms < 10 {
            return Err("step_interval_ms must be at least 10".to_string());
        }
        if self.min_length < 1 || self.min_length > self.max_length {
            return Err("bot lengths must satisfy 1 <= min_length <= max_length".to_string());
        }
        if self.max_length as i32 >= self.grid_size {
            return Err("max_length must be smaller than grid_size".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(GameSettings::default().validate().is_ok());
        assert!(SpectatorSettings::default().validate().is_ok());
    }

    #[test]
    fn test_speed_floor_above_initial_rejected() {
        let settings = GameSettings {
            min_speed_ms: 200,
            ..GameSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_grid_too_small_for_initial_snake_rejected() {
        let settings = GameSettings {
            grid_size: 3,
            ..GameSettings::default()
        };
        assert!(settings.validate().is_err());
        let settings = GameSettings {
            grid_size: 4,
            ..GameSettings::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_bots_longer_than_grid_rejected() {
        let settings = SpectatorSettings {
            grid_size: 6,
            max_length: 6,
            ..SpectatorSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
