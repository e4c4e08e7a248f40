use std::net::SocketAddr;

use common::config::Validate;
use common::context::ContextConfig;
use common::games::snake::{GameSettings, SpectatorSettings};
use common::store::StoreSettings;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "snake_arcade_server.yaml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub game: GameSettings,
    pub spectator: SpectatorSettings,
    pub store: StoreSettings,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        self.bind_address
            .parse()
            .map_err(|e| format!("Invalid bind_address '{}': {}", self.bind_address, e))
    }

    pub fn context_config(&self) -> ContextConfig {
        ContextConfig {
            game: self.game.clone(),
            spectator: self.spectator.clone(),
            store: self.store.clone(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            game: GameSettings::default(),
            spectator: SpectatorSettings::default(),
            store: StoreSettings::default(),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), String> {
        self.socket_addr()?;
        self.game.validate()?;
        self.spectator.validate()?;
        self.store.validate()
    }
}
