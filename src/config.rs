//! Startup configuration
//!
//! Read once from `<config dir>/dronecam/config.toml`. A missing file means
//! defaults; a present but invalid file is an error.

use crate::controller::DEFAULT_SCAN_INTERVAL_TICKS;
use crate::motion::SpeedConfig;
use crate::transport::sender::{default_aux_channels, AuxChannel, AUX_CHANNELS};
use crate::transport::{DEFAULT_POSE_ADDRESS, DEFAULT_RECEIVE_PORT, DEFAULT_SEND_PORT};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "dronecam";
const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_TICK_PERIOD_MS: u64 = 15;
pub const DEFAULT_SMOOTHING_STRENGTH: f32 = 5.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub tick_period_ms: u64,
    pub scan_interval_ticks: u32,
    pub smoothing_strength: f32,
    pub initial_speed_tenths: u8,
    pub network: NetworkConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: DEFAULT_TICK_PERIOD_MS,
            scan_interval_ticks: DEFAULT_SCAN_INTERVAL_TICKS,
            smoothing_strength: DEFAULT_SMOOTHING_STRENGTH,
            initial_speed_tenths: SpeedConfig::DEFAULT_TENTHS,
            network: NetworkConfig::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub send_host: IpAddr,
    pub send_port: u16,
    pub receive_port: u16,
    pub pose_address: String,
    pub aux: Vec<AuxChannel>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            send_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            send_port: DEFAULT_SEND_PORT,
            receive_port: DEFAULT_RECEIVE_PORT,
            pose_address: DEFAULT_POSE_ADDRESS.to_string(),
            aux: default_aux_channels().to_vec(),
        }
    }
}

impl NetworkConfig {
    pub fn send_addr(&self) -> SocketAddr {
        SocketAddr::new(self.send_host, self.send_port)
    }

    pub fn receive_addr(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.receive_port)
    }

    /// The six aux channels in fixed field order
    pub fn aux_channels(&self) -> Result<[AuxChannel; AUX_CHANNELS], ConfigError> {
        self.aux.clone().try_into().map_err(|aux: Vec<AuxChannel>| {
            ConfigError::Invalid(format!(
                "expected {} aux channels, found {}",
                AUX_CHANNELS,
                aux.len()
            ))
        })
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 {
            return Err(ConfigError::Invalid("tick_period_ms must be > 0".to_string()));
        }
        if self.scan_interval_ticks == 0 {
            return Err(ConfigError::Invalid(
                "scan_interval_ticks must be > 0".to_string(),
            ));
        }
        if !(SpeedConfig::MIN_TENTHS..=SpeedConfig::MAX_TENTHS).contains(&self.initial_speed_tenths)
        {
            return Err(ConfigError::Invalid(format!(
                "initial_speed_tenths must be within {}-{}",
                SpeedConfig::MIN_TENTHS,
                SpeedConfig::MAX_TENTHS
            )));
        }
        if self.network.pose_address.trim().is_empty() {
            return Err(ConfigError::Invalid("pose_address must not be empty".to_string()));
        }
        self.network.aux_channels()?;
        Ok(())
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Loads the config from the default location, falling back to defaults
    pub async fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path).await,
            None => {
                warn!("No config directory on this platform, using default config");
                Ok(Self::default())
            }
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        if !exists {
            info!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config from {}", path.display());
        debug!("Config: {:?}", config);
        Ok(config)
    }
}
