use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Buffered events per live stream subscriber; slow clients miss
    /// events beyond this instead of stalling the publisher.
    #[serde(default = "default_stream_buffer_size")]
    pub stream_buffer_size: usize,

    /// CORS allowed origins; empty means allow all (development mode).
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_stream_buffer_size() -> usize {
    64
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            data_dir: default_data_dir(),
            stream_buffer_size: default_stream_buffer_size(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
