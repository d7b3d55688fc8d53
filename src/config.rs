use clap::Parser;
use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::DEFAULT_MAX_FRAME_SIZE;

const PORT: u16 = 6379;

/// Startup settings, read from the command line and the environment.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    /// The address to bind to
    #[arg(long, env = "MINIDIS_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// The port to listen on
    #[arg(short, long, env = "MINIDIS_PORT", default_value_t = PORT)]
    pub port: u16,

    /// The directory where RDB files are stored. Reported by `CONFIG GET dir`, never accessed
    #[arg(long, default_value = "/default/path")]
    pub dir: String,

    /// The name of the RDB file. Reported by `CONFIG GET dbfilename`, never accessed
    #[arg(long, default_value = "dump.rdb")]
    pub dbfilename: String,

    /// The largest frame, in bytes, a client may send before being disconnected
    #[arg(long, env = "MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,
}

impl Config {
    /// The parameters exposed to clients through `CONFIG GET`.
    pub fn params(&self) -> ConfigStore {
        ConfigStore::from_iter([
            ("dir", self.dir.as_str()),
            ("dbfilename", self.dbfilename.as_str()),
        ])
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: PORT,
            dir: "/default/path".to_string(),
            dbfilename: "dump.rdb".to_string(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Read-only configuration parameters, shared by every connection without locking.
#[derive(Clone, Debug, Default)]
pub struct ConfigStore {
    params: Arc<HashMap<String, String>>,
}

impl ConfigStore {
    /// Parameter names are case-insensitive, as they are in Redis.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .get(&name.to_lowercase())
            .map(String::as_str)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ConfigStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let params = iter
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_lowercase(), value.into()))
            .collect();

        Self {
            params: Arc::new(params),
        }
    }
}
