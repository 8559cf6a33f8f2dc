use std::{
    fs,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const APP_NAME: &str = "roosty_alarm";
const SETTINGS_FILE_NAME: &str = "alarm_settings.json";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub bind: IpAddr,
    /// where ringtones are looked for, `music/` next to the program is used
    /// when this isn't set or doesn't exist
    pub music_dir: Option<PathBuf>,
    pub settings_file: Option<PathBuf>,
    /// how long the test button plays the ringtone for
    pub preview_ms: u64,
    /// open the alarm page in the default browser on startup
    pub open_browser: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            music_dir: directories::UserDirs::new()
                .and_then(|dirs| dirs.audio_dir().map(Path::to_path_buf)),
            settings_file: None,
            preview_ms: 1800,
            open_browser: true,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// when the file can't be read or isn't valid config
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = fs::read_to_string(path)?;
        Ok(toml::from_str(&config)?)
    }

    /// like [`Config::load`] but a missing file just means the defaults
    ///
    /// # Errors
    /// when the file exists but can't be read or parsed
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// # Errors
    /// when the config directory or file can't be written
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = toml::to_string(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, config)?;
        Ok(())
    }

    /// # Errors
    /// when there is no home directory to put the config in
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let mut path = directories::ProjectDirs::from("", "", APP_NAME)
            .ok_or(ConfigError::NoProjectDirs)?
            .config_dir()
            .to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    /// the directory the running executable lives in
    #[must_use]
    pub fn app_dir() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// The alarm settings file.
    ///
    /// Defaults to the project data directory, or next to the program when
    /// there is no home directory.
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        if let Some(path) = &self.settings_file {
            return path.clone();
        }
        directories::ProjectDirs::from("", "", APP_NAME).map_or_else(
            || Self::app_dir().join(SETTINGS_FILE_NAME),
            |dirs| dirs.data_dir().join(SETTINGS_FILE_NAME),
        )
    }

    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// Where a browser on this machine can reach the page.
    ///
    /// A wildcard bind address is swapped for loopback.
    #[must_use]
    pub fn page_url(&self) -> String {
        let host = match self.bind {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        format!("http://{}", SocketAddr::new(host, self.port))
    }

    #[must_use]
    pub const fn preview_duration(&self) -> Duration {
        Duration::from_millis(self.preview_ms)
    }
}
