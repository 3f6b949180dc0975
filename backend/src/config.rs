//! Application configuration.
//!
//! Settings live in a `config.json` next to the executable, using the same
//! field names the operators already have in their files. Secrets and
//! per-machine overrides can come from the environment (or a `.env` file):
//!
//! | Variable                | Overrides     |
//! |-------------------------|---------------|
//! | `MAKERDIR_WORK_PATH`    | `WorkPath`    |
//! | `MAKERDIR_API_URL`      | `ApiUrl`      |
//! | `MAKERDIR_API_KEY`      | `ApiKey`      |
//! | `MAKERDIR_FTP_PASSWORD` | `FtpPassword` |

use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};

/// Name of the manifest file written at the work root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Directory (under the work root) holding API result id lists.
pub const RESULTS_DIR: &str = "ApiResults";

/// Remote root label; uploads go to `<root>/<YYYYMMDD>/`.
pub const REMOTE_ROOT: &str = "GoodsColor";

/// Prefix stored in the manifest and sent to the API in front of remote paths.
pub const PUBLIC_PATH_PREFIX: &str = "/image/";

/// Header carrying the catalog API pre-shared key.
pub const API_KEY_HEADER: &str = "key";

/// JPEG quality used when the configured value is 0.
pub const DEFAULT_QUALITY: u8 = 85;

/// FTP connection dial timeout.
pub const FTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// FTP command read/write timeout.
pub const FTP_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Catalog API request timeout.
pub const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Pipeline configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Work root: holds the spec document, the picture folder and all output.
    #[serde(rename = "WorkPath", default)]
    pub work_path: PathBuf,

    /// Picture folder name under the work root.
    #[serde(rename = "PictureDirName", default = "default_picture_dir")]
    pub picture_dir_name: String,

    /// Directory holding size tables named `<style>.jpg`.
    #[serde(rename = "SizeTablePath", default)]
    pub size_table_path: PathBuf,

    /// Directory holding color swatch images.
    #[serde(rename = "ColorPicPath", default)]
    pub color_pic_path: PathBuf,

    /// Output width in pixels.
    #[serde(default = "default_width", deserialize_with = "lenient_u32")]
    pub width: u32,

    /// Output height in pixels.
    #[serde(default = "default_height", deserialize_with = "lenient_u32")]
    pub height: u32,

    /// JPEG quality (1-100, 0 means default).
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Catalog API endpoint. Empty disables the API call.
    #[serde(rename = "ApiUrl", default)]
    pub api_url: String,

    /// Catalog API pre-shared key.
    #[serde(rename = "ApiKey", default)]
    pub api_key: String,

    #[serde(rename = "FtpHost", default)]
    pub ftp_host: String,

    #[serde(rename = "FtpPort", default = "default_ftp_port", deserialize_with = "lenient_u16")]
    pub ftp_port: u16,

    #[serde(rename = "FtpUser", default)]
    pub ftp_user: String,

    #[serde(rename = "FtpPassword", default)]
    pub ftp_password: String,
}

fn default_picture_dir() -> String {
    "org".to_string()
}

fn default_width() -> u32 {
    500
}

fn default_height() -> u32 {
    700
}

fn default_quality() -> u8 {
    90
}

fn default_ftp_port() -> u16 {
    21
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_path: PathBuf::new(),
            picture_dir_name: default_picture_dir(),
            size_table_path: PathBuf::new(),
            color_pic_path: PathBuf::new(),
            width: default_width(),
            height: default_height(),
            quality: default_quality(),
            api_url: String::new(),
            api_key: String::new(),
            ftp_host: "localhost".to_string(),
            ftp_port: default_ftp_port(),
            ftp_user: String::new(),
            ftp_password: String::new(),
        }
    }
}

impl Config {
    /// Load from a JSON file and apply environment overrides.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = serde_json::from_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Write as pretty JSON.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from `MAKERDIR_*` environment variables.
    pub fn apply_env(&mut self) {
        let _ = dotenvy::dotenv();

        if let Ok(v) = std::env::var("MAKERDIR_WORK_PATH") {
            self.work_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("MAKERDIR_API_URL") {
            self.api_url = v;
        }
        if let Ok(v) = std::env::var("MAKERDIR_API_KEY") {
            self.api_key = v;
        }
        if let Ok(v) = std::env::var("MAKERDIR_FTP_PASSWORD") {
            self.ftp_password = v;
        }
    }

    /// Work root, erroring when unset.
    pub fn work_root(&self) -> ConfigResult<&Path> {
        if self.work_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing("WorkPath"));
        }
        Ok(&self.work_path)
    }

    /// Path of the source picture folder.
    pub fn picture_dir(&self) -> PathBuf {
        self.work_path.join(&self.picture_dir_name)
    }

    /// Path of `manifest.json`.
    pub fn manifest_path(&self) -> PathBuf {
        self.work_path.join(MANIFEST_FILE)
    }

    /// Path of the API results directory.
    pub fn results_dir(&self) -> PathBuf {
        self.work_path.join(RESULTS_DIR)
    }

    /// JPEG quality with the 0 => default rule applied.
    pub fn effective_quality(&self) -> u8 {
        match self.quality {
            0 => DEFAULT_QUALITY,
            q => q.min(100),
        }
    }

    /// `host:port` of the FTP server.
    pub fn ftp_addr(&self) -> String {
        format!("{}:{}", self.ftp_host.trim(), self.ftp_port)
    }
}

/// Default config path: `config.json` beside the executable.
pub fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("config.json")))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

/// Numbers written either as JSON numbers or as strings (`"500"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Text(String),
}

impl NumberOrString {
    fn parse<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::Text(s) if s.trim().is_empty() => Ok(0),
            NumberOrString::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("expected a number, got '{}'", s))),
        }
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let n = NumberOrString::deserialize(deserializer)?.parse::<D::Error>()?;
    u32::try_from(n).map_err(serde::de::Error::custom)
}

fn lenient_u16<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    let n = NumberOrString::deserialize(deserializer)?.parse::<D::Error>()?;
    u16::try_from(n).map_err(serde::de::Error::custom)
}
