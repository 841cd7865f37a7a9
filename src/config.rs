use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MEDIA_ROOT: &str = "./media";
const DEFAULT_MEDIA_URL: &str = "/media/";
const DEFAULT_FILE_SIZE_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Failed to parse {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// When derived thumbnails are materialized after an image write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WarmingMode {
    Inline,
    Deferred,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub media_root: PathBuf,
    pub media_url: String,
    pub file_size_limit: usize,
    pub warming: WarmingMode,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let file_size_limit = match std::env::var("FILE_SIZE_LIMIT") {
            Ok(value) => value.parse::<usize>().map_err(|_| ConfigError::Invalid {
                name: "FILE_SIZE_LIMIT",
                value,
            })?,
            Err(_) => DEFAULT_FILE_SIZE_LIMIT,
        };

        let warming = match std::env::var("THUMBNAIL_WARMING").as_deref() {
            Ok("deferred") => WarmingMode::Deferred,
            Ok("inline") | Err(_) => WarmingMode::Inline,
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    name: "THUMBNAIL_WARMING",
                    value: other.to_string(),
                })
            }
        };

        Ok(Config {
            database_url,
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into()),
            media_root: std::env::var("MEDIA_ROOT")
                .unwrap_or_else(|_| DEFAULT_MEDIA_ROOT.into())
                .into(),
            media_url: normalize_media_url(
                std::env::var("MEDIA_URL").unwrap_or_else(|_| DEFAULT_MEDIA_URL.into()),
            ),
            file_size_limit,
            warming,
        })
    }

    /// Settings for a throwaway instance rooted at `media_root`.
    pub fn local(database_url: impl Into<String>, media_root: impl Into<PathBuf>) -> Self {
        Config {
            database_url: database_url.into(),
            bind_addr: "127.0.0.1:0".into(),
            media_root: media_root.into(),
            media_url: DEFAULT_MEDIA_URL.into(),
            file_size_limit: DEFAULT_FILE_SIZE_LIMIT,
            warming: WarmingMode::Inline,
        }
    }
}

fn normalize_media_url(url: String) -> String {
    if url.ends_with('/') {
        url
    } else {
        url + "/"
    }
}
