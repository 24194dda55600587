//! Server configuration loaded from environment variables.

use std::path::PathBuf;

use anyhow::Result;

/// Configuration for the server process.
///
/// - `TERAPIA_DB`: path to the SQLite database file.
/// - `TERAPIA_MEDIA_ROOT`: directory where generated reports are written
///   (under a `reports/` subdirectory).
/// - `TERAPIA_MEDIA_URL`: public URL prefix for the media area.
///
/// Unset variables fall back to the platform data directory.
#[derive(Clone, Debug)]
pub struct Config {
    pub db_path: PathBuf,
    pub media_root: PathBuf,
    pub media_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "terapia")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        let db_path = std::env::var("TERAPIA_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs.data_dir().join("terapia.db"));

        let media_root = std::env::var("TERAPIA_MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs.data_dir().join("media"));

        let media_url = normalize_media_url(
            std::env::var("TERAPIA_MEDIA_URL").unwrap_or_else(|_| "/media/".into()),
        );

        Ok(Self {
            db_path,
            media_root,
            media_url,
        })
    }
}

/// Report URLs are built by appending to this prefix, so it must end in a
/// slash.
fn normalize_media_url(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
