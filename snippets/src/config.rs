use std::path::PathBuf;

use snippets_gax::retry::RetrySetting;

use crate::transfer::{transfer_retry_setting, AlbumKey, TransferRequest};

pub const INSTANCE_ID: &str = "test-instance";
pub const DATABASE_ID: &str = "example-db";

/// Environment variable overriding where the instance state is kept between runs.
pub const STATE_PATH_ENV: &str = "SPANNER_SNIPPETS_STATE";
pub const DEFAULT_STATE_PATH: &str = "spanner-snippets.json";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferSettings {
    pub amount: i64,
    pub threshold: i64,
    pub source: AlbumKey,
    pub destination: AlbumKey,
}

impl Default for TransferSettings {
    fn default() -> Self {
        TransferSettings {
            amount: 200000,
            threshold: 300000,
            source: AlbumKey::new(1, 1),
            destination: AlbumKey::new(2, 2),
        }
    }
}

impl TransferSettings {
    pub fn request(&self) -> TransferRequest {
        TransferRequest {
            source: self.source,
            destination: self.destination,
            amount: self.amount,
            threshold: self.threshold,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub instance_id: String,
    pub database_id: String,
    pub state_path: PathBuf,
    pub transfer: TransferSettings,
    pub retry: RetrySetting,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            instance_id: INSTANCE_ID.to_string(),
            database_id: DATABASE_ID.to_string(),
            state_path: default_state_path(),
            transfer: TransferSettings::default(),
            retry: transfer_retry_setting(),
        }
    }
}

pub fn default_state_path() -> PathBuf {
    match std::env::var(STATE_PATH_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_STATE_PATH),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_state_path_from_env() {
        std::env::set_var(STATE_PATH_ENV, "/tmp/elsewhere.json");
        assert_eq!(Config::default().state_path, PathBuf::from("/tmp/elsewhere.json"));
        std::env::remove_var(STATE_PATH_ENV);
        assert_eq!(Config::default().state_path, PathBuf::from(DEFAULT_STATE_PATH));
    }

    #[test]
    fn test_default_transfer() {
        let request = TransferSettings::default().request();
        assert_eq!(request.destination, AlbumKey::new(2, 2));
        assert_eq!(request.amount, 200000);
        assert_eq!(request.threshold, 300000);
    }
}
