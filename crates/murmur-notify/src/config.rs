use std::path::PathBuf;

/// Default credential account holding the pickle key
pub const DEFAULT_PICKLE_KEY_ACCOUNT: &str = "pickle_key";

/// Notification shim configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyConfig {
    /// Redb database holding session pickles
    pub db_path: PathBuf,
    /// Directory of the file-backed secret store
    pub secrets_dir: PathBuf,
    /// Account name of the pickle key in the secret store
    pub pickle_key_account: String,
    /// Store the advanced pickle after a successful decrypt
    pub persist_updated_pickle: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("murmur.redb"),
            secrets_dir: PathBuf::from("secrets"),
            pickle_key_account: DEFAULT_PICKLE_KEY_ACCOUNT.to_string(),
            persist_updated_pickle: true,
        }
    }
}
