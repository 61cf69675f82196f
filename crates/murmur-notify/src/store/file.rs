use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use zeroize::Zeroizing;

use super::SecretStore;
use crate::error::StoreError;

/// Secret store reading one file per account from a directory.
///
/// Stand-in for a platform keychain: `<dir>/<account>` holds the secret
/// bytes verbatim. Account names are restricted to ASCII alphanumerics, `-`,
/// `_` and `.` (not leading) so they cannot escape the directory.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    /// Store rooted at `dir`. The directory need not exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    /// Write `secret` for `account`, creating the directory if needed.
    pub fn set_secret(&self, account: &str, secret: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(account)?;
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::Io(e.to_string()))?;
        fs::write(path, secret).map_err(|e| StoreError::Io(e.to_string()))
    }

    fn path_for(&self, account: &str) -> Result<PathBuf, StoreError> {
        let valid = !account.is_empty()
            && !account.starts_with('.')
            && account.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if !valid {
            return Err(StoreError::InvalidAccount { account: account.to_string() });
        }
        Ok(self.dir.join(account))
    }
}

impl SecretStore for FileSecretStore {
    fn get_secret(&self, account: &str) -> Result<Option<Zeroizing<Vec<u8>>>, StoreError> {
        match fs::read(self.path_for(account)?) {
            Ok(bytes) => Ok(Some(Zeroizing::new(bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e.to_string())),
        }
    }
}
