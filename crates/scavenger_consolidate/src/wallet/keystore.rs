//! JSON keystore holding derived addresses; keys are re-derived from the password on unlock.

use crate::wallet::{DerivedAddress, UnlockedWallet, WalletError, WalletProvider};
use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const KEYSTORE_VERSION: u32 = 1;
const CHECK_TAG: &[u8] = b"scavenger-keystore/check";
const ROOT_TAG: &[u8] = b"scavenger-keystore/root";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeystoreFile {
    version: u32,
    salt: String,
    password_check: String,
    addresses: Vec<DerivedAddress>,
}

/// File-backed [`WalletProvider`]. The password is never stored, only a salted check hash.
pub struct Keystore {
    path: PathBuf,
}

impl Keystore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Write a keystore for `password` with addresses `(index, bech32, registered)`.
    /// Public keys are derived and stored alongside each address.
    pub fn create(
        path: impl AsRef<Path>,
        password: &str,
        salt: &[u8],
        entries: &[(u32, &str, bool)],
    ) -> Result<Self, WalletError> {
        let path = path.as_ref();
        let root = root_secret(salt, password);
        let addresses = entries
            .iter()
            .map(|(index, bech32, registered)| DerivedAddress {
                index: *index,
                bech32: (*bech32).to_string(),
                public_key_hex: hex::encode(index_key(&root, *index).verifying_key().to_bytes()),
                registered: *registered,
            })
            .collect();
        let file = KeystoreFile {
            version: KEYSTORE_VERSION,
            salt: hex::encode(salt),
            password_check: password_check(salt, password),
            addresses,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(&file).map_err(|e| WalletError::Format(e.to_string()))?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), count = entries.len(), "keystore written");
        Ok(Self::new(path))
    }

    fn read_file(&self) -> Result<KeystoreFile, WalletError> {
        let raw = std::fs::read_to_string(&self.path)?;
        let file: KeystoreFile =
            serde_json::from_str(&raw).map_err(|e| WalletError::Format(e.to_string()))?;
        if file.version != KEYSTORE_VERSION {
            return Err(WalletError::Format(format!(
                "unsupported keystore version {}",
                file.version
            )));
        }
        Ok(file)
    }
}

impl WalletProvider for Keystore {
    fn load_wallet(&self, password: &str) -> Result<Arc<dyn UnlockedWallet>, WalletError> {
        let file = self.read_file()?;
        let salt = hex::decode(&file.salt).map_err(|e| WalletError::Format(e.to_string()))?;
        if password_check(&salt, password) != file.password_check.to_lowercase() {
            return Err(WalletError::Authentication);
        }
        debug!(count = file.addresses.len(), "wallet unlocked");
        Ok(Arc::new(UnlockedKeystore {
            root: root_secret(&salt, password),
            addresses: file.addresses,
        }))
    }
}

struct UnlockedKeystore {
    root: [u8; 32],
    addresses: Vec<DerivedAddress>,
}

impl UnlockedWallet for UnlockedKeystore {
    fn addresses(&self) -> &[DerivedAddress] {
        &self.addresses
    }

    fn sign_message(&self, index: u32, message: &str) -> Result<String, WalletError> {
        let address = self.address(index).ok_or_else(|| WalletError::Signing {
            index,
            reason: "unknown index".to_string(),
        })?;
        let key = index_key(&self.root, index);
        if hex::encode(key.verifying_key().to_bytes()) != address.public_key_hex.to_lowercase() {
            return Err(WalletError::Signing {
                index,
                reason: "key unavailable: derived public key does not match keystore".to_string(),
            });
        }
        Ok(hex::encode(key.sign(message.as_bytes()).to_bytes()))
    }
}

fn password_check(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(CHECK_TAG);
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn root_secret(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(ROOT_TAG);
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

fn index_key(root: &[u8; 32], index: u32) -> SigningKey {
    let mut hasher = Sha256::new();
    hasher.update(root);
    hasher.update(index.to_be_bytes());
    let seed: [u8; 32] = hasher.finalize().into();
    SigningKey::from_bytes(&seed)
}
