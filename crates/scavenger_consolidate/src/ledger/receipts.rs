//! Append-only JSON Lines receipts ledger written by the miner.

use serde::Deserialize;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// One accepted solution. Only the fields needed for crediting are decoded.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    pub address: String,
    #[serde(rename = "isDevFee", default)]
    pub is_dev_fee: bool,
}

impl Receipt {
    pub fn user(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            is_dev_fee: false,
        }
    }

    pub fn dev_fee(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            is_dev_fee: true,
        }
    }
}

/// Read-only view of the receipts ledger.
pub trait ReceiptSource: Send + Sync {
    fn read_receipts(&self) -> Result<Vec<Receipt>, LedgerError>;
}

impl ReceiptSource for Vec<Receipt> {
    fn read_receipts(&self) -> Result<Vec<Receipt>, LedgerError> {
        Ok(self.clone())
    }
}

/// Ledger backed by a `receipts.jsonl` file. A missing file is an empty ledger.
pub struct JsonlReceipts {
    path: PathBuf,
}

impl JsonlReceipts {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReceiptSource for JsonlReceipts {
    fn read_receipts(&self) -> Result<Vec<Receipt>, LedgerError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no receipts ledger yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let mut receipts = Vec::new();
        for (lineno, raw) in BufReader::new(file).split(b'\n').enumerate() {
            let raw = raw?;
            let line = match std::str::from_utf8(&raw) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!(line = lineno + 1, error = %e, "skipping non-utf8 receipt");
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Receipt>(line) {
                Ok(r) => receipts.push(r),
                // a torn append must not hide the rest of the ledger
                Err(e) => warn!(line = lineno + 1, error = %e, "skipping malformed receipt"),
            }
        }
        debug!(count = receipts.len(), "receipts loaded");
        Ok(receipts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_jsonl_ignoring_extra_fields() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(
            tmp,
            r#"{{"ts":"2025-11-01T10:00:00Z","address":"addr1a","challenge_id":"**D01C10","nonce":"00ff"}}"#
        )
        .unwrap();
        writeln!(tmp, r#"{{"address":"addr1b","isDevFee":true}}"#).unwrap();
        writeln!(tmp).unwrap();
        let receipts = JsonlReceipts::new(tmp.path()).read_receipts().unwrap();
        assert_eq!(
            receipts,
            vec![Receipt::user("addr1a"), Receipt::dev_fee("addr1b")]
        );
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, r#"{{"address":"addr1a"}}"#).unwrap();
        writeln!(tmp, r#"{{"address":"addr1"#).unwrap();
        writeln!(tmp, r#"{{"address":"addr1c","isDevFee":false}}"#).unwrap();
        let receipts = JsonlReceipts::new(tmp.path()).read_receipts().unwrap();
        assert_eq!(receipts.len(), 2);
        assert_eq!(receipts[1].address, "addr1c");
    }

    #[test]
    fn torn_multibyte_line_is_skipped() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, r#"{{"address":"addr1a"}}"#).unwrap();
        tmp.write_all(b"{\"address\":\"addr1\xE2\x82\n").unwrap();
        writeln!(tmp, r#"{{"address":"addr1c"}}"#).unwrap();
        let receipts = JsonlReceipts::new(tmp.path()).read_receipts().unwrap();
        assert_eq!(
            receipts,
            vec![Receipt::user("addr1a"), Receipt::user("addr1c")]
        );
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonlReceipts::new(dir.path().join("receipts.jsonl"));
        assert!(ledger.read_receipts().unwrap().is_empty());
    }
}
