use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identity of a loaded source: identical content yields identical query results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFingerprint {
    pub path: String,
    pub bytes: u64,
    pub sha256: String,
}

impl SourceFingerprint {
    pub fn of(path: &Path, content: &[u8]) -> Self {
        Self {
            path: path.display().to_string(),
            bytes: content.len() as u64,
            sha256: hex::encode(Sha256::digest(content)),
        }
    }
}
