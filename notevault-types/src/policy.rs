//! Encryption trust models.

use serde::{Deserialize, Serialize};

/// Who holds the key and performs encryption for a note version.
///
/// - `ClientOnly`: the caller submits already-encrypted bytes; server key
///   material never touches the payload.
/// - `ServerAssisted`: the caller submits plaintext; the server derives and
///   holds the key and encrypts before storage.
/// - `Hybrid`: the caller submits already-encrypted bytes; the server may add
///   a best-effort outer wrapping layer without seeing the inner plaintext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncryptionPolicy {
    ClientOnly,
    ServerAssisted,
    Hybrid,
}

impl Default for EncryptionPolicy {
    fn default() -> Self {
        Self::ClientOnly
    }
}

impl EncryptionPolicy {
    /// Stable wire/storage tag for this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientOnly => "client-only",
            Self::ServerAssisted => "server-assisted",
            Self::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for EncryptionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized policy tag.
#[derive(Debug, thiserror::Error)]
#[error("unknown encryption policy: {0}")]
pub struct PolicyParseError(pub String);

impl std::str::FromStr for EncryptionPolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client-only" => Ok(Self::ClientOnly),
            "server-assisted" => Ok(Self::ServerAssisted),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(PolicyParseError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrip() {
        for policy in [
            EncryptionPolicy::ClientOnly,
            EncryptionPolicy::ServerAssisted,
            EncryptionPolicy::Hybrid,
        ] {
            let parsed: EncryptionPolicy = policy.as_str().parse().unwrap();
            assert_eq!(parsed, policy);
        }
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&EncryptionPolicy::ServerAssisted).unwrap();
        assert_eq!(json, "\"server-assisted\"");
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!("plaintext".parse::<EncryptionPolicy>().is_err());
    }
}
