//! SQL safety gate configuration.

use serde::{Deserialize, Serialize};

/// Keywords that disqualify a generated query no matter how it is structured.
///
/// Matching is a case-insensitive substring search over the raw query text.
/// The list extends a built-in set (`api_key`, `apikey`, `password`,
/// `hashedpassword`) that configuration cannot remove.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default = "default_restricted_keywords")]
    pub restricted_keywords: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            restricted_keywords: default_restricted_keywords(),
        }
    }
}

pub fn default_restricted_keywords() -> Vec<String> {
    ["api_key", "apikey", "password", "hashedpassword", "hashed_password"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
