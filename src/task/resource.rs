// src/task/resource.rs

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

static RESOURCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-A-Za-z_0-9]+$").expect("resource pattern compiles"));

/// Name of something that needs exclusive access while a task runs.
///
/// Opaque to the scheduler; the only rule is the character set, so names
/// can travel in URLs and log lines unescaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceName(String);

impl ResourceName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ResourceName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if RESOURCE_PATTERN.is_match(s) {
            Ok(ResourceName(s.to_string()))
        } else {
            Err(format!(
                "invalid resource name {s:?} (expected letters, digits, '-' or '_')"
            ))
        }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
