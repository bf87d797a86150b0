use serde::{Deserialize, Serialize};
use std::fmt;

/// One candidate stream for a channel.
///
/// `parse` marks URLs that are not streams themselves but pages or
/// redirectors that must be resolved first. `cors` is carried through from
/// the catalog untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub url: String,
    #[serde(default)]
    pub cors: bool,
    #[serde(default)]
    pub parse: bool,
}

impl SourceDescriptor {
    pub fn new<S: Into<String>>(url: S, cors: bool, parse: bool) -> Self {
        Self {
            url: url.into(),
            cors,
            parse,
        }
    }

    /// A source that is already a playable stream.
    pub fn direct<S: Into<String>>(url: S) -> Self {
        Self::new(url, false, false)
    }

    /// A source that needs resolution before playback.
    pub fn parsed<S: Into<String>>(url: S) -> Self {
        Self::new(url, false, true)
    }

    pub fn key(&self) -> SourceKey {
        SourceKey {
            url: self.url.clone(),
            parse: self.parse,
        }
    }
}

/// Identity of a resolution request: the `(url, parse)` pair.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub url: String,
    pub parse: bool,
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parse {
            write!(f, "{} (parse)", self.url)
        } else {
            write!(f, "{}", self.url)
        }
    }
}
