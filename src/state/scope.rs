use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// What a traversal call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// A profile timeline (or the focused post of a single-post run)
    Profile,

    /// The replies below one post
    Thread,
}

impl Scope {
    /// Converts the scope to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Thread => "thread",
        }
    }

    /// Noun used in progress lines
    pub fn item_noun(&self) -> &'static str {
        match self {
            Self::Profile => "posts",
            Self::Thread => "comments",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Operator choice of which scopes ignore already-archived content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RescrapeMode {
    /// Never bypass deduplication
    #[default]
    None,

    /// Bypass for profile timelines only
    Tweets,

    /// Bypass for reply threads only
    Comments,

    /// Bypass everywhere
    Both,
}

impl RescrapeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Tweets => "tweets",
            Self::Comments => "comments",
            Self::Both => "both",
        }
    }
}

impl FromStr for RescrapeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "tweets" => Ok(Self::Tweets),
            "comments" => Ok(Self::Comments),
            "both" => Ok(Self::Both),
            other => Err(format!(
                "unknown force mode '{}', expected none, tweets, comments or both",
                other
            )),
        }
    }
}

impl fmt::Display for RescrapeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
