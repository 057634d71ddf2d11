//! Rescrape policy

use crate::state::{RescrapeMode, Scope};

/// Returns true if the deduplication index is bypassed for `scope`
///
/// `none` never bypasses, `both` always does, `tweets` and `comments` only
/// bypass the matching scope.
pub fn should_bypass_dedup(scope: Scope, mode: RescrapeMode) -> bool {
    match mode {
        RescrapeMode::None => false,
        RescrapeMode::Both => true,
        RescrapeMode::Tweets => scope == Scope::Profile,
        RescrapeMode::Comments => scope == Scope::Thread,
    }
}
