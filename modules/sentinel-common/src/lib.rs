pub mod config;
pub mod error;
pub mod ids;
pub mod similarity;

pub use config::Config;
pub use error::{Result, SentinelError};
pub use ids::hex32;
pub use similarity::ratcliff_obershelp;

/// Collapse internal whitespace runs to a single space and trim the ends.
/// Shared by the feed adapter (HTML-stripped text) and the canonicaliser.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}
