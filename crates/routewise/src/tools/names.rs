//! Canonical names of the default tools.
//!
//! The analyzer's suggestion table and the research stage refer to tools by
//! these names; `builtin` registers tools under them.

pub const WEB_SEARCH: &str = "web-search";
pub const ENCYCLOPEDIA: &str = "encyclopedia";
pub const CALCULATOR: &str = "calculator";
pub const STATISTICS: &str = "statistics";

/// Sentinel a search tool returns when the provider had nothing to offer.
pub const NO_RESULTS: &str = "NO_RESULTS";
