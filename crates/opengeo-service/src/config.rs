//! Service configuration.

/// Limits applied by the services.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Upper bound on the `limit` of any paginated listing (default: 200).
    pub max_page_size: u64,
    /// Number of objects scanned when a sub-object change cascades, or
    /// when the map feed spans several entities (default: 10_000).
    pub scan_limit: u64,
    /// Maximum length of a suggestion comment, in characters (default: 2000).
    pub max_comment_length: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_page_size: 200,
            scan_limit: 10_000,
            max_comment_length: 2000,
        }
    }
}
