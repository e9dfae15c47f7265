//! Environment variable names read by the settings loader.

pub const CONFIG_PATH_VAR: &str = "SEGSCAN_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "SEGSCAN_CONFIG_JSON";

pub const TABLE_NAME_VAR: &str = "SEGSCAN_TABLE_NAME";
pub const REGION_VAR: &str = "SEGSCAN_REGION";
pub const TOTAL_SEGMENTS_VAR: &str = "SEGSCAN_TOTAL_SEGMENTS";
pub const LOCAL_SEGMENTS_VAR: &str = "SEGSCAN_LOCAL_SEGMENTS";
pub const SEGMENT_OFFSET_VAR: &str = "SEGSCAN_SEGMENT_OFFSET";
pub const LIMIT_VAR: &str = "SEGSCAN_LIMIT";
pub const FILTER_EXPRESSION_VAR: &str = "SEGSCAN_FILTER_EXPRESSION";
pub const PROJECTION_EXPRESSION_VAR: &str = "SEGSCAN_PROJECTION_EXPRESSION";
pub const HANDLER_FAILURE_VAR: &str = "SEGSCAN_HANDLER_FAILURE";
pub const BACKOFF_BASE_VAR: &str = "SEGSCAN_BACKOFF_BASE";
pub const BACKOFF_MAX_VAR: &str = "SEGSCAN_BACKOFF_MAX";
pub const BACKOFF_JITTER_VAR: &str = "SEGSCAN_BACKOFF_JITTER";
pub const MAX_ATTEMPTS_VAR: &str = "SEGSCAN_MAX_ATTEMPTS";

/// Settings files tried, in order, when no environment source is set.
pub const DEFAULT_FILES: &[&str] = &[
    "segscan.toml",
    "segscan.json",
    "config/segscan.toml",
    "config/segscan.json",
];
