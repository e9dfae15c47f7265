use anyhow::{Context, anyhow};
use segscan_core::{
    ConfigError, DEFAULT_LIMIT, DEFAULT_TOTAL_SEGMENTS, HandlerFailurePolicy,
    RetryConfig, ScanConfig, ScanPlan, SegmentScanClient,
    config::DEFAULT_EVENT_CHANNEL_CAPACITY,
};
use segscan_model::ExpressionParameters;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};

use crate::{
    constants::*,
    util::{
        non_empty, parse_bool_var, parse_duration_var, parse_handler_failure,
        parse_var,
    },
};

use super::{retry::RetrySettings, sources::SettingsSource};

pub const DEFAULT_REGION: &str = "eu-west-1";

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Settings for one scanning worker instance.
///
/// Several instances split a table by sharing `total_segments` and
/// `local_segments` and picking distinct `segment_offset`s. An instance owns
/// global segments `[offset * local, offset * local + local)`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerSettings {
    /// Table to scan. Required before the settings can become a scan config.
    pub table_name: Option<String>,
    /// Region handed to the client factory; the engine itself ignores it.
    #[serde(default = "default_region")]
    pub region: String,
    /// Logical segments the whole table is divided into, across all
    /// instances.
    pub total_segments: u32,
    /// Segments this instance scans. Unset or zero means all of them.
    pub local_segments: Option<u32>,
    /// Which block of `local_segments` this instance owns.
    pub segment_offset: u32,
    /// Per-page item limit sent with every request.
    pub limit: u32,
    pub expression: ExpressionParameters,
    pub retry: RetrySettings,
    pub handler_failure: HandlerFailurePolicy,
    pub event_channel_capacity: usize,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            table_name: None,
            region: default_region(),
            total_segments: DEFAULT_TOTAL_SEGMENTS,
            local_segments: None,
            segment_offset: 0,
            limit: DEFAULT_LIMIT,
            expression: ExpressionParameters::default(),
            retry: RetrySettings::default(),
            handler_failure: HandlerFailurePolicy::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl ScannerSettings {
    /// Load settings from the process environment, after reading `.env` if
    /// present. Evaluation order:
    /// 1) `$SEGSCAN_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$SEGSCAN_CONFIG_JSON` (inline JSON),
    /// 3) the first existing default file (`segscan.toml`, `segscan.json`,
    ///    `config/segscan.toml`, `config/segscan.json`),
    /// 4) defaults.
    ///
    /// Individual `SEGSCAN_*` variables are applied on top of whichever
    /// source won.
    pub fn load_from_env() -> anyhow::Result<(Self, SettingsSource)> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env file");
        }
        Self::load_with(|name| env::var(name).ok())
    }

    /// Same as [`ScannerSettings::load_from_env`] with an explicit variable
    /// lookup and without reading `.env`.
    pub fn load_with<F>(lookup: F) -> anyhow::Result<(Self, SettingsSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::load_in(Path::new(""), &lookup)
    }

    fn load_in<F>(
        root: &Path,
        lookup: &F,
    ) -> anyhow::Result<(Self, SettingsSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (mut settings, source) = Self::load_base(root, lookup)?;
        settings.apply_overrides(lookup)?;
        info!(
            source = %source.describe(),
            table = settings.table_name.as_deref().unwrap_or("<unset>"),
            region = %settings.region,
            total_segments = settings.total_segments,
            local_segments = settings.effective_local_segments(),
            segment_offset = settings.segment_offset,
            "scanner settings resolved"
        );
        Ok((settings, source))
    }

    fn load_base<F>(
        root: &Path,
        lookup: &F,
    ) -> anyhow::Result<(Self, SettingsSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path_str) = non_empty(lookup, CONFIG_PATH_VAR) {
            let path = PathBuf::from(path_str);
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, SettingsSource::EnvPath(path)));
        }

        if let Some(raw) = non_empty(lookup, CONFIG_JSON_VAR) {
            let parsed = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_VAR}"))?;
            return Ok((parsed, SettingsSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file(root) {
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, SettingsSource::File(path)));
        }

        Ok((Self::default(), SettingsSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read scanner settings from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid scanner settings {}", path.display())
            }),
            Some("toml") | Some("tml") => {
                toml::from_str(&contents).map_err(|err| {
                    anyhow!(
                        "invalid scanner settings {}: {}",
                        path.display(),
                        err
                    )
                })
            }
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(
        contents: &str,
        origin: &str,
    ) -> anyhow::Result<Self> {
        // TOML first, then JSON.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse scanner settings {origin}: \
                     toml error: {toml_err}; json error: {json_err}"
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid scanner settings json: {err}"))
    }

    fn find_default_file(root: &Path) -> Option<PathBuf> {
        DEFAULT_FILES
            .iter()
            .map(|candidate| root.join(candidate))
            .find(|path| path.exists())
    }

    /// Apply individual `SEGSCAN_*` variables on top of the loaded values.
    pub fn apply_overrides<F>(&mut self, lookup: &F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(table_name) = non_empty(lookup, TABLE_NAME_VAR) {
            self.table_name = Some(table_name);
        }
        if let Some(region) = non_empty(lookup, REGION_VAR) {
            self.region = region;
        }
        if let Some(total) = parse_var(lookup, TOTAL_SEGMENTS_VAR)? {
            self.total_segments = total;
        }
        if let Some(local) = parse_var(lookup, LOCAL_SEGMENTS_VAR)? {
            self.local_segments = Some(local);
        }
        if let Some(offset) = parse_var(lookup, SEGMENT_OFFSET_VAR)? {
            self.segment_offset = offset;
        }
        if let Some(limit) = parse_var(lookup, LIMIT_VAR)? {
            self.limit = limit;
        }
        if let Some(filter) = non_empty(lookup, FILTER_EXPRESSION_VAR) {
            self.expression.filter_expression = Some(filter);
        }
        if let Some(projection) = non_empty(lookup, PROJECTION_EXPRESSION_VAR) {
            self.expression.projection_expression = Some(projection);
        }
        if let Some(raw) = non_empty(lookup, HANDLER_FAILURE_VAR) {
            self.handler_failure = parse_handler_failure(&raw).ok_or_else(|| {
                anyhow!(
                    "invalid value `{raw}` for {HANDLER_FAILURE_VAR}; \
                     expected ignore, abort_segment or abort_scan"
                )
            })?;
        }
        if let Some(base) = parse_duration_var(lookup, BACKOFF_BASE_VAR)? {
            self.retry.backoff_base = base;
        }
        if let Some(max) = parse_duration_var(lookup, BACKOFF_MAX_VAR)? {
            self.retry.backoff_max = max;
        }
        if let Some(jitter) = parse_bool_var(lookup, BACKOFF_JITTER_VAR)? {
            self.retry.jitter = jitter;
        }
        if let Some(attempts) = parse_var(lookup, MAX_ATTEMPTS_VAR)? {
            self.retry.max_attempts = Some(attempts);
        }
        Ok(())
    }

    /// Local segment count with the "unset or zero means all" rule applied.
    pub fn effective_local_segments(&self) -> u32 {
        match self.local_segments {
            Some(local) if local > 0 => local,
            _ => self.total_segments,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from(&self.retry)
    }

    /// Segment plan these settings describe.
    pub fn plan(&self) -> Result<ScanPlan, ConfigError> {
        ScanPlan::new(
            self.total_segments,
            self.segment_offset,
            self.effective_local_segments(),
        )
    }

    /// Validated engine configuration driving `client`.
    pub fn into_scan_config(
        self,
        client: Arc<dyn SegmentScanClient>,
    ) -> Result<ScanConfig, ConfigError> {
        let retry = self.retry_config();
        let local = self.effective_local_segments();
        let mut builder = ScanConfig::builder()
            .shared_client(client)
            .total_segments(self.total_segments)
            .local_segments(local)
            .segment_offset(self.segment_offset)
            .limit(self.limit)
            .expression(self.expression)
            .retry(retry)
            .handler_failure(self.handler_failure)
            .event_channel_capacity(self.event_channel_capacity);
        if let Some(table_name) = self.table_name {
            builder = builder.table_name(table_name);
        }
        builder.build()
    }
}
