use std::{str::FromStr, time::Duration};

use anyhow::{Context, anyhow};
use segscan_core::HandlerFailurePolicy;

/// Parse a boolean value from a raw string, accepting common env-style forms.
///
/// Accepted truthy values (case-insensitive): `"1"`, `"true"`, `"yes"`, `"on"`.
/// Accepted falsy values: `"0"`, `"false"`, `"no"`, `"off"`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Trimmed value of `name`, treating blank values as unset.
pub fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

pub fn parse_var<F, T>(lookup: &F, name: &str) -> anyhow::Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    non_empty(lookup, name)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("invalid value `{raw}` for {name}"))
        })
        .transpose()
}

pub fn parse_duration_var<F>(
    lookup: &F,
    name: &str,
) -> anyhow::Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, name)
        .map(|raw| {
            humantime::parse_duration(&raw)
                .with_context(|| format!("invalid duration `{raw}` for {name}"))
        })
        .transpose()
}

pub fn parse_bool_var<F>(lookup: &F, name: &str) -> anyhow::Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, name)
        .map(|raw| {
            parse_bool(&raw)
                .ok_or_else(|| anyhow!("invalid boolean `{raw}` for {name}"))
        })
        .transpose()
}

pub fn parse_handler_failure(raw: &str) -> Option<HandlerFailurePolicy> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "ignore" => Some(HandlerFailurePolicy::Ignore),
        "abort_segment" => Some(HandlerFailurePolicy::AbortSegment),
        "abort_scan" => Some(HandlerFailurePolicy::AbortScan),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(
        pairs: &[(&str, &str)],
    ) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn blank_values_count_as_unset() {
        let lookup = env(&[("A", "   ")]);
        assert_eq!(non_empty(&lookup, "A"), None);
        assert_eq!(parse_var::<_, u32>(&lookup, "A").unwrap(), None);
    }

    #[test]
    fn numbers_durations_and_flags_parse() {
        let lookup = env(&[("N", " 12 "), ("D", "1m 5s"), ("B", "Off")]);
        assert_eq!(parse_var::<_, u32>(&lookup, "N").unwrap(), Some(12));
        assert_eq!(
            parse_duration_var(&lookup, "D").unwrap(),
            Some(Duration::from_secs(65))
        );
        assert_eq!(parse_bool_var(&lookup, "B").unwrap(), Some(false));
    }

    #[test]
    fn bad_values_name_the_variable() {
        let lookup = env(&[("N", "forty"), ("B", "maybe")]);
        let err = parse_var::<_, u32>(&lookup, "N").unwrap_err();
        assert!(err.to_string().contains("N"));
        assert!(parse_bool_var(&lookup, "B").is_err());
    }

    #[test]
    fn handler_failure_accepts_kebab_and_snake_case() {
        assert_eq!(
            parse_handler_failure("abort-segment"),
            Some(HandlerFailurePolicy::AbortSegment)
        );
        assert_eq!(
            parse_handler_failure("ABORT_SCAN"),
            Some(HandlerFailurePolicy::AbortScan)
        );
        assert_eq!(parse_handler_failure("panic"), None);
    }
}
