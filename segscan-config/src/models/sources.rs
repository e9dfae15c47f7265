use std::path::PathBuf;

/// Source that produced the scanner settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SettingsSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

impl SettingsSource {
    pub fn describe(&self) -> String {
        match self {
            Self::Default => "built-in defaults".to_string(),
            Self::EnvPath(path) => {
                format!("$SEGSCAN_CONFIG_PATH ({})", path.display())
            }
            Self::EnvInline => "$SEGSCAN_CONFIG_JSON".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}
