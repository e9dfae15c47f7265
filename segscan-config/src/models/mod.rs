pub mod retry;
pub mod scanner;
pub mod sources;

pub use retry::RetrySettings;
pub use scanner::{DEFAULT_REGION, ScannerSettings};
pub use sources::SettingsSource;
