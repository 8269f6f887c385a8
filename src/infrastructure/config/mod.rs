mod app_config;
pub mod loader;
pub mod paths;
mod settings;

pub use app_config::*;
pub use settings::*;

use std::sync::OnceLock;

static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();
static USER_SETTINGS: OnceLock<UserSettings> = OnceLock::new();

/// Initialize configuration system (called at app startup)
pub fn init() {
    APP_CONFIG.get_or_init(|| loader::load_embedded_config("app"));
    USER_SETTINGS.get_or_init(loader::load_user_settings);
    tracing::info!("Configuration initialized");
}

/// Get application configuration
pub fn app() -> &'static AppConfig {
    APP_CONFIG.get().expect("Config not initialized")
}

/// Get user settings as loaded at startup
pub fn settings() -> &'static UserSettings {
    USER_SETTINGS.get().expect("Config not initialized")
}
