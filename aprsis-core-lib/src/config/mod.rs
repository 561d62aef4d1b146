mod loader;
mod logging;
mod root;
mod validator;

pub use loader::load_from_path;
pub use logging::LoggingConfig;
pub use root::Config;
pub use validator::validate_config;
