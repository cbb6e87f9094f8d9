use crate::config::types::{Config, HttpConfig, ImageConfig, StorageConfig};
use crate::naming::is_valid_file_name;
use crate::{ConfigError, ConfigResult};

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_storage_config(&config.storage)?;
    validate_http_config(&config.http)?;
    validate_image_config(&config.images)?;
    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> ConfigResult<()> {
    if config.root.as_os_str().is_empty() {
        return Err(ConfigError::Validation("root cannot be empty".to_string()));
    }

    if !is_valid_file_name(&config.counter_file) {
        return Err(ConfigError::Validation(format!(
            "counter-file must be a plain, non-empty file name, got '{}'",
            config.counter_file
        )));
    }

    if !is_valid_file_name(&config.image_folder) {
        return Err(ConfigError::Validation(format!(
            "image-folder must be a plain, non-empty folder name, got '{}'",
            config.image_folder
        )));
    }

    Ok(())
}

/// Validates HTTP configuration
fn validate_http_config(config: &HttpConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.max_redirects > 20 {
        return Err(ConfigError::Validation(format!(
            "max-redirects must be <= 20, got {}",
            config.max_redirects
        )));
    }

    Ok(())
}

/// Validates image download configuration
fn validate_image_config(config: &ImageConfig) -> ConfigResult<()> {
    if config.max_concurrent_downloads < 1 || config.max_concurrent_downloads > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-downloads must be between 1 and 64, got {}",
            config.max_concurrent_downloads
        )));
    }

    Ok(())
}
