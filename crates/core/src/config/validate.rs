use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Cache TTL tiers are non-zero
/// - Page size and pager cap are non-zero
/// - Bulk delete concurrency is non-zero
/// - Search index limits are non-zero (when configured)
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let cache = &config.cache;
    if cache.short_minutes == 0 || cache.medium_minutes == 0 || cache.long_minutes == 0 {
        return Err(ConfigError::ValidationError(
            "cache TTL tiers must be greater than 0".to_string(),
        ));
    }

    if config.paging.items_per_page == 0 {
        return Err(ConfigError::ValidationError(
            "paging.items_per_page cannot be 0".to_string(),
        ));
    }

    if config.paging.max_pager_results == 0 {
        return Err(ConfigError::ValidationError(
            "paging.max_pager_results cannot be 0".to_string(),
        ));
    }

    if config.bulk.delete_concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "bulk.delete_concurrency cannot be 0".to_string(),
        ));
    }

    if let Some(search) = &config.search {
        if search.max_matches == 0 {
            return Err(ConfigError::ValidationError(
                "search.max_matches cannot be 0".to_string(),
            ));
        }
        if search.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "search.url cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchIndexConfig;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_ttl_fails() {
        let mut config = Config::default();
        config.cache.medium_minutes = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_page_size_fails() {
        let mut config = Config::default();
        config.paging.items_per_page = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_concurrency_fails() {
        let mut config = Config::default();
        config.bulk.delete_concurrency = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_search_max_matches() {
        let mut config = Config::default();
        config.search = Some(SearchIndexConfig {
            max_matches: 0,
            ..SearchIndexConfig::default()
        });
        assert!(validate_config(&config).is_err());
    }
}
