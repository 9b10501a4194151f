use super::{types::Config, ConfigError};

/// Minimum gap between MusicBrainz requests. The service bans clients that go
/// faster, so this is a floor rather than a default.
pub const MIN_MUSICBRAINZ_DELAY_MS: u64 = 1100;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Every source timeout is non-zero
/// - MusicBrainz delay is at least 1100 ms
/// - Release deadline and freshness windows are positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let sources = &config.sources;
    let timeouts = [
        ("sources.bandcamp.timeout_secs", sources.bandcamp.timeout_secs),
        ("sources.qobuz.timeout_secs", sources.qobuz.timeout_secs),
        ("sources.ampwall.timeout_secs", sources.ampwall.timeout_secs),
        ("sources.mirlo.timeout_secs", sources.mirlo.timeout_secs),
        ("sources.mirlo.feed_timeout_secs", sources.mirlo.feed_timeout_secs),
        (
            "sources.faircamp.directory_timeout_secs",
            sources.faircamp.directory_timeout_secs,
        ),
        ("sources.faircamp.feed_timeout_secs", sources.faircamp.feed_timeout_secs),
        ("discogs.timeout_secs", config.discogs.timeout_secs),
        ("enrichment.timeout_secs", config.enrichment.timeout_secs),
    ];
    for (key, value) in timeouts {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!("{} cannot be 0", key)));
        }
    }

    if config.musicbrainz.rate_limit_ms < MIN_MUSICBRAINZ_DELAY_MS {
        return Err(ConfigError::ValidationError(format!(
            "musicbrainz.rate_limit_ms must be at least {}",
            MIN_MUSICBRAINZ_DELAY_MS
        )));
    }
    if config.musicbrainz.min_score > 100 {
        return Err(ConfigError::ValidationError(
            "musicbrainz.min_score must be between 0 and 100".to_string(),
        ));
    }

    if config.discovery.release_deadline_ms == 0 {
        return Err(ConfigError::ValidationError(
            "discovery.release_deadline_ms cannot be 0".to_string(),
        ));
    }

    if config.freshness.window_days < 0 || config.freshness.visible_days <= 0 {
        return Err(ConfigError::ValidationError(
            "freshness.window_days must be >= 0 and freshness.visible_days > 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = Config::default();
        config.sources.qobuz.timeout_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("sources.qobuz.timeout_secs"));
    }

    #[test]
    fn test_validate_musicbrainz_delay_floor() {
        let mut config = Config::default();
        config.musicbrainz.rate_limit_ms = 1000;
        assert!(validate_config(&config).is_err());

        config.musicbrainz.rate_limit_ms = 1100;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_release_deadline_fails() {
        let mut config = Config::default();
        config.discovery.release_deadline_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_freshness_windows() {
        let mut config = Config::default();
        config.freshness.visible_days = 0;
        assert!(validate_config(&config).is_err());
    }
}
