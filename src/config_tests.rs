//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::config::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_engine_config_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.engine.risk_free_rate, dec!(0.045));
        assert_eq!(config.engine.benchmark_symbol, "SPY");
        assert_eq!(config.provider.timeout_secs, 30);
        assert_eq!(config.fetch.batch_size, 4);
        assert_eq!(config.fetch.batch_delay_ms, 200);
        assert_eq!(config.fetch.cache_ttl_secs, 300);
        assert_eq!(config.optimizer.iterations, 50);
        assert_eq!(config.optimizer.learning_rate, dec!(0.1));
        assert_eq!(config.optimizer.frontier_points, 30);
    }

    #[test]
    fn test_analysis_config_override() {
        let toml_str = r#"
[engine]
risk_free_rate = 0.05
benchmark_symbol = "VTI"
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.risk_free_rate, dec!(0.05));
        assert_eq!(config.engine.benchmark_symbol, "VTI");
        // Untouched sections keep their defaults
        assert_eq!(config.fetch.batch_size, 4);
    }

    #[test]
    fn test_provider_config_override() {
        let toml_str = r#"
[provider]
base_url = "https://market-data.internal:9000"
timeout_secs = 10
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.provider.base_url, "https://market-data.internal:9000");
        assert_eq!(config.provider.timeout_secs, 10);
    }

    #[test]
    fn test_optimizer_config_partial_override() {
        let toml_str = r#"
[optimizer]
iterations = 100
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.optimizer.iterations, 100);
        assert_eq!(config.optimizer.learning_rate, dec!(0.1));
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = EngineConfig::load("/nonexistent/risk-engine.toml").unwrap();
        assert_eq!(config.engine.benchmark_symbol, "SPY");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[fetch]\nbatch_size = 2\nbatch_delay_ms = 50\n").unwrap();

        let config = EngineConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.fetch.batch_size, 2);
        assert_eq!(config.fetch.batch_delay_ms, 50);
        assert_eq!(config.fetch.cache_ttl_secs, 300);
    }
}
