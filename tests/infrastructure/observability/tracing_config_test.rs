use cyoa_server::infrastructure::observability::{DEFAULT_LOG_FILTER, TracingConfig};

#[test]
fn given_environment_when_creating_config_then_default_filter_targets_crate() {
    let config = TracingConfig::new("local", true);

    assert_eq!(config.environment, "local");
    assert!(config.json_format);
    assert_eq!(config.default_filter, DEFAULT_LOG_FILTER);
    assert!(config.default_filter.contains("cyoa_server=debug"));
}
