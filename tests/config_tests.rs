//! Tests for the configuration builder and environment loader

use std::collections::HashMap;
use std::time::Duration;

use scamcheck_parser::config::ServiceConfig;

fn from_pairs(pairs: &[(&str, &str)]) -> anyhow::Result<ServiceConfig> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    ServiceConfig::from_lookup(|key| vars.get(key).cloned())
}

#[test]
fn test_defaults() {
    let config = ServiceConfig::builder().build().unwrap();

    assert_eq!(config.port(), 4000);
    assert_eq!(config.bind_addr(), "0.0.0.0:4000");
    assert_eq!(config.pool_size(), 2);
    assert_eq!(config.max_concurrent_requests(), 5);
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
    assert_eq!(config.cache_ttl(), Duration::ZERO);
    assert_eq!(config.rate_limit_max_requests(), 30);
    assert_eq!(config.rate_limit_window(), Duration::from_secs(60));
    assert_eq!(config.keepalive_interval(), None);
    assert!(config.headless());
    assert_eq!(
        config.scam_detector_base_url(),
        "https://scam-detector.com/validator"
    );
}

#[test]
fn test_empty_environment_matches_defaults() {
    let config = from_pairs(&[]).unwrap();
    assert_eq!(config, ServiceConfig::default());
}

#[test]
fn test_builder_rejects_zero_bounds() {
    assert!(
        ServiceConfig::builder()
            .max_concurrent_requests(0)
            .build()
            .is_err()
    );
    assert!(
        ServiceConfig::builder()
            .request_timeout(Duration::ZERO)
            .build()
            .is_err()
    );
    assert!(
        ServiceConfig::builder()
            .rate_limit(0, Duration::from_secs(60))
            .build()
            .is_err()
    );
    assert!(
        ServiceConfig::builder()
            .keepalive_interval(Some(Duration::ZERO))
            .build()
            .is_err()
    );
}

#[test]
fn test_builder_allows_empty_idle_pool() {
    let config = ServiceConfig::builder().pool_size(0).build().unwrap();
    assert_eq!(config.pool_size(), 0);
}

#[test]
fn test_builder_rejects_unparsable_urls() {
    let err = ServiceConfig::builder()
        .phishtank_url("not a url")
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("phishtank_url"));
}

#[test]
fn test_environment_values_are_parsed() {
    let config = from_pairs(&[
        ("PORT", "8080"),
        ("BROWSER_POOL_SIZE", "4"),
        ("MAX_CONCURRENT_REQUESTS", "10"),
        ("REQUEST_TIMEOUT", "15000"),
        ("CACHE_TTL", "3600000"),
        ("RATE_LIMIT_MAX_REQUESTS", "100"),
        ("RATE_LIMIT_WINDOW", "30000"),
        ("KEEPALIVE_INTERVAL", "60000"),
    ])
    .unwrap();

    assert_eq!(config.port(), 8080);
    assert_eq!(config.pool_size(), 4);
    assert_eq!(config.max_concurrent_requests(), 10);
    assert_eq!(config.request_timeout(), Duration::from_secs(15));
    assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
    assert_eq!(config.rate_limit_max_requests(), 100);
    assert_eq!(config.rate_limit_window(), Duration::from_secs(30));
    assert_eq!(config.keepalive_interval(), Some(Duration::from_secs(60)));
}

#[test]
fn test_unparsable_variable_names_the_key() {
    let err = from_pairs(&[("BROWSER_POOL_SIZE", "many")]).unwrap_err();
    assert!(format!("{err:#}").contains("BROWSER_POOL_SIZE"));
}

#[test]
fn test_blank_variable_keeps_default() {
    let config = from_pairs(&[("PORT", "  ")]).unwrap();
    assert_eq!(config.port(), 4000);
}

#[test]
fn test_headless_overrides_node_env() {
    let dev = from_pairs(&[("NODE_ENV", "development")]).unwrap();
    assert!(!dev.headless());

    let prod = from_pairs(&[("NODE_ENV", "production")]).unwrap();
    assert!(prod.headless());

    let forced = from_pairs(&[("NODE_ENV", "development"), ("HEADLESS", "true")]).unwrap();
    assert!(forced.headless());

    assert!(from_pairs(&[("HEADLESS", "sometimes")]).is_err());
}

#[test]
fn test_zero_keepalive_disables_it() {
    let config = from_pairs(&[("KEEPALIVE_INTERVAL", "0")]).unwrap();
    assert_eq!(config.keepalive_interval(), None);
}

#[test]
fn test_base_url_trailing_slash_is_trimmed() {
    let config = from_pairs(&[(
        "SCAM_DETECTOR_BASE_URL",
        "https://mirror.test/validator/",
    )])
    .unwrap();
    assert_eq!(
        config.scam_detector_base_url(),
        "https://mirror.test/validator"
    );
}

#[test]
fn test_trust_proxy_is_opt_in() {
    assert!(!from_pairs(&[]).unwrap().trust_proxy());
    assert!(from_pairs(&[("TRUST_PROXY", "true")]).unwrap().trust_proxy());
    assert!(from_pairs(&[("TRUST_PROXY", "maybe")]).is_err());
}
