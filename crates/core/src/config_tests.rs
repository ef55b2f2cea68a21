use super::*;

#[test]
fn presets_validate_cleanly() {
    assert!(Config::development().validate().is_ok());
    assert!(Config::production().validate().is_ok());
    assert!(Config::testing().validate().is_ok());
}

#[test]
fn testing_preset_has_zero_save_debounce() {
    assert_eq!(Config::testing().state.save_debounce_ms, 0);
}

#[test]
fn rejects_non_positive_keepalive_interval() {
    let mut cfg = Config::testing();
    cfg.keepalive.interval_minutes = 0.0;
    assert_eq!(
        cfg.validate(),
        Err(ConfigError::InvalidKeepaliveInterval("0".to_string()))
    );
}

#[test]
fn rejects_zero_retry_base() {
    let mut cfg = Config::testing();
    cfg.retry.base_ms = 0;
    assert_eq!(cfg.validate(), Err(ConfigError::InvalidRetryBase(0)));
}

#[test]
fn rejects_max_below_base() {
    let mut cfg = Config::testing();
    cfg.retry.base_ms = 100;
    cfg.retry.max_ms = 50;
    assert_eq!(
        cfg.validate(),
        Err(ConfigError::InvalidRetryMax { base: 100, max: 50 })
    );
}

#[test]
fn rejects_zero_max_attempts() {
    let mut cfg = Config::testing();
    cfg.retry.max_attempts = 0;
    assert_eq!(cfg.validate(), Err(ConfigError::InvalidRetryAttempts(0)));
}

#[yare::parameterized(
    below_zero = { -0.1 },
    above_one = { 1.1 },
)]
fn rejects_jitter_outside_unit_interval(jitter: f64) {
    let mut cfg = Config::testing();
    cfg.retry.jitter_factor = jitter;
    assert!(cfg.validate().is_err());
}

#[test]
fn rejects_zero_navigation_delay() {
    let mut cfg = Config::testing();
    cfg.injection.navigation_delay_ms = 0;
    assert_eq!(cfg.validate(), Err(ConfigError::InvalidNavigationDelay(0)));
}

#[test]
fn save_debounce_of_zero_is_a_valid_immediate_write_setting() {
    let mut cfg = Config::testing();
    cfg.state.save_debounce_ms = 0;
    assert!(cfg.validate().is_ok());
}
