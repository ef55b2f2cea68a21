//! Immutable-after-construction, sectioned configuration for the
//! background coordinator. Built once per process revival; a preset is
//! applied at construction and may be overridden field-by-field before
//! [`Config::validate`] is called.

use crate::backoff::BackoffPolicy;
use crate::error::ConfigError;

/// Which chrome.storage area backs the persistent state cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StorageType {
    Local,
    Session,
}

/// The JS execution world a content script is injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum InjectionWorld {
    Main,
    Isolated,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeepaliveConfig {
    pub interval_minutes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InjectionConfig {
    pub world: InjectionWorld,
    pub all_frames: bool,
    pub navigation_delay_ms: u64,
    pub reinject_on_navigation: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateConfig {
    pub key_prefix: String,
    pub save_debounce_ms: u64,
    pub storage_type: StorageType,
    pub auto_restore: bool,
    pub request_persistence: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabPolicyConfig {
    pub close_tab_on_complete_default: bool,
    pub reuse_tab_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub enabled: bool,
}

/// Top-level configuration record. Construct via a preset
/// ([`Config::development`], [`Config::production`], [`Config::testing`]),
/// optionally mutate fields, then call [`Config::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub keepalive: KeepaliveConfig,
    pub retry: BackoffPolicy,
    pub injection: InjectionConfig,
    pub state: StateConfig,
    pub tab: TabPolicyConfig,
    pub logging: LoggingConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Looser timings, verbose logging, telemetry off.
    pub fn development() -> Self {
        Self {
            keepalive: KeepaliveConfig { interval_minutes: 0.5 },
            retry: BackoffPolicy { base_ms: 250, max_ms: 5_000, max_attempts: 3, jitter_factor: 0.2 },
            injection: InjectionConfig {
                world: InjectionWorld::Isolated,
                all_frames: true,
                navigation_delay_ms: 150,
                reinject_on_navigation: true,
            },
            state: StateConfig {
                key_prefix: "bg_".to_string(),
                save_debounce_ms: 250,
                storage_type: StorageType::Local,
                auto_restore: true,
                request_persistence: false,
            },
            tab: TabPolicyConfig { close_tab_on_complete_default: false, reuse_tab_default: true },
            logging: LoggingConfig { level: LogLevel::Debug },
            telemetry: TelemetryConfig { enabled: false },
        }
    }

    /// Tighter retry bounds, quieter logging, telemetry on.
    pub fn production() -> Self {
        Self {
            keepalive: KeepaliveConfig { interval_minutes: 1.0 },
            retry: BackoffPolicy { base_ms: 500, max_ms: 15_000, max_attempts: 5, jitter_factor: 0.3 },
            injection: InjectionConfig {
                world: InjectionWorld::Isolated,
                all_frames: true,
                navigation_delay_ms: 250,
                reinject_on_navigation: true,
            },
            state: StateConfig {
                key_prefix: "bg_".to_string(),
                save_debounce_ms: 500,
                storage_type: StorageType::Local,
                auto_restore: true,
                request_persistence: true,
            },
            tab: TabPolicyConfig { close_tab_on_complete_default: true, reuse_tab_default: true },
            logging: LoggingConfig { level: LogLevel::Warn },
            telemetry: TelemetryConfig { enabled: true },
        }
    }

    /// Zero debounce (immediate writes) and tiny delays, so tests don't
    /// need to sleep real wall-clock time to observe effects.
    pub fn testing() -> Self {
        Self {
            keepalive: KeepaliveConfig { interval_minutes: 0.1 },
            retry: BackoffPolicy { base_ms: 10, max_ms: 100, max_attempts: 3, jitter_factor: 0.0 },
            injection: InjectionConfig {
                world: InjectionWorld::Isolated,
                all_frames: true,
                navigation_delay_ms: 10,
                reinject_on_navigation: true,
            },
            state: StateConfig {
                key_prefix: "bg_".to_string(),
                save_debounce_ms: 0,
                storage_type: StorageType::Local,
                auto_restore: true,
                request_persistence: false,
            },
            tab: TabPolicyConfig { close_tab_on_complete_default: false, reuse_tab_default: true },
            logging: LoggingConfig { level: LogLevel::Trace },
            telemetry: TelemetryConfig { enabled: false },
        }
    }

    /// Enforce the numeric invariants each section depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.keepalive.interval_minutes > 0.0) {
            return Err(ConfigError::InvalidKeepaliveInterval(format!(
                "{}",
                self.keepalive.interval_minutes
            )));
        }
        if self.retry.base_ms == 0 {
            return Err(ConfigError::InvalidRetryBase(self.retry.base_ms));
        }
        if self.retry.max_ms < self.retry.base_ms {
            return Err(ConfigError::InvalidRetryMax {
                base: self.retry.base_ms,
                max: self.retry.max_ms,
            });
        }
        if self.retry.max_attempts < 1 {
            return Err(ConfigError::InvalidRetryAttempts(self.retry.max_attempts));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            return Err(ConfigError::InvalidJitter(format!("{}", self.retry.jitter_factor)));
        }
        if self.injection.navigation_delay_ms == 0 {
            return Err(ConfigError::InvalidNavigationDelay(self.injection.navigation_delay_ms));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
