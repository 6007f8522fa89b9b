//! Ambient configuration (SPEC_FULL.md §10.3).
//!
//! The teacher keeps a process-wide `lazy_static` `CONFIG` loaded from a
//! TOML file (referenced throughout `overlay/peer.rs` as `CONFIG`, though
//! the `config` module itself wasn't part of the retrieval pack). This
//! crate keeps the same `toml`/`serde` loading mechanism but threads the
//! result as an explicit value rather than a global, per the spec.md §9
//! redesign guidance against module-scope mutable state.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub dial_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub wait_for_timeout_secs: u64,
    pub auth_cert_ttl_secs: u64,
    pub ledger_version: u32,
    pub overlay_version: u32,
    pub overlay_min_version: u32,
    pub listening_port: u32,
    pub version_string: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig {
            dial_timeout_secs: 5,
            request_timeout_secs: 3,
            wait_for_timeout_secs: 5,
            auth_cert_ttl_secs: 3600,
            ledger_version: 9000,
            overlay_version: 9000,
            overlay_min_version: 0,
            // spec.md §9 open question: advertising 0 is more honest for a
            // pure outbound client that never accepts inbound connections
            // (spec.md §1 Non-goals).
            listening_port: 0,
            version_string: format!("stellar-overlay-rs/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl OverlayConfig {
    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn wait_for_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_for_timeout_secs)
    }

    pub fn auth_cert_ttl(&self) -> Duration {
        Duration::from_secs(self.auth_cert_ttl_secs)
    }

    /// Load configuration overrides from a TOML file, falling back to
    /// `OverlayConfig::default()` for any field the file doesn't set.
    pub fn load_from_file(path: &std::path::Path) -> std::io::Result<OverlayConfig> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_constants() {
        let config = OverlayConfig::default();
        assert_eq!(config.dial_timeout_secs, 5);
        assert_eq!(config.request_timeout_secs, 3);
        assert_eq!(config.wait_for_timeout_secs, 5);
        assert_eq!(config.auth_cert_ttl_secs, 3600);
        assert_eq!(config.ledger_version, 9000);
        assert_eq!(config.overlay_version, 9000);
    }

    #[test]
    fn partial_toml_overrides_fall_back_to_defaults() {
        let partial: OverlayConfig = toml::from_str("ledger_version = 10\n").unwrap();
        assert_eq!(partial.ledger_version, 10);
        assert_eq!(partial.overlay_version, 9000);
    }
}
