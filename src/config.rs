//! Broker connection configuration.
//!
//! The broker endpoint and credential pair are fixed for a deployment and
//! supplied by the embedding application; everything here has a working
//! default so tests and demos can run against a local broker. Uses
//! `heapless::String` for bounded config strings.
//!
//! # Example
//!
//! ```rust
//! use fieldlink::config::BrokerConfig;
//!
//! let config = BrokerConfig::default()
//!     .with_host("broker.example.com")
//!     .with_auth("owner", "secret");
//! assert_eq!(config.port, 1883);
//! ```

use heapless::String as HString;

/// Maximum length for config strings (hostnames, client IDs, credentials)
pub const MAX_SHORT_STRING: usize = 64;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    let take = s.len().min(MAX_SHORT_STRING);
    // Find valid UTF-8 boundary
    let valid_end = s
        .char_indices()
        .take_while(|(i, _)| *i < take)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let _ = hs.push_str(&s[..valid_end]);
    hs
}

// ============================================================================
// Broker Config
// ============================================================================

/// Broker connection parameters and protocol timing constants.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrokerConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Client ID (should be unique per controller instance)
    pub client_id: ShortString,
    /// Username for authentication (empty = no auth)
    pub username: ShortString,
    /// Password for authentication
    pub password: ShortString,
    /// Bounded connect timeout in seconds
    pub connect_timeout_secs: u16,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Delay before a post-loss reconnect attempt, in milliseconds
    pub reconnect_delay_ms: u64,
    /// Clean session: no subscription state survives a reconnect, so every
    /// reconnect must explicitly resubscribe
    pub clean_session: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: short_string("localhost"),
            port: 1883,
            client_id: short_string("fieldlink"),
            username: ShortString::new(),
            password: ShortString::new(),
            connect_timeout_secs: 10,
            keep_alive_secs: 20,
            reconnect_delay_ms: 5000,
            clean_session: true,
        }
    }
}

impl BrokerConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client ID
    pub fn with_client_id(mut self, id: &str) -> Self {
        self.client_id = short_string(id);
        self
    }

    /// Set the fixed credential pair
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = short_string(username);
        self.password = short_string(password);
        self
    }

    /// Set the reconnect delay
    pub fn with_reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.reconnect_delay_ms = ms;
        self
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        !self.username.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_protocol_constants() {
        let config = BrokerConfig::default();
        assert_eq!(config.host.as_str(), "localhost");
        assert_eq!(config.port, 1883);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.keep_alive_secs, 20);
        assert_eq!(config.reconnect_delay_ms, 5000);
        assert!(config.clean_session);
        assert!(!config.has_auth());
    }

    #[test]
    fn builder_chaining() {
        let config = BrokerConfig::default()
            .with_host("broker.local")
            .with_port(8883)
            .with_client_id("controller-1")
            .with_auth("owner", "secret")
            .with_reconnect_delay_ms(2500);

        assert_eq!(config.host.as_str(), "broker.local");
        assert_eq!(config.port, 8883);
        assert_eq!(config.client_id.as_str(), "controller-1");
        assert!(config.has_auth());
        assert_eq!(config.reconnect_delay_ms, 2500);
    }

    #[test]
    fn short_string_truncates() {
        let long = "x".repeat(MAX_SHORT_STRING + 10);
        let hs = short_string(&long);
        assert_eq!(hs.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn short_string_respects_utf8_boundary() {
        // 64 bytes would split the final multi-byte char; must not panic
        let s = "a".repeat(MAX_SHORT_STRING - 1) + "é";
        let hs = short_string(&s);
        assert!(hs.len() <= MAX_SHORT_STRING);
        assert!(hs.as_str().chars().all(|c| c == 'a'));
    }
}
