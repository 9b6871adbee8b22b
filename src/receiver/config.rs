//! Receiver configuration

use std::sync::Arc;

use crate::discovery::advertiser::RaopCapabilities;
use crate::protocol::crypto::ReceiverRsaKey;

/// Receiver configuration
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Device name shown to senders
    pub name: String,

    /// Optional password; enables the RTSP auth challenge
    pub password: Option<String>,

    /// RTSP listen port (0 = auto-assign)
    pub port: u16,

    /// Publish the service over mDNS on start
    ///
    /// Disabled by embedders that register the service themselves and by
    /// loopback tests.
    pub advertise: bool,

    /// Capability attributes for the advertisement
    pub capabilities: RaopCapabilities,

    /// RSA private key override; `None` uses the well-known receiver key
    pub rsa_key: Option<Arc<ReceiverRsaKey>>,

    /// Optional: override MAC address used in the service name
    pub mac_override: Option<[u8; 6]>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            name: "RAOP Receiver".to_string(),
            password: None,
            port: 5000,
            advertise: true,
            capabilities: RaopCapabilities::default(),
            rsa_key: None,
            mac_override: None,
        }
    }
}

impl ReceiverConfig {
    /// Create with custom name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set port
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Require a password from senders
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self.capabilities.password_required = true;
        self
    }

    /// Enable or disable mDNS advertisement
    #[must_use]
    pub fn advertise(mut self, advertise: bool) -> Self {
        self.advertise = advertise;
        self
    }

    /// Use a specific RSA private key instead of the well-known one
    #[must_use]
    pub fn rsa_key(mut self, key: ReceiverRsaKey) -> Self {
        self.rsa_key = Some(Arc::new(key));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ReceiverConfig::with_name("Kitchen").port(5001).advertise(false);

        assert_eq!(config.name, "Kitchen");
        assert_eq!(config.port, 5001);
        assert!(!config.advertise);
        assert!(config.password.is_none());
    }

    #[test]
    fn test_password_sets_capability_flag() {
        let config = ReceiverConfig::default().password("secret");

        assert_eq!(config.password.as_deref(), Some("secret"));
        assert!(config.capabilities.password_required);
    }
}
