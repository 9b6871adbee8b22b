//! RAOP service advertisement
//!
//! Publishes the receiver as `_raop._tcp` with the capability TXT record
//! senders use to decide how to talk to us. The instance name format is
//! `MAC@FriendlyName` where MAC is a 12-character hex string.

use std::collections::HashMap;

use mdns_sd::{Error as MdnsError, ServiceDaemon, ServiceInfo};
use tokio::sync::{mpsc, oneshot};

/// Errors from service advertisement
#[derive(Debug, thiserror::Error)]
pub enum AdvertiserError {
    /// Failed to retrieve a MAC address for the instance name
    #[error("failed to retrieve MAC address: {0}")]
    MacRetrievalFailed(String),

    /// mDNS error
    #[error("mDNS error: {0}")]
    Mdns(#[from] MdnsError),

    /// Service not registered
    #[error("service not registered")]
    NotRegistered,

    /// Service already registered
    #[error("service already registered")]
    AlreadyRegistered,

    /// The advertiser task exited before confirming registration
    #[error("advertiser task exited unexpectedly")]
    TaskExited,
}

/// Retrieve a MAC address for service identification.
///
/// Tries the primary network interface first and falls back to a stable
/// pseudo-MAC derived from the machine identity, so the advertised name
/// survives restarts.
///
/// # Errors
///
/// Returns an error only if both retrieval and fallback fail.
pub fn get_device_mac() -> Result<[u8; 6], AdvertiserError> {
    #[cfg(target_os = "linux")]
    {
        get_mac_linux().or_else(|_| Ok(generate_stable_mac()))
    }

    #[cfg(not(target_os = "linux"))]
    {
        Ok(generate_stable_mac())
    }
}

#[cfg(target_os = "linux")]
fn get_mac_linux() -> Result<[u8; 6], AdvertiserError> {
    use std::fs;

    let net_dir = "/sys/class/net";
    if !std::path::Path::new(net_dir).exists() {
        return Err(AdvertiserError::MacRetrievalFailed(
            "no /sys/class/net found".into(),
        ));
    }

    for entry in
        fs::read_dir(net_dir).map_err(|e| AdvertiserError::MacRetrievalFailed(e.to_string()))?
    {
        let entry = entry.map_err(|e| AdvertiserError::MacRetrievalFailed(e.to_string()))?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();

        // Skip loopback and virtual interfaces
        if name_str == "lo" || name_str.starts_with("veth") || name_str.starts_with("docker") {
            continue;
        }

        let addr_path = entry.path().join("address");
        if let Ok(mac_str) = fs::read_to_string(&addr_path) {
            let mac_str = mac_str.trim();
            if mac_str != "00:00:00:00:00:00" {
                return parse_mac_string(mac_str);
            }
        }
    }

    Err(AdvertiserError::MacRetrievalFailed(
        "no suitable interface found".into(),
    ))
}

pub(crate) fn parse_mac_string(mac: &str) -> Result<[u8; 6], AdvertiserError> {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return Err(AdvertiserError::MacRetrievalFailed(format!(
            "invalid MAC format: {mac}"
        )));
    }

    let mut bytes = [0u8; 6];
    for (i, part) in parts.iter().enumerate() {
        bytes[i] = u8::from_str_radix(part, 16)
            .map_err(|_| AdvertiserError::MacRetrievalFailed(format!("invalid hex: {part}")))?;
    }

    Ok(bytes)
}

// Intentionally extracting bytes from hash
#[allow(
    clippy::cast_possible_truncation,
    reason = "Hash extraction safely truncates to expected mac byte sizes"
)]
pub(crate) fn generate_stable_mac() -> [u8; 6] {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let seed = std::fs::read_to_string("/etc/machine-id").unwrap_or_else(|_| {
        hostname::get().map_or_else(
            |_| "raop-receiver".to_string(),
            |h| h.to_string_lossy().into_owned(),
        )
    });

    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    let hash = hasher.finish();

    // Use hash bytes as MAC, set locally-administered bit
    let mut mac = [0u8; 6];
    mac[0] = ((hash >> 40) as u8) | 0x02;
    mac[1] = (hash >> 32) as u8;
    mac[2] = (hash >> 24) as u8;
    mac[3] = (hash >> 16) as u8;
    mac[4] = (hash >> 8) as u8;
    mac[5] = hash as u8;

    mac
}

/// Format MAC address for the RAOP instance name (uppercase, no colons)
#[must_use]
pub fn format_mac_for_service(mac: &[u8; 6]) -> String {
    format!(
        "{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    )
}

/// Stream capability attributes advertised in the TXT record
#[derive(Debug, Clone)]
pub struct RaopCapabilities {
    /// Supported audio codecs: 0=PCM, 1=ALAC
    pub codecs: Vec<u8>,
    /// Supported encryption types: 0=none, 1=RSA+AES
    pub encryption_types: Vec<u8>,
    /// Number of audio channels
    pub channels: u8,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Sample size in bits
    pub sample_size: u8,
    /// Password required
    pub password_required: bool,
}

impl Default for RaopCapabilities {
    fn default() -> Self {
        Self {
            codecs: vec![0, 1],           // PCM, ALAC
            encryption_types: vec![0, 1], // None, RSA+AES
            channels: 2,
            sample_rate: 44_100,
            sample_size: 16,
            password_required: false,
        }
    }
}

/// Build TXT record for RAOP service advertisement
pub struct TxtRecordBuilder {
    records: HashMap<String, String>,
}

impl TxtRecordBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Build the RAOP capability TXT record
    #[must_use]
    pub fn from_capabilities(caps: &RaopCapabilities) -> Self {
        let mut builder = Self::new();

        builder.add("txtvers", "1");
        builder.add("ch", &caps.channels.to_string());
        builder.add("sr", &caps.sample_rate.to_string());
        builder.add("ss", &caps.sample_size.to_string());
        builder.add("cn", &Self::format_list(&caps.codecs));
        builder.add("et", &Self::format_list(&caps.encryption_types));
        builder.add("ek", "1");
        builder.add("tp", "TCP");
        builder.add(
            "pw",
            if caps.password_required {
                "true"
            } else {
                "false"
            },
        );
        builder.add("sm", "false");
        builder.add("sv", "false");
        builder.add("vn", "3");

        builder
    }

    /// Add a key-value pair
    pub fn add(&mut self, key: &str, value: &str) -> &mut Self {
        self.records.insert(key.to_string(), value.to_string());
        self
    }

    /// Build into `HashMap` for mdns-sd
    #[must_use]
    pub fn build_map(&self) -> HashMap<String, String> {
        self.records.clone()
    }

    fn format_list(items: &[u8]) -> String {
        items
            .iter()
            .map(std::string::ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for TxtRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for RAOP service advertisement
#[derive(Debug, Clone)]
pub struct AdvertiserConfig {
    /// Friendly name shown to users (e.g., "Living Room Speaker")
    pub name: String,
    /// RTSP port to advertise
    pub port: u16,
    /// Capability attributes for the TXT record
    pub capabilities: RaopCapabilities,
    /// Optional: override MAC address
    pub mac_override: Option<[u8; 6]>,
}

impl Default for AdvertiserConfig {
    fn default() -> Self {
        Self {
            name: "RAOP Receiver".to_string(),
            port: 5000,
            capabilities: RaopCapabilities::default(),
            mac_override: None,
        }
    }
}

/// Synchronous RAOP service advertiser over mdns-sd
pub struct ServiceAdvertiser {
    config: AdvertiserConfig,
    daemon: ServiceDaemon,
    service_fullname: Option<String>,
    mac: [u8; 6],
}

impl ServiceAdvertiser {
    /// Create a new advertiser
    ///
    /// # Errors
    ///
    /// Returns an error if the mDNS daemon cannot be initialized or no
    /// MAC address can be determined.
    pub fn new(config: AdvertiserConfig) -> Result<Self, AdvertiserError> {
        let daemon = ServiceDaemon::new()?;

        let mac = match config.mac_override {
            Some(mac) => mac,
            None => get_device_mac()?,
        };

        Ok(Self {
            config,
            daemon,
            service_fullname: None,
            mac,
        })
    }

    /// Get the instance name that will be advertised
    #[must_use]
    pub fn service_name(&self) -> String {
        format!("{}@{}", format_mac_for_service(&self.mac), self.config.name)
    }

    /// Register the service on the network
    ///
    /// # Errors
    ///
    /// Returns an error if the service is already registered or mDNS
    /// registration fails.
    pub fn register(&mut self) -> Result<(), AdvertiserError> {
        if self.service_fullname.is_some() {
            return Err(AdvertiserError::AlreadyRegistered);
        }

        let service_type = "_raop._tcp.local.";
        let service_name = self.service_name();

        let txt = TxtRecordBuilder::from_capabilities(&self.config.capabilities);

        let hostname = format!(
            "{}.local.",
            self.config.name.replace(' ', "-").to_lowercase()
        );
        let service_info = ServiceInfo::new(
            service_type,
            &service_name,
            &hostname,
            "", // IP addresses (auto-detect)
            self.config.port,
            txt.build_map(),
        )?;

        self.daemon.register(service_info.clone())?;
        self.service_fullname = Some(service_info.get_fullname().to_string());

        tracing::info!(
            name = %service_name,
            port = %self.config.port,
            "RAOP service registered"
        );

        Ok(())
    }

    /// Withdraw the service from the network
    ///
    /// # Errors
    ///
    /// Returns an error if the service is not registered or mDNS
    /// unregistration fails.
    pub fn unregister(&mut self) -> Result<(), AdvertiserError> {
        let fullname = self
            .service_fullname
            .take()
            .ok_or(AdvertiserError::NotRegistered)?;

        self.daemon.unregister(&fullname)?;

        tracing::info!(name = %fullname, "RAOP service withdrawn");

        Ok(())
    }
}

impl Drop for ServiceAdvertiser {
    fn drop(&mut self) {
        // Best-effort withdraw on drop
        if self.service_fullname.is_some() {
            let _ = self.unregister();
        }
    }
}

/// Commands for the advertiser task
#[derive(Debug)]
enum AdvertiserCommand {
    Shutdown,
}

/// Async-friendly RAOP advertiser
///
/// Runs the synchronous mdns-sd advertiser on a blocking task.
/// Registration is confirmed before `start` returns, so publish failure
/// fails the caller instead of being logged and lost.
pub struct RaopAdvertiser {
    command_tx: mpsc::Sender<AdvertiserCommand>,
    service_name: String,
}

impl RaopAdvertiser {
    /// Create, register and start the advertiser.
    ///
    /// # Errors
    ///
    /// Returns an error if daemon creation, MAC retrieval or service
    /// registration fails; on failure nothing stays published.
    pub async fn start(config: AdvertiserConfig) -> Result<Self, AdvertiserError> {
        let (command_tx, mut command_rx) = mpsc::channel(4);
        let (ready_tx, ready_rx) = oneshot::channel();

        tokio::task::spawn_blocking(move || {
            let mut advertiser = match ServiceAdvertiser::new(config) {
                Ok(a) => a,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = advertiser.register() {
                let _ = ready_tx.send(Err(e));
                return;
            }

            let service_name = advertiser.service_name();
            if ready_tx.send(Ok(service_name)).is_err() {
                return;
            }

            // Hold the registration until shutdown
            while let Some(cmd) = command_rx.blocking_recv() {
                match cmd {
                    AdvertiserCommand::Shutdown => break,
                }
            }

            let _ = advertiser.unregister();
        });

        let service_name = ready_rx.await.map_err(|_| AdvertiserError::TaskExited)??;

        Ok(Self {
            command_tx,
            service_name,
        })
    }

    /// Get the instance name being advertised
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Withdraw the service and stop the advertiser task
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(AdvertiserCommand::Shutdown).await;
    }
}
