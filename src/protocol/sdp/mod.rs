//! Minimal SDP parsing for RAOP ANNOUNCE bodies

pub mod parser;
pub mod raop;

pub use parser::{SdpParseError, SdpParser};
pub use raop::AnnounceParams;

use std::collections::HashMap;

/// A parsed session description
#[derive(Debug, Clone, Default)]
pub struct SessionDescription {
    /// Protocol version (v=)
    pub version: u32,
    /// Session name (s=)
    pub session_name: String,
    /// Session-level attributes (a=)
    pub attributes: HashMap<String, Option<String>>,
    /// Media sections (m=)
    pub media: Vec<MediaDescription>,
}

impl SessionDescription {
    /// Get the first audio media section
    #[must_use]
    pub fn audio_media(&self) -> Option<&MediaDescription> {
        self.media.iter().find(|m| m.media_type == "audio")
    }
}

/// A media section within a session description
#[derive(Debug, Clone)]
pub struct MediaDescription {
    /// Media type (e.g., "audio")
    pub media_type: String,
    /// Transport protocol token
    pub protocol: String,
    /// Format identifiers
    pub formats: Vec<String>,
    /// Media-level attributes (a=)
    pub attributes: HashMap<String, Option<String>>,
}

impl MediaDescription {
    /// Get a media attribute's value, if the attribute carries one
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)?.as_deref()
    }
}
