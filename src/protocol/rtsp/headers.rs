/// Well-known RTSP header names
pub mod names {
    pub const CSEQ: &str = "CSeq";
    pub const CONTENT_TYPE: &str = "Content-Type";
    pub const CONTENT_LENGTH: &str = "Content-Length";
    pub const SESSION: &str = "Session";
    pub const TRANSPORT: &str = "Transport";
    pub const PUBLIC: &str = "Public";
    pub const AUTHORIZATION: &str = "Authorization";
    pub const WWW_AUTHENTICATE: &str = "WWW-Authenticate";
}

/// RAOP-specific header names
pub mod raop {
    /// Challenge sent by the client for receiver authentication
    pub const APPLE_CHALLENGE: &str = "Apple-Challenge";
    /// Signed response to the challenge
    pub const APPLE_RESPONSE: &str = "Apple-Response";
    /// Audio jack status reported on SETUP/RECORD
    pub const AUDIO_JACK_STATUS: &str = "Audio-Jack-Status";
}

/// RTSP header collection
///
/// Keys compare case-insensitively; iteration preserves arrival order and
/// re-inserting a name replaces the earlier value in place (duplicates keep
/// last).
#[derive(Debug, Clone, Default)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// Create empty headers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header (case-insensitive key comparison)
    ///
    /// If a header with the same name already exists its value is replaced
    /// and its position kept; the new key casing is preserved.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self
            .inner
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            *entry = (name, value);
        } else {
            self.inner.push((name, value));
        }
    }

    /// Get header value (case-insensitive)
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check if header exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get `CSeq` value
    #[must_use]
    pub fn cseq(&self) -> Option<u32> {
        self.get(names::CSEQ)?.trim().parse().ok()
    }

    /// Get Content-Length value
    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        self.get(names::CONTENT_LENGTH)?.trim().parse().ok()
    }

    /// Get Content-Type value
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.get(names::CONTENT_TYPE)
    }

    /// Iterate over all headers in arrival order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("Content-Length", "42");

        assert_eq!(headers.get("content-length"), Some("42"));
        assert_eq!(headers.get("CONTENT-LENGTH"), Some("42"));
        assert_eq!(headers.content_length(), Some(42));
    }

    #[test]
    fn test_duplicate_keeps_last() {
        let mut headers = Headers::new();
        headers.insert("CSeq", "1");
        headers.insert("cseq", "2");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.cseq(), Some(2));
    }

    #[test]
    fn test_iteration_preserves_order() {
        let mut headers = Headers::new();
        headers.insert("CSeq", "7");
        headers.insert("Session", "DEADBEEF");
        headers.insert("Transport", "RTP/AVP/TCP");

        let names: Vec<&str> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["CSeq", "Session", "Transport"]);
    }
}
