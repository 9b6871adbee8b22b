use std::collections::HashMap;

use thiserror::Error;

use super::{MediaDescription, SessionDescription};

/// Errors from SDP parsing
#[derive(Debug, Error)]
pub enum SdpParseError {
    #[error("invalid version line")]
    InvalidVersion,
    #[error("invalid media line: {0}")]
    InvalidMedia(String),
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// SDP parser
pub struct SdpParser;

impl SdpParser {
    /// Parse an SDP body.
    ///
    /// Only the line types a RAOP ANNOUNCE actually carries are
    /// interpreted; everything else is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SdpParseError`] if a version or media line is malformed.
    pub fn parse(input: &str) -> Result<SessionDescription, SdpParseError> {
        let mut sdp = SessionDescription::default();
        let mut current_media: Option<MediaDescription> = None;

        for line in input.lines() {
            let line = line.trim();
            if line.len() < 2 || line.as_bytes()[1] != b'=' {
                continue;
            }

            let type_char = line.as_bytes()[0];
            let value = &line[2..];

            match type_char {
                b'v' => {
                    sdp.version = value.parse().map_err(|_| SdpParseError::InvalidVersion)?;
                }
                b's' => {
                    sdp.session_name = value.to_string();
                }
                b'm' => {
                    if let Some(media) = current_media.take() {
                        sdp.media.push(media);
                    }
                    current_media = Some(Self::parse_media(value)?);
                }
                b'a' => {
                    let (name, value) = Self::parse_attribute(value);
                    if let Some(ref mut media) = current_media {
                        media.attributes.insert(name, value);
                    } else {
                        sdp.attributes.insert(name, value);
                    }
                }
                _ => {
                    // o=, c=, t= and friends carry nothing we need
                }
            }
        }

        if let Some(media) = current_media {
            sdp.media.push(media);
        }

        Ok(sdp)
    }

    fn parse_media(value: &str) -> Result<MediaDescription, SdpParseError> {
        let parts: Vec<&str> = value.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(SdpParseError::InvalidMedia(value.to_string()));
        }

        Ok(MediaDescription {
            media_type: parts[0].to_string(),
            protocol: parts[2].to_string(),
            formats: parts[3..].iter().map(ToString::to_string).collect(),
            attributes: HashMap::new(),
        })
    }

    fn parse_attribute(value: &str) -> (String, Option<String>) {
        if let Some(colon_pos) = value.find(':') {
            let name = value[..colon_pos].to_string();
            let attr_value = value[colon_pos + 1..].to_string();
            (name, Some(attr_value))
        } else {
            (value.to_string(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAOP_SDP: &str = "v=0\r\n\
        o=iTunes 3413821438 0 IN IP4 192.168.1.10\r\n\
        s=iTunes\r\n\
        c=IN IP4 192.168.1.20\r\n\
        t=0 0\r\n\
        m=audio 0 RTP/AVP 96\r\n\
        a=rtpmap:96 AppleLossless\r\n\
        a=fmtp:96 352 0 16 40 10 14 2 255 0 0 44100\r\n\
        a=rsaaeskey:AAAA\r\n\
        a=aesiv:BBBB\r\n";

    #[test]
    fn test_parse_raop_announce_body() {
        let sdp = SdpParser::parse(RAOP_SDP).unwrap();

        assert_eq!(sdp.version, 0);
        assert_eq!(sdp.session_name, "iTunes");
        assert_eq!(sdp.media.len(), 1);

        let media = sdp.audio_media().unwrap();
        assert_eq!(media.media_type, "audio");
        assert_eq!(media.formats, vec!["96"]);
        assert_eq!(
            media.attribute("fmtp"),
            Some("96 352 0 16 40 10 14 2 255 0 0 44100")
        );
        assert_eq!(media.attribute("rsaaeskey"), Some("AAAA"));
    }

    #[test]
    fn test_attributes_before_media_are_session_level() {
        let sdp = SdpParser::parse("v=0\r\na=tool:x\r\nm=audio 0 RTP/AVP 96\r\na=rtpmap:96 L16\r\n")
            .unwrap();

        assert!(sdp.attributes.contains_key("tool"));
        assert_eq!(sdp.media[0].attribute("rtpmap"), Some("96 L16"));
    }

    #[test]
    fn test_flag_attribute_without_value() {
        let sdp = SdpParser::parse("v=0\r\nm=audio 0 RTP/AVP 96\r\na=recvonly\r\n").unwrap();
        let media = sdp.audio_media().unwrap();

        assert!(media.attributes.contains_key("recvonly"));
        assert_eq!(media.attribute("recvonly"), None);
    }

    #[test]
    fn test_invalid_media_line() {
        assert!(SdpParser::parse("v=0\r\nm=audio 0\r\n").is_err());
    }

    #[test]
    fn test_unknown_lines_skipped() {
        let sdp = SdpParser::parse("v=0\r\nx=strange\r\nb=AS:128\r\n").unwrap();
        assert_eq!(sdp.version, 0);
        assert!(sdp.media.is_empty());
    }
}
