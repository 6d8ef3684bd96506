//! Wire messages for the help-request protocol.
//!
//! Defines the text formats for requests (`#NeedSupport_<period>`) and
//! responses (`Ok_<period>` / `No_<period>`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{FIELD_DELIMITER, REQUEST_TAG};
use crate::error::{QuorumError, Result};

/// Responder verdict carried by a [`Response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Responder approves the request
    Ok,
    /// Responder denies the request
    No,
}

impl Verdict {
    /// Wire token for this verdict.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::No => "No",
        }
    }

    /// Whether this verdict counts towards quorum.
    pub fn is_affirmative(&self) -> bool {
        *self == Self::Ok
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verdict {
    type Err = QuorumError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Ok" => Ok(Self::Ok),
            "No" => Ok(Self::No),
            other => Err(QuorumError::InvalidMessage(format!(
                "Unknown verdict: {other:?}"
            ))),
        }
    }
}

/// Support request broadcast by the requester once per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Period identifier (starts at 1)
    pub period: u64,
}

impl Request {
    /// Create a request for the given period
    pub fn new(period: u64) -> Self {
        Self { period }
    }

    /// Build the response a responder sends for this request.
    pub fn respond(&self, verdict: Verdict) -> Response {
        Response::new(verdict, self.period)
    }

    /// Encode into a datagram no larger than `limit` bytes.
    pub fn to_datagram(&self, limit: usize) -> Result<Vec<u8>> {
        fit_datagram(self.to_string(), limit)
    }

    /// Decode a raw datagram.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_utf8(bytes)?.parse()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{REQUEST_TAG}{FIELD_DELIMITER}{}", self.period)
    }
}

impl FromStr for Request {
    type Err = QuorumError;

    fn from_str(s: &str) -> Result<Self> {
        let (tag, period) = split_fields(s)?;
        if tag != REQUEST_TAG {
            return Err(QuorumError::InvalidMessage(format!(
                "Expected {REQUEST_TAG} tag, got {tag:?}"
            )));
        }
        Ok(Self::new(parse_period(period)?))
    }
}

/// Reply sent by a responder that decided not to stay silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Responder verdict
    pub verdict: Verdict,
    /// Period the verdict refers to
    pub period: u64,
}

impl Response {
    /// Create a response
    pub fn new(verdict: Verdict, period: u64) -> Self {
        Self { verdict, period }
    }

    /// Affirmative reply for `period`
    pub fn ok(period: u64) -> Self {
        Self::new(Verdict::Ok, period)
    }

    /// Negative reply for `period`
    pub fn no(period: u64) -> Self {
        Self::new(Verdict::No, period)
    }

    /// Encode into a datagram no larger than `limit` bytes.
    pub fn to_datagram(&self, limit: usize) -> Result<Vec<u8>> {
        fit_datagram(self.to_string(), limit)
    }

    /// Decode a raw datagram.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        decode_utf8(bytes)?.parse()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{FIELD_DELIMITER}{}", self.verdict, self.period)
    }
}

impl FromStr for Response {
    type Err = QuorumError;

    fn from_str(s: &str) -> Result<Self> {
        let (verdict, period) = split_fields(s)?;
        Ok(Self::new(verdict.parse()?, parse_period(period)?))
    }
}

/// Length in bytes of the longest message exchanged for `period`.
pub fn max_encoded_len(period: u64) -> usize {
    Request::new(period).to_string().len()
}

fn decode_utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| QuorumError::InvalidMessage(format!("Payload is not UTF-8: {e}")))
}

fn split_fields(s: &str) -> Result<(&str, &str)> {
    s.split_once(FIELD_DELIMITER).ok_or_else(|| {
        QuorumError::InvalidMessage(format!("Missing '{FIELD_DELIMITER}' delimiter in {s:?}"))
    })
}

// u64::from_str accepts a leading '+', the wire format does not.
fn parse_period(s: &str) -> Result<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QuorumError::InvalidMessage(format!(
            "Period is not a base-10 integer: {s:?}"
        )));
    }
    match s.parse::<u64>() {
        Ok(0) => Err(QuorumError::InvalidMessage(
            "Period must be positive".to_string(),
        )),
        Ok(period) => Ok(period),
        Err(e) => Err(QuorumError::InvalidMessage(format!(
            "Period out of range: {e}"
        ))),
    }
}

fn fit_datagram(text: String, limit: usize) -> Result<Vec<u8>> {
    if text.len() > limit {
        return Err(QuorumError::InvalidMessage(format!(
            "{text:?} is {} bytes, exceeds datagram limit of {limit}",
            text.len()
        )));
    }
    Ok(text.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MAX_DATAGRAM_SIZE;

    #[test]
    fn test_request_wire_format() {
        let req = Request::new(7);
        assert_eq!(req.to_string(), "#NeedSupport_7");
        assert_eq!(
            req.to_datagram(MAX_DATAGRAM_SIZE).unwrap(),
            b"#NeedSupport_7".to_vec()
        );
    }

    #[test]
    fn test_request_decode() {
        assert_eq!(Request::decode(b"#NeedSupport_12").unwrap(), Request::new(12));
    }

    #[test]
    fn test_request_rejects_wrong_prefix() {
        assert!(Request::decode(b"#NeedHelp_1").is_err());
        assert!(Request::decode(b"#NeedSupportX_1").is_err());
        assert!(Request::decode(b"needsupport_1").is_err());
        assert!(Request::decode(b"Ok_1").is_err());
    }

    #[test]
    fn test_request_rejects_malformed_suffix() {
        assert!(Request::decode(b"#NeedSupport").is_err());
        assert!(Request::decode(b"#NeedSupport_").is_err());
        assert!(Request::decode(b"#NeedSupport_abc").is_err());
        assert!(Request::decode(b"#NeedSupport_1_2").is_err());
        assert!(Request::decode(b"#NeedSupport_+3").is_err());
        assert!(Request::decode(b"#NeedSupport_0").is_err());
        assert!(Request::decode(b"#NeedSupport_-1").is_err());
    }

    #[test]
    fn test_request_rejects_non_utf8() {
        assert!(Request::decode(&[0xff, 0xfe, b'_', b'1']).is_err());
    }

    #[test]
    fn test_response_wire_format() {
        assert_eq!(Response::ok(3).to_string(), "Ok_3");
        assert_eq!(Response::no(3).to_string(), "No_3");
        assert_eq!(Request::new(9).respond(Verdict::No), Response::no(9));
    }

    #[test]
    fn test_response_decode() {
        assert_eq!(Response::decode(b"Ok_4").unwrap(), Response::ok(4));
        assert_eq!(Response::decode(b"No_10").unwrap(), Response::no(10));
    }

    #[test]
    fn test_response_rejects_unknown_verdict() {
        assert!(Response::decode(b"Yes_1").is_err());
        assert!(Response::decode(b"ok_1").is_err());
        assert!(Response::decode(b"OK_1").is_err());
        assert!(Response::decode(b"Ok").is_err());
        assert!(Response::decode(b"Ok_x").is_err());
        assert!(Response::decode(b"").is_err());
    }

    #[test]
    fn test_datagram_limit() {
        assert!(Request::new(1_000_000).to_datagram(MAX_DATAGRAM_SIZE).is_ok());
        assert!(Request::new(1).to_datagram(8).is_err());
        // 13-byte tag plus 20 digits
        assert!(Request::new(u64::MAX).to_datagram(MAX_DATAGRAM_SIZE).is_err());
        assert_eq!(max_encoded_len(999), "#NeedSupport_999".len());
    }

    #[test]
    fn test_verdict_affirmative() {
        assert!(Verdict::Ok.is_affirmative());
        assert!(!Verdict::No.is_affirmative());
        assert_eq!("No".parse::<Verdict>().unwrap(), Verdict::No);
    }
}
