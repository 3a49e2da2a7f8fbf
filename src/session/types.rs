//! Session traits and wire-level value types.

use std::fmt::Write as _;
use std::time::Duration;

use thiserror::Error;

use crate::catalog::ScalarValue;
use crate::config::DeviceConfig;

/// The device could not be reached for an entire pass.
///
/// Aborts only the pass it occurred in; the device's collector keeps
/// running.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("protocol version {0} is not supported")]
    UnsupportedVersion(String),

    #[error("failed to open session to {target}: {reason}")]
    Open { target: String, reason: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid OID '{0}'")]
    InvalidOid(String),
}

/// Per-element protocol failure for a single OID or table element.
///
/// Absorbed by the collectors: the affected field degrades to `None` and
/// the poll continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VarbindError {
    #[error("no such object")]
    NoSuchObject,
    #[error("no such instance")]
    NoSuchInstance,
    #[error("end of MIB view")]
    EndOfMibView,
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// An owned, decoded wire value as returned by the protocol client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    Boolean(bool),
    Int(i64),
    OctetString(Vec<u8>),
    ObjectId(String),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    Timeticks(u32),
    Counter64(u64),
    Opaque(Vec<u8>),
    Null,
}

impl WireValue {
    /// Normalize into a portable scalar.
    ///
    /// Octet strings become UTF-8 text when valid and hex text otherwise;
    /// opaque bytes always become hex text; `Null` carries no value.
    pub fn normalize(&self) -> Option<ScalarValue> {
        match self {
            WireValue::Boolean(b) => Some(ScalarValue::Int(i64::from(*b))),
            WireValue::Int(v) => Some(ScalarValue::Int(*v)),
            WireValue::OctetString(bytes) => Some(match std::str::from_utf8(bytes) {
                Ok(s) => ScalarValue::Text(s.to_string()),
                Err(_) => ScalarValue::Text(hex_string(bytes)),
            }),
            WireValue::ObjectId(oid) => Some(ScalarValue::Text(oid.clone())),
            WireValue::IpAddress(octets) => Some(ScalarValue::Text(format!(
                "{}.{}.{}.{}",
                octets[0], octets[1], octets[2], octets[3]
            ))),
            WireValue::Counter32(v) | WireValue::Gauge32(v) | WireValue::Timeticks(v) => {
                Some(ScalarValue::Uint(u64::from(*v)))
            }
            WireValue::Counter64(v) => Some(ScalarValue::Uint(*v)),
            WireValue::Opaque(bytes) => Some(ScalarValue::Text(hex_string(bytes))),
            WireValue::Null => None,
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// One (OID, value) pair returned by a protocol operation, or a
/// per-element error marker for that OID.
#[derive(Debug, Clone)]
pub struct Varbind {
    pub oid: String,
    pub value: Result<WireValue, VarbindError>,
}

/// An open management-protocol session to one device.
///
/// Sessions are scoped to a single collection pass and release their
/// transport when dropped.
#[async_trait::async_trait]
pub trait ProtocolSession: Send {
    /// Fetch a batch of exact OIDs.
    ///
    /// Returns one varbind per requested OID, in request order. Per-OID
    /// failures are carried inside the varbind; only a transport failure or
    /// timeout fails the call.
    async fn get_many(&mut self, oids: &[&str]) -> Result<Vec<Varbind>, SessionError>;

    /// Walk the subtree rooted at `base_oid`.
    ///
    /// Returns all varbinds under the base in walk order. A failure of the
    /// walk itself (not a single element) fails the call.
    async fn walk(&mut self, base_oid: &str) -> Result<Vec<Varbind>, SessionError>;
}

/// Opens protocol sessions from device configuration.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    async fn open(&self, device: &DeviceConfig)
    -> Result<Box<dyn ProtocolSession>, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_octets() {
        let v = WireValue::OctetString(b"hello".to_vec());
        assert_eq!(v.normalize(), Some(ScalarValue::Text("hello".into())));
    }

    #[test]
    fn test_normalize_binary_octets_to_hex() {
        let v = WireValue::OctetString(vec![0x00, 0x1a, 0xff]);
        assert_eq!(v.normalize(), Some(ScalarValue::Text("0x001aff".into())));
    }

    #[test]
    fn test_normalize_large_counter() {
        let v = WireValue::Counter64(u64::MAX);
        assert_eq!(v.normalize(), Some(ScalarValue::Uint(u64::MAX)));
    }

    #[test]
    fn test_normalize_ip_address() {
        let v = WireValue::IpAddress([192, 168, 1, 10]);
        assert_eq!(v.normalize(), Some(ScalarValue::Text("192.168.1.10".into())));
    }

    #[test]
    fn test_normalize_null() {
        assert_eq!(WireValue::Null.normalize(), None);
    }
}
