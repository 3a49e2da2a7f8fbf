//! SNMP session adapter backed by `snmp2`.

use std::time::Duration;

use snmp2::{AsyncSession, Oid, Value};
use tokio::time::timeout;

use crate::config::{DeviceConfig, SnmpVersion};

use super::types::{
    ProtocolSession, SessionError, SessionFactory, Varbind, VarbindError, WireValue,
};

/// GETBULK max-repetitions used while walking subtrees.
const WALK_MAX_REPETITIONS: u32 = 20;

/// Parse a dotted-decimal OID string into an `snmp2` OID.
pub fn parse_oid(s: &str) -> Result<Oid<'static>, SessionError> {
    let parts: Result<Vec<u64>, _> = s
        .trim()
        .split('.')
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u64>())
        .collect();

    let parts = parts.map_err(|_| SessionError::InvalidOid(s.to_string()))?;
    Oid::from(&parts).map_err(|_| SessionError::InvalidOid(s.to_string()))
}

/// Opens real SNMP sessions over UDP.
#[derive(Debug, Default)]
pub struct SnmpSessionFactory;

impl SnmpSessionFactory {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl SessionFactory for SnmpSessionFactory {
    async fn open(
        &self,
        device: &DeviceConfig,
    ) -> Result<Box<dyn ProtocolSession>, SessionError> {
        let target = device.target();
        let community = device.community.as_bytes();

        let session = match device.version {
            SnmpVersion::V1 => AsyncSession::new_v1(&target, community, 0).await,
            SnmpVersion::V2c => AsyncSession::new_v2c(&target, community, 0).await,
            // Reserved in the config model; no USM support yet.
            SnmpVersion::V3 => {
                return Err(SessionError::UnsupportedVersion(
                    SnmpVersion::V3.to_string(),
                ));
            }
        }
        .map_err(|e| SessionError::Open {
            target: target.clone(),
            reason: format!("{e:?}"),
        })?;

        tracing::debug!(target = %target, version = %device.version, "session opened");
        Ok(Box::new(SnmpSession {
            session,
            bulk: device.version == SnmpVersion::V2c,
            timeout: device.timeout,
            retries: device.retries,
        }))
    }
}

/// One live SNMP session; dropped at the end of the pass that opened it.
pub struct SnmpSession {
    session: AsyncSession,
    /// GETBULK is a v2c operation; v1 walks fall back to GETNEXT.
    bulk: bool,
    timeout: Duration,
    retries: u8,
}

#[async_trait::async_trait]
impl ProtocolSession for SnmpSession {
    async fn get_many(&mut self, oids: &[&str]) -> Result<Vec<Varbind>, SessionError> {
        let mut out = Vec::with_capacity(oids.len());
        for oid_str in oids {
            let value = match parse_oid(oid_str) {
                Ok(oid) => self.get_one(&oid).await?,
                // A malformed catalog OID poisons only its own entry.
                Err(e) => Err(VarbindError::Protocol(e.to_string())),
            };
            out.push(Varbind {
                oid: (*oid_str).to_string(),
                value,
            });
        }
        Ok(out)
    }

    async fn walk(&mut self, base_oid: &str) -> Result<Vec<Varbind>, SessionError> {
        let base = parse_oid(base_oid)?;
        if self.bulk {
            self.walk_bulk(&base).await
        } else {
            self.walk_next(&base).await
        }
    }
}

impl SnmpSession {
    /// Fetch a single OID with per-attempt timeout and retry on timeout.
    ///
    /// Protocol-level failures are per-OID results; only exhausted timeouts
    /// abort the batch.
    async fn get_one(
        &mut self,
        oid: &Oid<'_>,
    ) -> Result<Result<WireValue, VarbindError>, SessionError> {
        let attempts = u32::from(self.retries) + 1;
        for attempt in 1..=attempts {
            match timeout(self.timeout, self.session.get(oid)).await {
                Ok(Ok(pdu)) => {
                    let Some((_, value)) = pdu.varbinds.into_iter().next() else {
                        return Ok(Err(VarbindError::Protocol("empty response".to_string())));
                    };
                    return Ok(convert_value(&value));
                }
                Ok(Err(e)) => {
                    return Ok(Err(VarbindError::Protocol(format!("{e:?}"))));
                }
                Err(_) if attempt < attempts => {
                    tracing::debug!(attempt, "GET timed out, retrying");
                }
                Err(_) => return Err(SessionError::Timeout(self.timeout)),
            }
        }
        unreachable!("retry loop always returns");
    }

    /// GETBULK-based subtree walk (v2c).
    async fn walk_bulk(&mut self, base: &Oid<'_>) -> Result<Vec<Varbind>, SessionError> {
        let mut results = Vec::new();
        let mut current = base.to_owned();

        loop {
            let pdu = match timeout(
                self.timeout,
                self.session.getbulk(&[&current], 0, WALK_MAX_REPETITIONS),
            )
            .await
            {
                Ok(Ok(pdu)) => pdu,
                Ok(Err(e)) => return Err(SessionError::Transport(format!("{e:?}"))),
                Err(_) => return Err(SessionError::Timeout(self.timeout)),
            };

            let mut advanced = false;
            for (oid, value) in pdu.varbinds {
                if !oid.starts_with(base) || matches!(value, Value::EndOfMibView) {
                    return Ok(results);
                }
                results.push(Varbind {
                    oid: oid.to_string(),
                    value: convert_value(&value),
                });
                current = oid.to_owned();
                advanced = true;
            }
            if !advanced {
                return Ok(results);
            }
        }
    }

    /// GETNEXT-based subtree walk (v1).
    async fn walk_next(&mut self, base: &Oid<'_>) -> Result<Vec<Varbind>, SessionError> {
        let mut results = Vec::new();
        let mut current = base.to_owned();

        loop {
            let pdu = match timeout(self.timeout, self.session.getnext(&current)).await {
                Ok(Ok(pdu)) => pdu,
                Ok(Err(e)) => return Err(SessionError::Transport(format!("{e:?}"))),
                Err(_) => return Err(SessionError::Timeout(self.timeout)),
            };

            let Some((oid, value)) = pdu.varbinds.into_iter().next() else {
                return Ok(results);
            };
            if !oid.starts_with(base) || matches!(value, Value::EndOfMibView) {
                return Ok(results);
            }
            results.push(Varbind {
                oid: oid.to_string(),
                value: convert_value(&value),
            });
            current = oid.to_owned();
        }
    }
}

/// Convert a borrowed `snmp2` value into an owned wire value or a
/// per-element error marker.
fn convert_value(value: &Value<'_>) -> Result<WireValue, VarbindError> {
    match value {
        Value::Boolean(b) => Ok(WireValue::Boolean(*b)),
        Value::Integer(v) => Ok(WireValue::Int(*v)),
        Value::OctetString(bytes) => Ok(WireValue::OctetString(bytes.to_vec())),
        Value::ObjectIdentifier(oid) => Ok(WireValue::ObjectId(oid.to_string())),
        Value::IpAddress(octets) => Ok(WireValue::IpAddress(*octets)),
        Value::Counter32(v) => Ok(WireValue::Counter32(*v)),
        Value::Unsigned32(v) => Ok(WireValue::Gauge32(*v)),
        Value::Timeticks(v) => Ok(WireValue::Timeticks(*v)),
        Value::Counter64(v) => Ok(WireValue::Counter64(*v)),
        Value::Opaque(bytes) => Ok(WireValue::Opaque(bytes.to_vec())),
        Value::Null => Ok(WireValue::Null),
        Value::NoSuchObject => Err(VarbindError::NoSuchObject),
        Value::NoSuchInstance => Err(VarbindError::NoSuchInstance),
        Value::EndOfMibView => Err(VarbindError::EndOfMibView),
        other => Err(VarbindError::Protocol(format!(
            "unexpected value type: {other:?}"
        ))),
    }
}
