//! Scalar metric collection.

use std::collections::BTreeMap;

use crate::catalog::{MetricDefinition, ScalarValue};
use crate::session::{ProtocolSession, SessionError, WireValue};

/// Fetch a batch of scalar metrics in one round trip.
///
/// The returned mapping always has exactly one entry per requested metric;
/// failed entries carry `None`. A per-OID protocol error degrades its own
/// entry and records a cause in the returned error list, so the pass it
/// belongs to turns partial. A failed transform degrades its entry with
/// only a log. The call fails only when the round trip itself fails
/// (timeout, transport).
pub async fn collect_scalars(
    session: &mut (dyn ProtocolSession + '_),
    metrics: &[MetricDefinition],
) -> Result<(BTreeMap<String, Option<ScalarValue>>, Vec<String>), SessionError> {
    let oids: Vec<&str> = metrics.iter().map(|m| m.oid).collect();
    let varbinds = session.get_many(&oids).await?;

    let mut values = BTreeMap::new();
    let mut errors = Vec::new();
    for (i, metric) in metrics.iter().enumerate() {
        let value = match varbinds.get(i) {
            Some(varbind) => match &varbind.value {
                Ok(wire) => decode_scalar(metric, wire),
                Err(err) => {
                    tracing::debug!(
                        metric = metric.name,
                        oid = metric.oid,
                        error = %err,
                        "scalar varbind failed"
                    );
                    errors.push(format!("{}: {err}", metric.name));
                    None
                }
            },
            None => {
                tracing::warn!(metric = metric.name, "missing varbind in response");
                errors.push(format!("{}: missing varbind in response", metric.name));
                None
            }
        };
        values.insert(metric.name.to_string(), value);
    }
    Ok((values, errors))
}

fn decode_scalar(metric: &MetricDefinition, wire: &WireValue) -> Option<ScalarValue> {
    let value = wire.normalize()?;
    match &metric.transform {
        None => Some(value),
        Some(transform) => match transform.apply(value) {
            Ok(v) => Some(v),
            Err(err) => {
                tracing::warn!(
                    metric = metric.name,
                    oid = metric.oid,
                    error = %err,
                    "scalar transform failed"
                );
                None
            }
        },
    }
}
