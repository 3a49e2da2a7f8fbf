//! Table walking and row reconstruction.

use std::collections::BTreeMap;

use crate::catalog::{ColumnDefinition, RowFields, ScalarValue, TableDefinition};
use crate::session::{ProtocolSession, SessionError};

use super::types::Row;

/// Walk one table subtree and reconstruct its rows.
///
/// The trailing two numeric OID components of each element are parsed as
/// (column, row index). Unknown columns are ignored; a per-element
/// protocol error is skipped and its cause recorded in the returned error
/// list, so the pass it belongs to turns partial; unparseable elements are
/// skipped with only a log; a failed transform degrades that single field
/// to `None`. After accumulation each row runs the table's `calc`
/// (failures keep the row) and `filter` (failures keep the row: fail-open,
/// a corrupt predicate must not hide inventory). Rows are returned sorted
/// by ascending numeric row index.
pub async fn walk_table(
    session: &mut (dyn ProtocolSession + '_),
    table: &TableDefinition,
) -> Result<(Vec<Row>, Vec<String>), SessionError> {
    let varbinds = session.walk(table.base_oid).await?;

    let mut rows: BTreeMap<u32, RowFields> = BTreeMap::new();
    let mut errors = Vec::new();
    for varbind in varbinds {
        let wire = match &varbind.value {
            Ok(wire) => wire,
            Err(err) => {
                tracing::debug!(
                    table = table.name,
                    oid = %varbind.oid,
                    error = %err,
                    "table element failed"
                );
                errors.push(format!("{}: {err}", varbind.oid));
                continue;
            }
        };

        let Some((column, row_index)) = parse_column_row(&varbind.oid) else {
            tracing::debug!(table = table.name, oid = %varbind.oid, "unparseable table oid");
            continue;
        };
        let Some(column_def) = table.column(column) else {
            continue;
        };

        let value = decode_column(table, column_def, wire.normalize());
        rows.entry(row_index)
            .or_default()
            .insert(column_def.name.to_string(), value);
    }

    // BTreeMap iteration yields rows in ascending index order.
    let mut out = Vec::with_capacity(rows.len());
    for (index, mut fields) in rows {
        if let Some(calc) = &table.calc {
            match calc.eval(&fields) {
                Ok(Some((name, value))) => {
                    fields.insert(name.to_string(), Some(value));
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        table = table.name,
                        row = index,
                        error = %err,
                        "row calculation failed"
                    );
                }
            }
        }

        if let Some(filter) = &table.filter {
            match filter.eval(&fields) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    tracing::warn!(
                        table = table.name,
                        row = index,
                        error = %err,
                        "row filter failed, keeping row"
                    );
                }
            }
        }

        out.push(Row { index, fields });
    }
    Ok((out, errors))
}

/// Trailing two numeric components of a table element OID.
fn parse_column_row(oid: &str) -> Option<(u32, u32)> {
    let mut parts = oid.rsplit('.').filter(|p| !p.is_empty());
    let row = parts.next()?.parse().ok()?;
    let column = parts.next()?.parse().ok()?;
    Some((column, row))
}

fn decode_column(
    table: &TableDefinition,
    column: &ColumnDefinition,
    value: Option<ScalarValue>,
) -> Option<ScalarValue> {
    let value = value?;
    match &column.transform {
        None => Some(value),
        Some(transform) => match transform.apply(value) {
            Ok(v) => Some(v),
            Err(err) => {
                tracing::warn!(
                    table = table.name,
                    column = column.name,
                    error = %err,
                    "column transform failed"
                );
                None
            }
        },
    }
}
