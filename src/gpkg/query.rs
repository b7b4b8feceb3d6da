use crate::envelope::Envelope;
use crate::error::Result;
use crate::ogc_sql::{quote_ident, rtree_table_name};
use crate::value::Value;

use super::feature::TableSchema;

/// Attribute and/or spatial filter for [`crate::GpkgLayer`] searches.
///
/// The `WHERE` fragment is plain SQLite and may use anonymous `?`
/// placeholders, bound in order from `params`. The envelope keeps rows whose
/// geometry bounds intersect it.
///
/// ```
/// use gdb_ext::{Envelope, QueryFilter, Value};
///
/// let query = QueryFilter::new()
///     .with_where("population > ? AND name LIKE ?", [Value::from(10_000_i64), Value::from("S%")])
///     .with_envelope(Envelope::new(-10.0, 35.0, 30.0, 60.0));
/// assert!(query.envelope.is_some());
/// ```
#[derive(Clone, Debug, Default)]
pub struct QueryFilter {
    pub where_clause: Option<String>,
    pub params: Vec<Value>,
    pub envelope: Option<Envelope>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_where<I, V>(mut self, where_clause: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.where_clause = Some(where_clause.into());
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    /// SQL conditions and their parameters, bound from `?1` on.
    pub(crate) fn to_conditions(&self, schema: &TableSchema) -> Result<(Vec<String>, Vec<Value>)> {
        let mut conditions = Vec::new();
        let mut params = Vec::with_capacity(self.params.len() + 4);

        if let Some(where_clause) = &self.where_clause {
            conditions.push(where_clause.clone());
            params.extend(self.params.iter().cloned());
        }

        if let Some(envelope) = &self.envelope {
            let geometry = schema.require_geometry()?;
            let n = params.len();
            let (min_x, max_x, min_y, max_y) = (n + 1, n + 2, n + 3, n + 4);
            let condition = if geometry.has_spatial_index {
                format!(
                    "{pk} IN (SELECT id FROM {rtree} WHERE minx <= ?{max_x} AND maxx >= ?{min_x} AND miny <= ?{max_y} AND maxy >= ?{min_y})",
                    pk = quote_ident(schema.primary_key_column()),
                    rtree = quote_ident(&rtree_table_name(&schema.table_name, &geometry.name)),
                )
            } else {
                format!(
                    "ST_MinX({c}) <= ?{max_x} AND ST_MaxX({c}) >= ?{min_x} AND ST_MinY({c}) <= ?{max_y} AND ST_MaxY({c}) >= ?{min_y}",
                    c = quote_ident(&geometry.name),
                )
            };
            conditions.push(condition);
            params.extend(
                [envelope.min_x, envelope.max_x, envelope.min_y, envelope.max_y].map(Value::Real),
            );
        }

        Ok((conditions, params))
    }
}
