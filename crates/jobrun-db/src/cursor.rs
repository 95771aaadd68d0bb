use std::{fmt, sync::Arc};

use futures::{StreamExt, stream::BoxStream};
use jobrun_core::TaskContext;
use sqlx::{
    Column, ColumnIndex, Decode, Row as _, TypeInfo, ValueRef,
    mysql::MySqlRow,
    postgres::{PgRow, PgValueFormat},
    sqlite::SqliteRow,
    types::{
        Decimal, JsonValue, Uuid,
        time::{Date, OffsetDateTime, PrimitiveDateTime, Time},
    },
};
use tiberius::ColumnData;

use crate::error::DbError;

/// One database value, classified for coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Values with no numeric or textual reading (booleans, uuids, dates), rendered.
    Other(String),
}

impl CellValue {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Int(v) => write!(f, "{v}"),
            CellValue::UInt(v) => write!(f, "{v}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(v) | CellValue::Other(v) => f.write_str(v),
            CellValue::Bytes(v) => f.write_str(&String::from_utf8_lossy(v)),
        }
    }
}

/// A fetched row; column names are shared by every row of one result.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<CellValue>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<CellValue>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn get(&self, idx: usize) -> Option<&CellValue> {
        self.values.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<CellValue> {
        self.values
    }
}

/// Forward-only, single-pass stream of rows.
///
/// Every fetch runs under the context it was opened with, so a deadline that
/// expires mid-iteration surfaces as [`DbError::Context`]. Dropping the cursor
/// releases the underlying statement.
pub struct RowCursor<'c> {
    rows: BoxStream<'c, Result<Row, DbError>>,
    declared: Option<Arc<[String]>>,
    peeked: Option<Row>,
    finished: bool,
    ctx: TaskContext,
}

impl<'c> RowCursor<'c> {
    pub fn new(rows: BoxStream<'c, Result<Row, DbError>>, ctx: TaskContext) -> Self {
        Self {
            rows,
            declared: None,
            peeked: None,
            finished: false,
            ctx,
        }
    }

    /// Column names the statement declares ahead of any row.
    pub fn with_columns(mut self, declared: Option<Arc<[String]>>) -> Self {
        self.declared = declared;
        self
    }

    /// Column names of the result.
    ///
    /// The first row is fetched and held back so statement errors surface here.
    /// Declared names win; otherwise they come from that row. `None` only when
    /// the statement declared nothing and returned no rows.
    pub async fn columns(&mut self) -> Result<Option<Arc<[String]>>, DbError> {
        if self.peeked.is_none() {
            self.peeked = self.fetch().await?;
        }
        Ok(self
            .declared
            .clone()
            .or_else(|| self.peeked.as_ref().map(|row| Arc::clone(&row.columns))))
    }

    pub async fn next(&mut self) -> Result<Option<Row>, DbError> {
        if let Some(row) = self.peeked.take() {
            return Ok(Some(row));
        }
        self.fetch().await
    }

    async fn fetch(&mut self) -> Result<Option<Row>, DbError> {
        if self.finished {
            return Ok(None);
        }
        let next = self.ctx.run(self.rows.next()).await?.transpose()?;
        if next.is_none() {
            self.finished = true;
        }
        Ok(next)
    }
}

/// Adapts a driver row stream, resolving column names once.
pub(crate) fn adapt<'c, R, E, S>(
    stream: S,
    names: fn(&R) -> Vec<String>,
    values: fn(R) -> Vec<CellValue>,
) -> BoxStream<'c, Result<Row, DbError>>
where
    S: futures::Stream<Item = Result<R, E>> + Send + 'c,
    R: 'c,
    E: fmt::Display + 'c,
{
    let mut columns: Option<Arc<[String]>> = None;
    stream
        .map(move |item| {
            let row = item.map_err(DbError::query)?;
            let cols = columns
                .get_or_insert_with(|| Arc::from(names(&row)))
                .clone();
            Ok(Row::new(cols, values(row)))
        })
        .boxed()
}

pub(crate) fn sqlx_names<R: sqlx::Row>(row: &R) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Decode without the driver's compatibility check; the caller matched the type.
fn decode<'r, R, T>(row: &'r R, idx: usize) -> Option<T>
where
    R: sqlx::Row,
    usize: ColumnIndex<R>,
    T: Decode<'r, R::Database>,
{
    row.try_get_unchecked::<T, _>(idx).ok()
}

fn rendered<T: fmt::Display>(value: Option<T>) -> Option<CellValue> {
    value.map(|v| CellValue::Other(v.to_string()))
}

pub(crate) fn pg_values(row: PgRow) -> Vec<CellValue> {
    (0..row.len()).map(|i| pg_cell(&row, i)).collect()
}

fn pg_cell(row: &PgRow, idx: usize) -> CellValue {
    let Ok(raw) = row.try_get_raw(idx) else {
        return CellValue::Null;
    };
    if raw.is_null() {
        return CellValue::Null;
    }
    let info = raw.type_info();
    let cell = match info.name() {
        "BOOL" => rendered(decode::<_, bool>(row, idx)),
        "\"CHAR\"" => decode::<_, i8>(row, idx).map(|v| CellValue::Int(v.into())),
        "INT2" => decode::<_, i16>(row, idx).map(|v| CellValue::Int(v.into())),
        "INT4" => decode::<_, i32>(row, idx).map(|v| CellValue::Int(v.into())),
        "INT8" => decode::<_, i64>(row, idx).map(CellValue::Int),
        "OID" => decode::<_, sqlx::postgres::types::Oid>(row, idx).map(|v| CellValue::UInt(v.0.into())),
        "FLOAT4" => decode::<_, f32>(row, idx).map(|v| CellValue::Float(v.into())),
        "FLOAT8" => decode::<_, f64>(row, idx).map(CellValue::Float),
        "NUMERIC" => rendered(decode::<_, Decimal>(row, idx)),
        "TEXT" | "VARCHAR" | "CHAR" | "NAME" | "UNKNOWN" => {
            decode::<_, String>(row, idx).map(CellValue::Text)
        }
        "BYTEA" => decode::<_, Vec<u8>>(row, idx).map(CellValue::Bytes),
        "UUID" => rendered(decode::<_, Uuid>(row, idx)),
        "JSON" | "JSONB" => rendered(decode::<_, JsonValue>(row, idx)),
        "DATE" => rendered(decode::<_, Date>(row, idx)),
        "TIME" => rendered(decode::<_, Time>(row, idx)),
        "TIMESTAMP" => rendered(decode::<_, PrimitiveDateTime>(row, idx)),
        "TIMESTAMPTZ" => rendered(decode::<_, OffsetDateTime>(row, idx)),
        _ => None,
    };
    cell.unwrap_or_else(|| match raw.format() {
        PgValueFormat::Text => raw
            .as_str()
            .map(|s| CellValue::Text(s.to_string()))
            .unwrap_or_else(|_| CellValue::Other(String::new())),
        PgValueFormat::Binary => raw
            .as_bytes()
            .map(|b| match std::str::from_utf8(b) {
                Ok(s) => CellValue::Text(s.to_string()),
                Err(_) => CellValue::Bytes(b.to_vec()),
            })
            .unwrap_or_else(|_| CellValue::Other(String::new())),
    })
}

pub(crate) fn mysql_values(row: MySqlRow) -> Vec<CellValue> {
    (0..row.len()).map(|i| mysql_cell(&row, i)).collect()
}

fn mysql_cell(row: &MySqlRow, idx: usize) -> CellValue {
    let Ok(raw) = row.try_get_raw(idx) else {
        return CellValue::Null;
    };
    if raw.is_null() {
        return CellValue::Null;
    }
    let info = raw.type_info();
    let name = info.name();
    let cell = match name {
        "BOOLEAN" => rendered(decode::<_, bool>(row, idx)),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            decode::<_, i64>(row, idx).map(CellValue::Int)
        }
        "YEAR" | "BIT" => decode::<_, u64>(row, idx).map(CellValue::UInt),
        _ if name.ends_with(" UNSIGNED") => decode::<_, u64>(row, idx).map(CellValue::UInt),
        "FLOAT" => decode::<_, f32>(row, idx).map(|v| CellValue::Float(v.into())),
        "DOUBLE" => decode::<_, f64>(row, idx).map(CellValue::Float),
        "DECIMAL" | "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT"
        | "ENUM" | "SET" | "JSON" => decode::<_, String>(row, idx).map(CellValue::Text),
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "GEOMETRY" => {
            decode::<_, Vec<u8>>(row, idx).map(CellValue::Bytes)
        }
        "DATE" => rendered(decode::<_, Date>(row, idx)),
        "TIME" => rendered(decode::<_, Time>(row, idx)),
        "DATETIME" => rendered(decode::<_, PrimitiveDateTime>(row, idx)),
        "TIMESTAMP" => rendered(decode::<_, OffsetDateTime>(row, idx)),
        _ => None,
    };
    cell.or_else(|| decode::<_, String>(row, idx).map(CellValue::Text))
        .unwrap_or_else(|| CellValue::Other(String::new()))
}

pub(crate) fn sqlite_values(row: SqliteRow) -> Vec<CellValue> {
    (0..row.len()).map(|i| sqlite_cell(&row, i)).collect()
}

/// Keyed on the value's storage class, which SQLite tracks per cell.
fn sqlite_cell(row: &SqliteRow, idx: usize) -> CellValue {
    let Ok(raw) = row.try_get_raw(idx) else {
        return CellValue::Null;
    };
    if raw.is_null() {
        return CellValue::Null;
    }
    let info = raw.type_info();
    let cell = match info.name() {
        "INTEGER" | "BOOLEAN" => decode::<_, i64>(row, idx).map(CellValue::Int),
        "REAL" => decode::<_, f64>(row, idx).map(CellValue::Float),
        "BLOB" => decode::<_, Vec<u8>>(row, idx).map(CellValue::Bytes),
        _ => decode::<_, String>(row, idx).map(CellValue::Text),
    };
    cell.unwrap_or_else(|| CellValue::Other(String::new()))
}

pub(crate) fn tds_names(row: &tiberius::Row) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

pub(crate) fn tds_values(row: tiberius::Row) -> Vec<CellValue> {
    row.into_iter().map(|data| tds_cell(&data)).collect()
}

fn tds_cell(data: &ColumnData<'_>) -> CellValue {
    let cell = match data {
        ColumnData::U8(v) => v.map(|n| CellValue::UInt(n.into())),
        ColumnData::I16(v) => v.map(|n| CellValue::Int(n.into())),
        ColumnData::I32(v) => v.map(|n| CellValue::Int(n.into())),
        ColumnData::I64(v) => v.map(CellValue::Int),
        ColumnData::F32(v) => v.map(|n| CellValue::Float(n.into())),
        ColumnData::F64(v) => v.map(CellValue::Float),
        ColumnData::Bit(v) => v.map(|b| CellValue::Other(b.to_string())),
        ColumnData::String(v) => v.as_ref().map(|s| CellValue::Text(s.to_string())),
        ColumnData::Binary(v) => v.as_ref().map(|b| CellValue::Bytes(b.to_vec())),
        ColumnData::Guid(v) => v.as_ref().map(|g| CellValue::Other(g.to_string())),
        ColumnData::Numeric(v) => v.as_ref().map(|n| CellValue::Other(n.to_string())),
        ColumnData::DateTime(None)
        | ColumnData::SmallDateTime(None)
        | ColumnData::Date(None)
        | ColumnData::Time(None)
        | ColumnData::DateTime2(None)
        | ColumnData::DateTimeOffset(None)
        | ColumnData::Xml(None) => None,
        other => Some(CellValue::Other(format!("{other:?}"))),
    };
    cell.unwrap_or(CellValue::Null)
}
