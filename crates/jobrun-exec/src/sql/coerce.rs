use jobrun_db::CellValue;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoerceError {
    #[error("value is null")]
    Null,
    #[error("cannot parse {kind} value {value:?} as a number")]
    NotNumeric { kind: &'static str, value: String },
}

/// Read a cell as a sample value.
///
/// Integers and floats convert directly; text, bytes and any other value are
/// rendered and parsed. Never panics.
pub fn to_f64(cell: &CellValue) -> Result<f64, CoerceError> {
    match cell {
        CellValue::Null => Err(CoerceError::Null),
        CellValue::Int(v) => Ok(*v as f64),
        CellValue::UInt(v) => Ok(*v as f64),
        CellValue::Float(v) => Ok(*v),
        CellValue::Text(s) => parse("text", s),
        CellValue::Bytes(b) => parse("bytes", &String::from_utf8_lossy(b)),
        CellValue::Other(s) => parse("other", s),
    }
}

fn parse(kind: &'static str, raw: &str) -> Result<f64, CoerceError> {
    raw.trim().parse::<f64>().map_err(|_| CoerceError::NotNumeric {
        kind,
        value: raw.to_string(),
    })
}
