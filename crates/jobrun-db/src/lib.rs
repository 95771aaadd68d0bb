//! Database access for SQL tasks.
//!
//! The pipeline is: [`build_dsn`] turns request parameters into a connection
//! descriptor, [`open`] turns the descriptor plus [`ConnectionOptions`] into a
//! request-scoped [`Connection`], and [`Connection::query`] streams rows through
//! a [`RowCursor`].
//!
//! Postgres, MySQL and SQLite each get a single-use `sqlx` pool of their own
//! driver, and cells are mapped into [`CellValue`] by the column's wire type.
//! SQL Server goes through `tiberius`.
//!
//! [`ConnectionOptions`]: jobrun_model::ConnectionOptions

mod error;
pub use error::DbError;

mod engine;
pub use engine::Engine;

mod dsn;
pub use dsn::{DsnParts, build_dsn, redact_dsn};

mod descriptor;
pub use descriptor::Descriptor;

mod connect;

mod conn;
pub use conn::{Connection, open};

mod cursor;
pub use cursor::{CellValue, Row, RowCursor};
