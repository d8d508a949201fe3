//! # sqlsw
//!
//! Named parameters and record mapping on top of SQLx.
//!
//! ## Features
//!
//! - **Named Placeholders**: Write `:param_name` in SQL and have it rewritten to the
//!   driver's own placeholders (`?`, `$1`, `@1` or `:name`)
//! - **Literal Aware**: Text inside quotes and `::` casts are never mistaken for parameters
//! - **Record Mapping**: Bind parameters from structs or maps and fill structs from rows,
//!   including nested and embedded structs
//! - **Cached Reflection**: Each record type is described once per [`Mapper`]
//! - **Generic Executor Support**: Runs through `MySqlPool`, `Transaction`, and any SQLx
//!   `Executor`
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sqlx = { version = "0.8", features = ["mysql", "runtime-tokio"] }
//! sqlsw = "0.1"
//! ```
//!
//! ## Examples
//!
//! ### Rewriting a Query
//!
//! ```rust
//! use sqlsw::{parse, BindStyle, ParseOptions};
//!
//! let parsed = parse(
//!     "SELECT * FROM users WHERE id = :id AND created::date > :since",
//!     ParseOptions::new(BindStyle::Dollar),
//! )?;
//! assert_eq!(parsed.query(), "SELECT * FROM users WHERE id = $1 AND created::date > $2");
//! assert_eq!(parsed.parameters(), ["id", "since"]);
//! # Ok::<(), sqlsw::Error>(())
//! ```
//!
//! ### Binding a Record
//!
//! ```rust
//! use sqlsw::{record, BindStyle, Mapper, Value};
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! record!(User {
//!     column id: "id",
//!     column name: "name",
//! });
//!
//! let mapper = Mapper::new(BindStyle::Question);
//! let user = User { id: 42, name: "John Doe".to_owned() };
//! let (sql, values) = mapper.bind_named("INSERT INTO users (id, name) VALUES (:id, :name)", &user)?;
//! assert_eq!(sql, "INSERT INTO users (id, name) VALUES (?, ?)");
//! assert_eq!(values, [Value::Int(42), Value::from("John Doe")]);
//! # Ok::<(), sqlsw::Error>(())
//! ```
//!
//! ### Running Against MySQL
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use sqlx::MySqlPool;
//! use sqlsw::{record, Mapper};
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! record!(User {
//!     column id: "id",
//!     column name: "name",
//! });
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = MySqlPool::connect("mysql://localhost/test").await?;
//! let mapper = Mapper::for_driver("mysql")?;
//!
//! let args = HashMap::from([("email", "user@example.com".to_owned())]);
//! let query = mapper.query("SELECT id, name FROM users WHERE email = :email", &args)?;
//! match query.fetch_optional::<User, _>(&pool).await? {
//!     Some(user) => println!("Found user: {}", user.name),
//!     None => println!("User not found"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## How It Works
//!
//! 1. **Parse**: A single left-to-right pass replaces each `:name` with a placeholder and
//!    records the names in order
//! 2. **Bind**: Each name is resolved against the argument, a map or a record described
//!    by the [`Mapper`]'s cache
//! 3. **Execute**: A fresh SQLx `Query` is built from the rewritten SQL and values on each
//!    execution
//! 4. **Scan**: Result columns are matched to record fields by the same names
//!
//! ## Limitations
//!
//! - Only MySQL has an SQLx adapter; the rewriter and mapper work for any bind style
//! - Parameter names are letters, digits, `_` and inner `.`
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at your option.

pub mod bind;
pub mod bind_style;
pub mod compat;
pub mod error;
pub mod mapper;
pub mod mysql;
pub mod parser;
pub mod query;
pub mod query_as;
pub mod record;
pub mod reflect;
pub mod scan;
pub mod value;

pub use bind::{bind_arguments, Arguments, Mapping, ToArguments};
pub use bind_style::{BindStyle, BindStyleRegistry};
pub use error::{Error, ReflectionErrors, Result, ValueError};
pub use mapper::{Mapper, MapperOptions};
pub use mysql::MySqlRows;
pub use parser::{parse, ParseOptions, ParseResult};
pub use query::NamedQuery;
pub use record::{AsRecord, FieldDef, FieldKind, FieldMut, FieldRef, Record, RecordType};
pub use reflect::{FieldPath, ReflectOptions, StructCache, StructDescriptor};
pub use scan::{map_scan, scan_all, scan_all_boxed, scan_row, slice_scan, MemoryRows, RowCursor};
pub use value::{Column, Value};

#[doc(hidden)]
pub use record::__private;

/// Convenience re-exports for common use cases
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::record;
    pub use crate::{BindStyle, Mapper, MapperOptions, NamedQuery, Record, RowCursor, Value};
}
