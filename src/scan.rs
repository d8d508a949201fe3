//! Filling records from result rows.

use std::collections::{HashMap, VecDeque};

use crate::error::Error;
use crate::record::Record;
use crate::reflect::{FieldPath, StructCache, StructDescriptor};
use crate::value::Value;

/// A cursor over the rows of a query result.
///
/// The cursor starts before the first row; call [`advance`](Self::advance)
/// to move onto each row before scanning it.
pub trait RowCursor {
    /// Names of the result columns, in order.
    fn columns(&self) -> crate::Result<Vec<String>>;

    /// Moves to the next row, returning `false` when there are no more rows
    /// or an error occurred (see [`last_error`](Self::last_error)).
    fn advance(&mut self) -> bool;

    /// Reads every column of the current row.
    fn scan(&mut self) -> crate::Result<Vec<Value>>;

    /// The error that stopped iteration, if any.
    fn last_error(&mut self) -> crate::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> crate::Result<()> {
        Ok(())
    }
}

/// Rows held in memory.
///
/// Used for buffered driver results and as a stand-in cursor in tests.
///
/// ```
/// use sqlsw::{MemoryRows, RowCursor, Value};
///
/// let mut rows = MemoryRows::new(["id", "name"])
///     .with_row([Value::Int(1), Value::from("Ada")]);
/// assert!(rows.advance());
/// assert_eq!(rows.scan()?[1], Value::from("Ada"));
/// assert!(!rows.advance());
/// # Ok::<(), sqlsw::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRows {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    closed: bool,
}

impl MemoryRows {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_row(mut self, row: impl IntoIterator<Item = Value>) -> Self {
        self.push_row(row);
        self
    }

    pub fn push_row(&mut self, row: impl IntoIterator<Item = Value>) {
        self.rows.push_back(row.into_iter().collect());
    }

    /// Rows not yet advanced onto.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RowCursor for MemoryRows {
    fn columns(&self) -> crate::Result<Vec<String>> {
        Ok(self.columns.clone())
    }

    fn advance(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.current = self.rows.pop_front();
        self.current.is_some()
    }

    fn scan(&mut self) -> crate::Result<Vec<Value>> {
        self.current.clone().ok_or(Error::NoCurrentRow)
    }

    fn close(&mut self) -> crate::Result<()> {
        self.closed = true;
        self.current = None;
        self.rows.clear();
        Ok(())
    }
}

/// Destination of each result column: a field, or nothing when the column
/// is discarded.
fn plan<'d>(
    columns: &[String],
    descriptor: &'d StructDescriptor,
    unsafe_mode: bool,
) -> crate::Result<Vec<Option<&'d FieldPath>>> {
    columns
        .iter()
        .map(|column| match descriptor.field(column) {
            Some(field) => Ok(Some(field)),
            None if unsafe_mode => {
                tracing::trace!(column = %column, "discarding unmapped column");
                Ok(None)
            }
            None => Err(Error::UnmappedColumn {
                column: column.clone(),
                record: descriptor.record().name(),
            }),
        })
        .collect()
}

fn fill(
    cursor: &mut impl RowCursor,
    targets: &[Option<&FieldPath>],
    descriptor: &StructDescriptor,
    dest: &mut dyn Record,
) -> crate::Result<()> {
    let values = cursor.scan()?;
    if values.len() != targets.len() {
        return Err(Error::ColumnCount {
            expected: targets.len(),
            actual: values.len(),
        });
    }
    for (value, target) in values.into_iter().zip(targets) {
        if let Some(field) = target {
            field
                .write(dest, value)
                .map_err(|err| descriptor.located(err))?;
        }
    }
    Ok(())
}

/// Copies the current row of `cursor` into `dest`.
///
/// Every column must have a field on `T` unless `unsafe_mode` is set, in
/// which case unmapped columns are read and thrown away. The row is decoded
/// into a fresh `T::default()` first, so `dest` is untouched on error.
pub fn scan_row<T: Record + Default>(
    cursor: &mut impl RowCursor,
    dest: &mut T,
    cache: &StructCache,
    unsafe_mode: bool,
) -> crate::Result<()> {
    let descriptor = cache.describe::<T>()?;
    let columns = cursor.columns()?;
    let targets = plan(&columns, &descriptor, unsafe_mode)?;
    let mut staged = T::default();
    fill(cursor, &targets, &descriptor, &mut staged)?;
    cursor.last_error()?;
    *dest = staged;
    Ok(())
}

fn scan_each<T, F>(
    cursor: &mut impl RowCursor,
    cache: &StructCache,
    unsafe_mode: bool,
    push: F,
) -> crate::Result<()>
where
    T: Record + Default,
    F: FnMut(T),
{
    let scanned = scan_rows(cursor, cache, unsafe_mode, push);
    // a scan error takes precedence over a close error
    let closed = cursor.close();
    scanned.and(closed)
}

fn scan_rows<T, F>(
    cursor: &mut impl RowCursor,
    cache: &StructCache,
    unsafe_mode: bool,
    mut push: F,
) -> crate::Result<()>
where
    T: Record + Default,
    F: FnMut(T),
{
    let descriptor = cache.describe::<T>()?;
    let columns = cursor.columns()?;
    let targets = plan(&columns, &descriptor, unsafe_mode)?;
    while cursor.advance() {
        let mut item = T::default();
        fill(cursor, &targets, &descriptor, &mut item)?;
        push(item);
    }
    cursor.last_error()
}

/// Reads all remaining rows into `dest`, replacing its contents, then
/// closes the cursor.
///
/// The cursor is closed on error too, and `dest` is left empty.
pub fn scan_all<T: Record + Default>(
    cursor: &mut impl RowCursor,
    dest: &mut Vec<T>,
    cache: &StructCache,
    unsafe_mode: bool,
) -> crate::Result<()> {
    dest.clear();
    let mut items = Vec::new();
    scan_each(cursor, cache, unsafe_mode, |item: T| items.push(item))?;
    dest.extend(items);
    Ok(())
}

/// Like [`scan_all`], for a vector of boxed records.
pub fn scan_all_boxed<T: Record + Default>(
    cursor: &mut impl RowCursor,
    dest: &mut Vec<Box<T>>,
    cache: &StructCache,
    unsafe_mode: bool,
) -> crate::Result<()> {
    dest.clear();
    let mut items = Vec::new();
    scan_each(cursor, cache, unsafe_mode, |item: T| items.push(Box::new(item)))?;
    dest.extend(items);
    Ok(())
}

/// Reads the current row as column name to value.
pub fn map_scan(cursor: &mut impl RowCursor) -> crate::Result<HashMap<String, Value>> {
    let columns = cursor.columns()?;
    let values = slice_scan(cursor)?;
    Ok(columns.into_iter().zip(values).collect())
}

/// Reads the current row as values in column order.
pub fn slice_scan(cursor: &mut impl RowCursor) -> crate::Result<Vec<Value>> {
    let values = cursor.scan()?;
    cursor.last_error()?;
    Ok(values)
}
