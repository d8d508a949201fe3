//! Turning SQLx MySQL rows into a [`RowCursor`].

use sqlx::mysql::MySqlRow;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};

use crate::error::Error;
use crate::scan::{MemoryRows, RowCursor};
use crate::value::Value;

/// Buffered MySQL result rows, decoded into [`Value`]s.
///
/// Columns are decoded by their MySQL type name:
///
/// | MySQL type                                   | `Value`  |
/// |----------------------------------------------|----------|
/// | `BOOLEAN`                                    | `Bool`   |
/// | any `... UNSIGNED` integer                   | `UInt`   |
/// | `TINYINT` to `BIGINT`, `YEAR`                | `Int`    |
/// | `FLOAT`, `DOUBLE`                            | `Float`  |
/// | `DECIMAL`, `CHAR`, `VARCHAR`, `*TEXT`, `ENUM`, `SET`, `JSON` | `Text` |
/// | `BINARY`, `VARBINARY`, `*BLOB`, `BIT`        | `Bytes`  |
/// | `DATE`, `DATETIME`, `TIMESTAMP`, `TIME`      | `Text`   |
///
/// Date and time columns are rendered the way MySQL prints them, e.g.
/// `2024-01-31 08:30:00`, with fractional seconds only when present.
/// `TIMESTAMP` values are in UTC.
///
/// Any other type fails with [`Error::UnsupportedColumnType`].
#[derive(Debug, Clone, Default)]
pub struct MySqlRows {
    rows: MemoryRows,
}

impl MySqlRows {
    pub fn from_rows(rows: &[MySqlRow]) -> crate::Result<Self> {
        let Some(first) = rows.first() else {
            return Ok(Self::default());
        };

        let columns = first.columns().iter().map(|c| c.name().to_owned());
        let mut buffered = MemoryRows::new(columns);
        for row in rows {
            let values = (0..row.len())
                .map(|index| decode(row, index))
                .collect::<crate::Result<Vec<_>>>()?;
            buffered.push_row(values);
        }
        Ok(Self { rows: buffered })
    }

    /// Rows not yet advanced onto.
    pub fn remaining(&self) -> usize {
        self.rows.remaining()
    }
}

impl RowCursor for MySqlRows {
    fn columns(&self) -> crate::Result<Vec<String>> {
        self.rows.columns()
    }

    fn advance(&mut self) -> bool {
        self.rows.advance()
    }

    fn scan(&mut self) -> crate::Result<Vec<Value>> {
        self.rows.scan()
    }

    fn close(&mut self) -> crate::Result<()> {
        self.rows.close()
    }
}

/// How a MySQL column type is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoder {
    Bool,
    UInt,
    Int,
    Float,
    Double,
    Text,
    Bytes,
    Date,
    DateTime,
    Timestamp,
    Time,
}

impl Decoder {
    fn for_type(type_name: &str) -> Option<Self> {
        let decoder = match type_name {
            "BOOLEAN" => Self::Bool,
            name if name.ends_with("UNSIGNED") => Self::UInt,
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => Self::Int,
            "FLOAT" => Self::Float,
            "DOUBLE" => Self::Double,
            "DECIMAL" | "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT"
            | "ENUM" | "SET" | "JSON" => Self::Text,
            "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
                Self::Bytes
            }
            "DATE" => Self::Date,
            "DATETIME" => Self::DateTime,
            "TIMESTAMP" => Self::Timestamp,
            "TIME" => Self::Time,
            _ => return None,
        };
        Some(decoder)
    }
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

fn decode(row: &MySqlRow, index: usize) -> crate::Result<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let column = &row.columns()[index];
    let type_name = column.type_info().name();
    let Some(decoder) = Decoder::for_type(type_name) else {
        return Err(Error::UnsupportedColumnType {
            column: column.name().to_owned(),
            type_name: type_name.to_owned(),
        });
    };

    let value = match decoder {
        Decoder::Bool => Value::Bool(row.try_get_unchecked(index)?),
        Decoder::UInt => Value::UInt(row.try_get_unchecked(index)?),
        Decoder::Int => Value::Int(row.try_get_unchecked(index)?),
        Decoder::Float => Value::Float(row.try_get_unchecked::<f32, _>(index)?.into()),
        Decoder::Double => Value::Float(row.try_get_unchecked(index)?),
        Decoder::Text => Value::Text(row.try_get_unchecked(index)?),
        Decoder::Bytes => Value::Bytes(row.try_get_unchecked(index)?),
        Decoder::Date => {
            let date: NaiveDate = row.try_get_unchecked(index)?;
            Value::Text(date.format(DATE_FORMAT).to_string())
        }
        Decoder::DateTime => {
            let datetime: NaiveDateTime = row.try_get_unchecked(index)?;
            Value::Text(datetime.format(DATETIME_FORMAT).to_string())
        }
        Decoder::Timestamp => {
            let timestamp: DateTime<Utc> = row.try_get_unchecked(index)?;
            Value::Text(timestamp.format(DATETIME_FORMAT).to_string())
        }
        Decoder::Time => {
            let time: NaiveTime = row.try_get_unchecked(index)?;
            Value::Text(time.format(TIME_FORMAT).to_string())
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_has_no_rows() {
        let mut rows = MySqlRows::from_rows(&[]).unwrap();
        assert_eq!(rows.remaining(), 0);
        assert!(rows.columns().unwrap().is_empty());
        assert!(!rows.advance());
        assert!(matches!(rows.scan(), Err(Error::NoCurrentRow)));
    }

    #[test]
    fn test_decoder_for_type() {
        assert_eq!(Decoder::for_type("BOOLEAN"), Some(Decoder::Bool));
        assert_eq!(Decoder::for_type("INT UNSIGNED"), Some(Decoder::UInt));
        assert_eq!(Decoder::for_type("BIGINT"), Some(Decoder::Int));
        assert_eq!(Decoder::for_type("VARCHAR"), Some(Decoder::Text));
        assert_eq!(Decoder::for_type("LONGBLOB"), Some(Decoder::Bytes));
        assert_eq!(Decoder::for_type("GEOMETRY"), None);
    }

    #[test]
    fn test_temporal_types_are_decoded() {
        assert_eq!(Decoder::for_type("DATE"), Some(Decoder::Date));
        assert_eq!(Decoder::for_type("DATETIME"), Some(Decoder::DateTime));
        assert_eq!(Decoder::for_type("TIMESTAMP"), Some(Decoder::Timestamp));
        assert_eq!(Decoder::for_type("TIME"), Some(Decoder::Time));
    }

    #[test]
    fn test_temporal_formats() {
        let datetime = NaiveDate::from_ymd_opt(2024, 1, 31)
            .and_then(|date| date.and_hms_opt(8, 30, 0))
            .unwrap();
        assert_eq!(datetime.format(DATETIME_FORMAT).to_string(), "2024-01-31 08:30:00");
        assert_eq!(datetime.date().format(DATE_FORMAT).to_string(), "2024-01-31");

        let time = NaiveTime::from_hms_micro_opt(23, 59, 1, 250_000).unwrap();
        assert_eq!(time.format(TIME_FORMAT).to_string(), "23:59:01.250");
    }
}
