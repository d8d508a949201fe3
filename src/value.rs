use crate::error::ValueError;

/// A dynamically typed value passed to or read from the driver.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::UInt(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
        }
    }
}

/// A field type that is stored as a single column.
///
/// Record fields of a `Column` type are leaves: the reflection cache maps
/// them by name and never looks inside. Implement it for custom value types
/// (timestamps, decimals, newtypes) to use them as record fields.
pub trait Column {
    /// Reads the field as a value to bind to a query.
    fn to_value(&self) -> Value;

    /// Stores a value read from a result row into the field.
    fn set_value(&mut self, value: Value) -> Result<(), ValueError>;
}

impl Column for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn set_value(&mut self, value: Value) -> Result<(), ValueError> {
        *self = value;
        Ok(())
    }
}

impl<T: Column + Default> Column for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn set_value(&mut self, value: Value) -> Result<(), ValueError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        self.get_or_insert_with(T::default).set_value(value)
    }
}

fn mismatch(expected: &'static str, found: &Value) -> ValueError {
    if found.is_null() {
        ValueError::UnexpectedNull { expected }
    } else {
        ValueError::Mismatch {
            expected,
            found: found.kind(),
        }
    }
}

fn out_of_range(expected: &'static str, value: impl ToString) -> ValueError {
    ValueError::OutOfRange {
        expected,
        value: value.to_string(),
    }
}

macro_rules! impl_signed {
    ($($ty:ty),*) => {$(
        impl Column for $ty {
            fn to_value(&self) -> Value {
                Value::Int(i64::from(*self))
            }

            fn set_value(&mut self, value: Value) -> Result<(), ValueError> {
                *self = match value {
                    Value::Int(v) => <$ty>::try_from(v).map_err(|_| out_of_range(stringify!($ty), v))?,
                    Value::UInt(v) => <$ty>::try_from(v).map_err(|_| out_of_range(stringify!($ty), v))?,
                    Value::Bool(v) => <$ty>::from(v),
                    other => return Err(mismatch(stringify!($ty), &other)),
                };
                Ok(())
            }
        }
    )*};
}

macro_rules! impl_unsigned {
    ($($ty:ty),*) => {$(
        impl Column for $ty {
            fn to_value(&self) -> Value {
                Value::UInt(u64::from(*self))
            }

            fn set_value(&mut self, value: Value) -> Result<(), ValueError> {
                *self = match value {
                    Value::UInt(v) => <$ty>::try_from(v).map_err(|_| out_of_range(stringify!($ty), v))?,
                    Value::Int(v) => <$ty>::try_from(v).map_err(|_| out_of_range(stringify!($ty), v))?,
                    Value::Bool(v) => <$ty>::from(v),
                    other => return Err(mismatch(stringify!($ty), &other)),
                };
                Ok(())
            }
        }
    )*};
}

impl_signed!(i8, i16, i32, i64);
impl_unsigned!(u8, u16, u32, u64);

impl Column for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn set_value(&mut self, value: Value) -> Result<(), ValueError> {
        *self = match value {
            Value::Bool(v) => v,
            Value::Int(v) => v != 0,
            Value::UInt(v) => v != 0,
            other => return Err(mismatch("bool", &other)),
        };
        Ok(())
    }
}

impl Column for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    #[allow(clippy::cast_precision_loss)]
    fn set_value(&mut self, value: Value) -> Result<(), ValueError> {
        *self = match value {
            Value::Float(v) => v,
            Value::Int(v) => v as f64,
            Value::UInt(v) => v as f64,
            other => return Err(mismatch("f64", &other)),
        };
        Ok(())
    }
}

impl Column for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn set_value(&mut self, value: Value) -> Result<(), ValueError> {
        *self = match value {
            Value::Float(v) => v as f32,
            Value::Int(v) => v as f32,
            Value::UInt(v) => v as f32,
            other => return Err(mismatch("f32", &other)),
        };
        Ok(())
    }
}

impl Column for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn set_value(&mut self, value: Value) -> Result<(), ValueError> {
        *self = match value {
            Value::Text(v) => v,
            Value::Bytes(v) => String::from_utf8(v).map_err(|_| ValueError::Mismatch {
                expected: "String",
                found: "non-UTF-8 bytes",
            })?,
            other => return Err(mismatch("String", &other)),
        };
        Ok(())
    }
}

impl Column for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn set_value(&mut self, value: Value) -> Result<(), ValueError> {
        *self = match value {
            Value::Bytes(v) => v,
            Value::Text(v) => v.into_bytes(),
            other => return Err(mismatch("Vec<u8>", &other)),
        };
        Ok(())
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v.into())
            }
        }
    )*};
}

impl_from! {
    bool => Bool,
    i8 => Int, i16 => Int, i32 => Int, i64 => Int,
    u8 => UInt, u16 => UInt, u32 => UInt, u64 => UInt,
    f32 => Float, f64 => Float,
    String => Text,
    Vec<u8> => Bytes,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_conversions() {
        let mut small = 0i8;
        small.set_value(Value::Int(12)).unwrap();
        assert_eq!(small, 12);
        assert!(matches!(
            small.set_value(Value::Int(300)),
            Err(ValueError::OutOfRange { expected: "i8", .. })
        ));

        let mut unsigned = 0u32;
        unsigned.set_value(Value::Int(7)).unwrap();
        assert_eq!(unsigned, 7);
        assert!(unsigned.set_value(Value::Int(-1)).is_err());
        assert_eq!(unsigned.to_value(), Value::UInt(7));
    }

    #[test]
    fn test_null_into_non_optional() {
        let mut id = 1i64;
        assert_eq!(
            id.set_value(Value::Null),
            Err(ValueError::UnexpectedNull { expected: "i64" })
        );
    }

    #[test]
    fn test_option_round_trip_null() {
        let mut name: Option<String> = Some("before".to_owned());
        name.set_value(Value::Null).unwrap();
        assert_eq!(name, None);
        assert_eq!(name.to_value(), Value::Null);

        name.set_value(Value::Text("after".to_owned())).unwrap();
        assert_eq!(name.as_deref(), Some("after"));
    }

    #[test]
    fn test_text_mismatch() {
        let mut title = String::new();
        assert_eq!(
            title.set_value(Value::Float(1.5)),
            Err(ValueError::Mismatch {
                expected: "String",
                found: "float"
            })
        );
        title.set_value(Value::Bytes(b"raw".to_vec())).unwrap();
        assert_eq!(title, "raw");
    }

    #[test]
    fn test_from_impls() {
        assert_eq!(Value::from(5i32), Value::Int(5));
        assert_eq!(Value::from("x"), Value::Text("x".to_owned()));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(true)), Value::Bool(true));
    }
}
