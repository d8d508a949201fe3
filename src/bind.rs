//! Resolving named parameters to positional values.

use std::collections::{BTreeMap, HashMap};

use crate::error::Error;
use crate::record::{Record, RecordType};
use crate::reflect::StructCache;
use crate::value::{Column, Value};

/// A string-keyed source of named values.
pub trait Mapping {
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl<V: Column> Mapping for HashMap<String, V> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).map(Column::to_value)
    }
}

impl<V: Column> Mapping for HashMap<&str, V> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).map(Column::to_value)
    }
}

impl<V: Column> Mapping for BTreeMap<String, V> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).map(Column::to_value)
    }
}

impl<V: Column> Mapping for BTreeMap<&str, V> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).map(Column::to_value)
    }
}

/// The shape of a named-query argument, decided once before binding.
pub enum Arguments<'a> {
    Mapping(&'a dyn Mapping),
    Record(&'a dyn Record, RecordType),
    /// Each element is bound in turn and the values concatenated
    Sequence(Vec<Arguments<'a>>),
    /// Anything that cannot carry named values
    Unexpected(&'static str),
}

/// Types that can be passed as the argument of a named query.
pub trait ToArguments {
    fn to_arguments(&self) -> Arguments<'_>;
}

impl<T: Record> ToArguments for T {
    fn to_arguments(&self) -> Arguments<'_> {
        Arguments::Record(self, RecordType::of::<T>())
    }
}

macro_rules! impl_mapping_arguments {
    ($($map:ty),*) => {$(
        impl<V: Column> ToArguments for $map {
            fn to_arguments(&self) -> Arguments<'_> {
                Arguments::Mapping(self)
            }
        }
    )*};
}

impl_mapping_arguments!(
    HashMap<String, V>,
    HashMap<&str, V>,
    BTreeMap<String, V>,
    BTreeMap<&str, V>
);

impl<T: ToArguments> ToArguments for [T] {
    fn to_arguments(&self) -> Arguments<'_> {
        Arguments::Sequence(self.iter().map(ToArguments::to_arguments).collect())
    }
}

impl<T: ToArguments> ToArguments for Vec<T> {
    fn to_arguments(&self) -> Arguments<'_> {
        self.as_slice().to_arguments()
    }
}

impl<T: ToArguments, const N: usize> ToArguments for [T; N] {
    fn to_arguments(&self) -> Arguments<'_> {
        self.as_slice().to_arguments()
    }
}

impl ToArguments for Value {
    fn to_arguments(&self) -> Arguments<'_> {
        Arguments::Unexpected(self.kind())
    }
}

/// Resolves every name in `names` against `args`, in order.
///
/// Duplicate names are looked up once per occurrence. For a sequence the
/// names are resolved against each element and the results concatenated.
///
/// # Errors
///
/// - [`Error::MissingValue`] if a map key or record field is missing
/// - [`Error::EmptySequence`] for a sequence without elements
/// - [`Error::UnexpectedArgument`] for scalars and nested sequences
pub fn bind_arguments(
    names: &[String],
    args: &Arguments<'_>,
    cache: &StructCache,
) -> crate::Result<Vec<Value>> {
    let mut values = Vec::with_capacity(names.len());
    match args {
        Arguments::Sequence(items) => {
            if items.is_empty() {
                return Err(Error::EmptySequence);
            }
            values.reserve(names.len() * (items.len() - 1));
            for item in items {
                match item {
                    Arguments::Sequence(_) => {
                        return Err(Error::UnexpectedArgument {
                            shape: "nested sequence",
                        })
                    }
                    other => bind_single(names, other, cache, &mut values)?,
                }
            }
        }
        other => bind_single(names, other, cache, &mut values)?,
    }
    Ok(values)
}

fn bind_single(
    names: &[String],
    args: &Arguments<'_>,
    cache: &StructCache,
    values: &mut Vec<Value>,
) -> crate::Result<()> {
    match args {
        Arguments::Mapping(map) => {
            for name in names {
                let value = map.lookup(name).ok_or_else(|| Error::MissingValue {
                    name: name.clone(),
                })?;
                values.push(value);
            }
        }
        Arguments::Record(record, ty) => {
            let descriptor = cache.describe_type(*ty)?;
            for name in names {
                values.push(descriptor.read(*record, name)?);
            }
        }
        Arguments::Unexpected(shape) => return Err(Error::UnexpectedArgument { shape: *shape }),
        Arguments::Sequence(_) => {
            return Err(Error::UnexpectedArgument {
                shape: "nested sequence",
            })
        }
    }
    Ok(())
}
