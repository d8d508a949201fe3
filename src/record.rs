//! Declaring record types.
//!
//! A record is a struct whose fields can be bound to named parameters and
//! filled from result columns. Each field is one of:
//!
//! - a **column**: a leaf of a [`Column`] type, mapped by its own name;
//! - a **record**: a nested record whose fields are exposed as
//!   `name.field`;
//! - an **embed**: a nested record whose fields are spliced into the parent
//!   (or exposed as `name.field` when the embed has a tag).
//!
//! Nested records may be held by value, boxed, or as `Option<T>` /
//! `Option<Box<T>>`; an empty `Option` is filled with its default when a
//! column is scanned into it.
//!
//! The [`record!`](crate::record!) macro writes the [`Record`] and
//! [`AsRecord`] impls:
//!
//! ```
//! use sqlsw::{record, Record};
//!
//! #[derive(Debug, Default)]
//! struct Audit {
//!     created_by: String,
//! }
//!
//! record!(Audit {
//!     column created_by: "created_by",
//! });
//!
//! #[derive(Debug, Default)]
//! struct Address {
//!     city: String,
//! }
//!
//! record!(Address {
//!     column city: "city",
//! });
//!
//! #[derive(Debug, Default)]
//! struct Person {
//!     id: i64,
//!     name: String,
//!     secret: String,
//!     audit: Audit,
//!     address: Option<Address>,
//! }
//!
//! record!(Person {
//!     column id: "id",
//!     column name: "name,omitempty",
//!     column secret: "-",
//!     embed audit,
//!     record address: "address",
//! });
//!
//! let names: Vec<_> = Person::fields().iter().map(|f| f.ident).collect();
//! assert_eq!(names, ["id", "name", "secret", "audit", "address"]);
//! ```

use std::any::TypeId;

use crate::value::Column;

/// A struct that can be bound from and scanned into by field name.
///
/// Field indexes are positions in the list returned by [`Record::fields`].
/// `field` and `field_mut` must return the same kind of access the
/// declaration promises: a column for [`FieldKind::Column`] and a record for
/// [`FieldKind::Record`].
pub trait Record: 'static {
    /// Field declarations in declaration order.
    fn fields() -> Vec<FieldDef>
    where
        Self: Sized;

    fn field(&self, index: usize) -> Option<FieldRef<'_>>;

    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>>;
}

/// Identity of a record type, used as the reflection cache key.
#[derive(Debug, Clone, Copy)]
pub struct RecordType {
    id: TypeId,
    name: &'static str,
    fields: fn() -> Vec<FieldDef>,
}

impl RecordType {
    pub fn of<T: Record>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            fields: T::fields,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> Vec<FieldDef> {
        (self.fields)()
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RecordType {}

/// One declared field of a record.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Rust identifier of the field
    pub ident: &'static str,
    /// Raw `db` tag, `name[,modifier[:value]]`, or `-` to skip the field
    pub tag: Option<&'static str>,
    pub kind: FieldKind,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    /// Leaf value stored in one column
    Column,
    /// Nested record; `embedded` fields flatten into the parent when untagged
    Record { embedded: bool, record: RecordType },
}

/// Shared access to one field.
pub enum FieldRef<'a> {
    Column(&'a dyn Column),
    /// `None` when an optional nested record is empty
    Record(Option<&'a dyn Record>),
}

/// Exclusive access to one field.
pub enum FieldMut<'a> {
    Column(&'a mut dyn Column),
    /// Optional nested records are allocated before being handed out
    Record(&'a mut dyn Record),
}

/// Field types that hold a nested record: the record itself, a `Box` of it,
/// or an `Option` of either.
///
/// [`record!`](crate::record!) implements this for the record type; a
/// record with a hand-written [`Record`] impl needs a matching `AsRecord`
/// impl to be nested in another record.
pub trait AsRecord {
    type Target: Record;

    /// `None` when an optional record is empty.
    fn as_record(&self) -> Option<&dyn Record>;

    /// Empty optional records are filled with their default first.
    fn as_record_mut(&mut self) -> &mut dyn Record;
}

impl<T: AsRecord> AsRecord for Box<T> {
    type Target = T::Target;

    fn as_record(&self) -> Option<&dyn Record> {
        (**self).as_record()
    }

    fn as_record_mut(&mut self) -> &mut dyn Record {
        (**self).as_record_mut()
    }
}

impl<T: AsRecord + Default> AsRecord for Option<T> {
    type Target = T::Target;

    fn as_record(&self) -> Option<&dyn Record> {
        self.as_ref().and_then(AsRecord::as_record)
    }

    fn as_record_mut(&mut self) -> &mut dyn Record {
        self.get_or_insert_with(T::default).as_record_mut()
    }
}

/// Implements [`Record`] and [`AsRecord`] for a struct.
///
/// Each entry is `kind field` or `kind field: "tag"`, where `kind` is
/// `column`, `record` or `embed` (see the [module docs](crate::record)).
/// Fields not listed are invisible to the mapper.
#[macro_export]
macro_rules! record {
    ($ty:ty { $($kind:ident $field:ident $(: $tag:literal)?),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn fields() -> ::std::vec::Vec<$crate::FieldDef> {
                ::std::vec![$(
                    $crate::__private::$kind::def(
                        ::std::stringify!($field),
                        $crate::__record_tag!($($tag)?),
                        |record: &Self| &record.$field,
                    )
                ),*]
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn field(&self, index: usize) -> ::std::option::Option<$crate::FieldRef<'_>> {
                let mut position = 0usize;
                $(
                    if index == position {
                        return ::std::option::Option::Some($crate::__private::$kind::get(&self.$field));
                    }
                    position += 1;
                )*
                ::std::option::Option::None
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn field_mut(&mut self, index: usize) -> ::std::option::Option<$crate::FieldMut<'_>> {
                let mut position = 0usize;
                $(
                    if index == position {
                        return ::std::option::Option::Some($crate::__private::$kind::get_mut(&mut self.$field));
                    }
                    position += 1;
                )*
                ::std::option::Option::None
            }
        }

        impl $crate::AsRecord for $ty {
            type Target = Self;

            fn as_record(&self) -> ::std::option::Option<&dyn $crate::Record> {
                ::std::option::Option::Some(self)
            }

            fn as_record_mut(&mut self) -> &mut dyn $crate::Record {
                self
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_tag {
    () => {
        ::std::option::Option::None
    };
    ($tag:literal) => {
        ::std::option::Option::Some($tag)
    };
}

/// Support code for [`record!`](crate::record!). Not public API.
#[doc(hidden)]
pub mod __private {
    pub mod column {
        use crate::record::{FieldDef, FieldKind, FieldMut, FieldRef};
        use crate::value::Column;

        pub fn def<S, C: Column>(
            ident: &'static str,
            tag: Option<&'static str>,
            _field: impl Fn(&S) -> &C,
        ) -> FieldDef {
            FieldDef {
                ident,
                tag,
                kind: FieldKind::Column,
            }
        }

        pub fn get<C: Column>(field: &C) -> FieldRef<'_> {
            FieldRef::Column(field)
        }

        pub fn get_mut<C: Column>(field: &mut C) -> FieldMut<'_> {
            FieldMut::Column(field)
        }
    }

    pub mod record {
        use crate::record::{AsRecord, FieldDef, FieldMut, FieldRef};

        pub fn def<S, R: AsRecord>(
            ident: &'static str,
            tag: Option<&'static str>,
            _field: impl Fn(&S) -> &R,
        ) -> FieldDef {
            super::nested::<R>(ident, tag, false)
        }

        pub fn get<R: AsRecord>(field: &R) -> FieldRef<'_> {
            FieldRef::Record(field.as_record())
        }

        pub fn get_mut<R: AsRecord>(field: &mut R) -> FieldMut<'_> {
            FieldMut::Record(field.as_record_mut())
        }
    }

    pub mod embed {
        use crate::record::{AsRecord, FieldDef};

        pub use super::record::{get, get_mut};

        pub fn def<S, R: AsRecord>(
            ident: &'static str,
            tag: Option<&'static str>,
            _field: impl Fn(&S) -> &R,
        ) -> FieldDef {
            super::nested::<R>(ident, tag, true)
        }
    }

    fn nested<R: super::AsRecord>(
        ident: &'static str,
        tag: Option<&'static str>,
        embedded: bool,
    ) -> super::FieldDef {
        super::FieldDef {
            ident,
            tag,
            kind: super::FieldKind::Record {
                embedded,
                record: super::RecordType::of::<R::Target>(),
            },
        }
    }
}
