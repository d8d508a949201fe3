//! Field-path tables for record types, built once per type and cached.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use smallvec::SmallVec;

use crate::error::{Error, ReflectionErrors};
use crate::record::{FieldKind, FieldMut, FieldRef, Record, RecordType};
use crate::value::Value;

/// Indexes walked from the root record to a leaf field.
///
/// `[0]` is the first field of the root, `[0, 1]` the second field of the
/// record held in the first field.
pub type IndexPath = SmallVec<[usize; 4]>;

/// How to reach one mapped field of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    name: String,
    indexes: IndexPath,
}

impl FieldPath {
    /// Name used by queries, e.g. `id` or `address.city`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn indexes(&self) -> &[usize] {
        &self.indexes
    }

    /// Reads the field from `record`.
    ///
    /// A field behind an empty optional record reads as [`Value::Null`].
    pub fn read(&self, record: &dyn Record) -> crate::Result<Value> {
        let Some((&last, parents)) = self.indexes.split_last() else {
            return Err(self.invalid());
        };
        let mut current = record;
        for &index in parents {
            current = match current.field(index) {
                Some(FieldRef::Record(Some(nested))) => nested,
                Some(FieldRef::Record(None)) => return Ok(Value::Null),
                _ => return Err(self.invalid()),
            };
        }
        match current.field(last) {
            Some(FieldRef::Column(column)) => Ok(column.to_value()),
            _ => Err(self.invalid()),
        }
    }

    /// Stores `value` into the field of `record`, allocating empty optional
    /// records along the way.
    pub fn write(&self, record: &mut dyn Record, value: Value) -> crate::Result<()> {
        let Some((&last, parents)) = self.indexes.split_last() else {
            return Err(self.invalid());
        };
        let mut current = record;
        for &index in parents {
            current = match current.field_mut(index) {
                Some(FieldMut::Record(nested)) => nested,
                _ => return Err(self.invalid()),
            };
        }
        match current.field_mut(last) {
            Some(FieldMut::Column(column)) => {
                column.set_value(value).map_err(|source| Error::Decode {
                    column: self.name.clone(),
                    source,
                })
            }
            _ => Err(self.invalid()),
        }
    }

    fn invalid(&self) -> Error {
        Error::InvalidFieldPath {
            name: self.name.clone(),
            record: "record",
        }
    }
}

/// All mapped fields of one record type.
#[derive(Debug)]
pub struct StructDescriptor {
    record: RecordType,
    fields: Vec<FieldPath>,
    by_name: HashMap<String, usize>,
}

impl StructDescriptor {
    pub fn record(&self) -> RecordType {
        self.record
    }

    pub fn fields(&self) -> &[FieldPath] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldPath> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Names of all mapped fields, in traversal order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(FieldPath::name)
    }

    /// Reads the field called `name`, failing with
    /// [`Error::MissingValue`] when the record has no such field.
    pub fn read(&self, record: &dyn Record, name: &str) -> crate::Result<Value> {
        let field = self.field(name).ok_or_else(|| Error::MissingValue {
            name: name.to_owned(),
        })?;
        field.read(record).map_err(|err| self.located(err))
    }

    pub(crate) fn located(&self, err: Error) -> Error {
        match err {
            Error::InvalidFieldPath { name, .. } => Error::InvalidFieldPath {
                name,
                record: self.record.name(),
            },
            other => other,
        }
    }
}

/// Options that change how field names are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReflectOptions {
    /// Map untagged fields by their lowercased identifier instead of skipping
    /// them
    pub lowercase_untagged: bool,
}

/// Process-independent cache of [`StructDescriptor`]s keyed by type.
///
/// Lookups take a read lock; a miss builds the descriptor without holding
/// any lock, so two threads may build the same descriptor at once. The first
/// one stored wins and both callers get the same `Arc`.
#[derive(Debug, Default)]
pub struct StructCache {
    descriptors: RwLock<HashMap<TypeId, Arc<StructDescriptor>>>,
    options: ReflectOptions,
}

impl StructCache {
    pub fn new(options: ReflectOptions) -> Self {
        Self {
            descriptors: RwLock::default(),
            options,
        }
    }

    pub fn options(&self) -> ReflectOptions {
        self.options
    }

    pub fn describe<T: Record>(&self) -> crate::Result<Arc<StructDescriptor>> {
        self.describe_type(RecordType::of::<T>())
    }

    pub fn describe_type(&self, record: RecordType) -> crate::Result<Arc<StructDescriptor>> {
        {
            let descriptors = self.descriptors.read().unwrap_or_else(|e| e.into_inner());
            if let Some(descriptor) = descriptors.get(&record.id()) {
                return Ok(Arc::clone(descriptor));
            }
        }

        let descriptor = Arc::new(build(record, self.options)?);
        tracing::debug!(
            record = record.name(),
            fields = descriptor.fields.len(),
            "described record type"
        );

        let mut descriptors = self.descriptors.write().unwrap_or_else(|e| e.into_inner());
        Ok(Arc::clone(
            descriptors.entry(record.id()).or_insert(descriptor),
        ))
    }

    /// Drops every cached descriptor. For tests and benchmarks only.
    #[doc(hidden)]
    pub fn reset(&self) {
        self.descriptors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

/// Returns the mapped name for a field, or `None` when it is not mapped.
///
/// The name is the tag up to the first `,`. A tag of `-`, an empty name or a
/// name containing `:` skips the field; the last case is how sqlx treats
/// such tags and is kept for compatibility.
fn tag_name(tag: &str) -> Option<&str> {
    if tag == "-" {
        return None;
    }
    let name = tag.split_once(',').map_or(tag, |(name, _)| name);
    if name.is_empty() || name.contains(':') {
        return None;
    }
    Some(name)
}

struct Builder {
    options: ReflectOptions,
    fields: Vec<FieldPath>,
    by_name: HashMap<String, usize>,
    prefixes: Vec<String>,
    indexes: IndexPath,
    visiting: Vec<TypeId>,
    errors: Vec<String>,
}

fn build(record: RecordType, options: ReflectOptions) -> crate::Result<StructDescriptor> {
    let mut builder = Builder {
        options,
        fields: Vec::new(),
        by_name: HashMap::new(),
        prefixes: Vec::new(),
        indexes: IndexPath::new(),
        visiting: Vec::new(),
        errors: Vec::new(),
    };
    builder.process(record);
    if !builder.errors.is_empty() {
        return Err(ReflectionErrors::new(builder.errors).into());
    }
    Ok(StructDescriptor {
        record,
        fields: builder.fields,
        by_name: builder.by_name,
    })
}

impl Builder {
    fn process(&mut self, record: RecordType) {
        self.visiting.push(record.id());
        for (i, def) in record.fields().into_iter().enumerate() {
            let (name, tagged) = match def.tag {
                Some(tag) => match tag_name(tag) {
                    Some(name) => (name.to_owned(), true),
                    None => continue,
                },
                None if self.options.lowercase_untagged => (def.ident.to_lowercase(), false),
                None => match def.kind {
                    // untagged embeds always flatten into the parent
                    FieldKind::Record { embedded: true, .. } => (String::new(), false),
                    _ => continue,
                },
            };

            let FieldKind::Record { embedded, record: nested } = def.kind else {
                self.push_field(name, i);
                continue;
            };

            if self.visiting.contains(&nested.id()) {
                self.errors.push(format!(
                    "{}.{}: record type {} contains itself",
                    record.name(),
                    def.ident,
                    nested.name()
                ));
                continue;
            }

            let prefixed = !embedded || tagged;
            if prefixed {
                self.prefixes.push(name);
            }
            self.indexes.push(i);
            self.process(nested);
            self.indexes.pop();
            if prefixed {
                self.prefixes.pop();
            }
        }
        self.visiting.pop();
    }

    fn push_field(&mut self, name: String, index: usize) {
        let name = if self.prefixes.is_empty() {
            name
        } else {
            let mut full = self.prefixes.join(".");
            full.push('.');
            full.push_str(&name);
            full
        };
        if self.by_name.contains_key(&name) {
            tracing::debug!(field = %name, "duplicate field name, keeping the first");
            return;
        }
        let mut indexes = self.indexes.clone();
        indexes.push(index);
        self.by_name.insert(name.clone(), self.fields.len());
        self.fields.push(FieldPath { name, indexes });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    #[derive(Debug, Default)]
    struct Common {
        id: i64,
    }

    record!(Common { column id: "ID" });

    #[derive(Debug, Default)]
    struct Nested {
        common: Common,
        title: String,
    }

    record!(Nested {
        embed common,
        column title: "Title",
    });

    #[derive(Debug, Default)]
    struct Place {
        name: String,
        lat: f64,
    }

    record!(Place {
        column name: "name",
        column lat: "lat",
    });

    #[derive(Debug, Default)]
    struct Person {
        first_name: String,
        last_name: String,
        email: String,
        skipped: String,
        weird: String,
        empty: String,
        place: Place,
        tagged_common: Common,
        home: Option<Place>,
    }

    record!(Person {
        column first_name: "first_name",
        column last_name: "last_name,omitempty",
        column email,
        column skipped: "-",
        column weird: "weird:value",
        column empty: ",omitempty",
        record place: "place",
        embed tagged_common: "common",
        record home: "home",
    });

    #[derive(Debug, Default)]
    struct LoopA {
        id: i64,
        b: Option<Box<LoopB>>,
    }

    #[derive(Debug, Default)]
    struct LoopB {
        a: Option<Box<LoopA>>,
        again: Box<LoopA>,
    }

    record!(LoopA {
        column id: "id",
        record b: "b",
    });

    record!(LoopB {
        record a: "a",
        record again: "again",
    });

    fn names(descriptor: &StructDescriptor) -> Vec<&str> {
        descriptor.field_names().collect()
    }

    #[test]
    fn test_untagged_embed_flattens() {
        let cache = StructCache::default();
        let descriptor = cache.describe::<Nested>().unwrap();
        assert_eq!(names(&descriptor), ["ID", "Title"]);
        assert_eq!(descriptor.field("ID").unwrap().indexes(), [0, 0]);
        assert_eq!(descriptor.field("Title").unwrap().indexes(), [1]);
    }

    #[test]
    fn test_tags_and_nesting() {
        let cache = StructCache::default();
        let descriptor = cache.describe::<Person>().unwrap();
        assert_eq!(
            names(&descriptor),
            [
                "first_name",
                "last_name",
                "place.name",
                "place.lat",
                "common.ID",
                "home.name",
                "home.lat",
            ]
        );
        assert_eq!(descriptor.field("place.lat").unwrap().indexes(), [6, 1]);
        assert_eq!(descriptor.field("common.ID").unwrap().indexes(), [7, 0]);
        assert!(descriptor.field("email").is_none());
        assert!(descriptor.field("weird").is_none());
    }

    #[test]
    fn test_lowercase_untagged() {
        let cache = StructCache::new(ReflectOptions {
            lowercase_untagged: true,
        });
        let descriptor = cache.describe::<Person>().unwrap();
        assert_eq!(descriptor.field("email").unwrap().indexes(), [2]);
        assert!(descriptor.field("skipped").is_none());
    }

    #[test]
    fn test_describe_is_cached() {
        let cache = StructCache::default();
        let first = cache.describe::<Person>().unwrap();
        let second = cache.describe::<Person>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.fields(), second.fields());

        cache.reset();
        let rebuilt = cache.describe::<Person>().unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(first.fields(), rebuilt.fields());
    }

    #[test]
    fn test_concurrent_describe() {
        let cache = StructCache::default();
        let descriptors: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| cache.describe::<Person>().unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        let cached = cache.describe::<Person>().unwrap();
        for descriptor in descriptors {
            assert_eq!(descriptor.fields(), cached.fields());
        }
    }

    #[test]
    fn test_duplicate_name_keeps_first() {
        #[derive(Default)]
        struct Dup {
            common: Common,
            id: i64,
        }
        record!(Dup {
            embed common,
            column id: "ID",
        });

        let cache = StructCache::default();
        let descriptor = cache.describe::<Dup>().unwrap();
        assert_eq!(descriptor.fields().len(), 1);
        assert_eq!(descriptor.field("ID").unwrap().indexes(), [0, 0]);
    }

    #[test]
    fn test_recursive_record_errors_are_collected() {
        let cache = StructCache::default();
        let err = cache.describe::<LoopA>().unwrap_err();
        match err {
            Error::Reflection(errors) => {
                assert_eq!(errors.errors().len(), 2);
                assert!(errors.to_string().starts_with("Multiple reflection errors:\n"));
                assert!(errors.errors().iter().all(|e| e.contains("contains itself")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_and_write() {
        let cache = StructCache::default();
        let descriptor = cache.describe::<Person>().unwrap();
        let mut person = Person {
            first_name: "Jason".to_owned(),
            ..Person::default()
        };

        assert_eq!(
            descriptor.read(&person, "first_name").unwrap(),
            Value::Text("Jason".to_owned())
        );
        assert_eq!(descriptor.read(&person, "home.name").unwrap(), Value::Null);
        assert!(matches!(
            descriptor.read(&person, "nope"),
            Err(Error::MissingValue { name }) if name == "nope"
        ));

        let home = descriptor.field("home.lat").unwrap();
        home.write(&mut person, Value::Float(1.5)).unwrap();
        assert_eq!(person.home.as_ref().map(|p| p.lat), Some(1.5));

        let err = descriptor
            .field("first_name")
            .unwrap()
            .write(&mut person, Value::Int(1))
            .unwrap_err();
        assert!(matches!(err, Error::Decode { column, .. } if column == "first_name"));
    }

    #[test]
    fn test_tag_name() {
        assert_eq!(tag_name("id"), Some("id"));
        assert_eq!(tag_name("id,omitempty"), Some("id"));
        assert_eq!(tag_name("id,default:5"), Some("id"));
        assert_eq!(tag_name("-"), None);
        assert_eq!(tag_name(""), None);
        assert_eq!(tag_name(",omitempty"), None);
        assert_eq!(tag_name("id:int"), None);
    }
}
