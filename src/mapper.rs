use std::sync::Arc;

use crate::bind::{bind_arguments, Arguments, ToArguments};
use crate::bind_style::BindStyle;
use crate::compat::expand_values;
use crate::error::Error;
use crate::parser::{parse, ParseOptions, ParseResult};
use crate::query::NamedQuery;
use crate::record::Record;
use crate::reflect::{ReflectOptions, StructCache, StructDescriptor};
use crate::scan::{self, RowCursor};
use crate::value::Value;

/// Settings for a [`Mapper`].
///
/// ```
/// use sqlsw::{BindStyle, Mapper, MapperOptions};
///
/// let options = MapperOptions::default()
///     .lowercase_untagged(true)
///     .unsafe_mode(true);
/// let mapper = Mapper::with_options(BindStyle::Dollar, options);
/// assert!(mapper.unsafe_mode());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapperOptions {
    lowercase_untagged: bool,
    unsafe_mode: bool,
    sqlx_compat: bool,
}

impl MapperOptions {
    /// Map fields without a tag by their lowercased identifier.
    pub fn lowercase_untagged(mut self, enabled: bool) -> Self {
        self.lowercase_untagged = enabled;
        self
    }

    /// Discard result columns that have no field instead of failing.
    pub fn unsafe_mode(mut self, enabled: bool) -> Self {
        self.unsafe_mode = enabled;
        self
    }

    /// Rewrite to `?` when the bind style is [`BindStyle::Unknown`].
    pub fn sqlx_compat(mut self, enabled: bool) -> Self {
        self.sqlx_compat = enabled;
        self
    }
}

/// Named-query rewriting and record mapping for one database.
///
/// A mapper owns its bind style and the cache of record descriptors, so it
/// is normally created once and shared by reference.
///
/// ```
/// use std::collections::HashMap;
/// use sqlsw::{Mapper, Value};
///
/// let mapper = Mapper::for_driver("postgres")?;
/// let args = HashMap::from([("id", 7i64)]);
/// let (query, values) = mapper.bind_named("SELECT * FROM t WHERE id = :id OR parent = :id", &args)?;
/// assert_eq!(query, "SELECT * FROM t WHERE id = $1 OR parent = $2");
/// assert_eq!(values, [Value::Int(7), Value::Int(7)]);
/// # Ok::<(), sqlsw::Error>(())
/// ```
#[derive(Debug)]
pub struct Mapper {
    bind_style: BindStyle,
    options: MapperOptions,
    cache: StructCache,
}

impl Mapper {
    pub fn new(bind_style: BindStyle) -> Self {
        Self::with_options(bind_style, MapperOptions::default())
    }

    pub fn with_options(bind_style: BindStyle, options: MapperOptions) -> Self {
        let cache = StructCache::new(ReflectOptions {
            lowercase_untagged: options.lowercase_untagged,
        });
        Self {
            bind_style,
            options,
            cache,
        }
    }

    /// Creates a mapper using the bind style registered for `driver`.
    pub fn for_driver(driver: &str) -> crate::Result<Self> {
        let style =
            BindStyle::lookup(driver).ok_or_else(|| Error::UnknownDriver(driver.to_owned()))?;
        Ok(Self::new(style))
    }

    /// Creates a mapper that behaves like sqlx: untagged fields map by their
    /// lowercased name and an unknown bind style falls back to `?`.
    pub fn sqlx_compat(bind_style: BindStyle) -> Self {
        Self::with_options(
            bind_style,
            MapperOptions::default()
                .lowercase_untagged(true)
                .sqlx_compat(true),
        )
    }

    pub fn bind_style(&self) -> BindStyle {
        self.bind_style
    }

    pub fn options(&self) -> MapperOptions {
        self.options
    }

    pub fn unsafe_mode(&self) -> bool {
        self.options.unsafe_mode
    }

    pub fn set_unsafe_mode(&mut self, enabled: bool) {
        self.options.unsafe_mode = enabled;
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            bind_style: self.bind_style,
            sqlx_compat: self.options.sqlx_compat,
        }
    }

    /// Rewrites the named parameters of `query` for this mapper's bind style.
    pub fn parse(&self, query: &str) -> crate::Result<ParseResult> {
        parse(query, self.parse_options())
    }

    /// Rewrites `query` and resolves its parameters against `args`.
    ///
    /// A sequence argument binds every element in turn against the same
    /// placeholders; use [`bind_named_batch`](Self::bind_named_batch) to
    /// also repeat the `VALUES` group of an insert.
    pub fn bind_named<A>(&self, query: &str, args: &A) -> crate::Result<(String, Vec<Value>)>
    where
        A: ToArguments + ?Sized,
    {
        let (query, names) = self.parse(query)?.into_parts();
        let values = bind_arguments(&names, &args.to_arguments(), &self.cache)?;
        Ok((query, values))
    }

    /// Like [`bind_named`](Self::bind_named), but an insert bound from a
    /// sequence of `n` elements gets its `VALUES (...)` group repeated `n`
    /// times so every element is inserted by one statement.
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use sqlsw::{BindStyle, Mapper, Value};
    ///
    /// let mapper = Mapper::new(BindStyle::Dollar);
    /// let rows = vec![HashMap::from([("a", 1i64)]), HashMap::from([("a", 2i64)])];
    /// let (query, values) = mapper.bind_named_batch("INSERT INTO t (a) VALUES (:a)", &rows)?;
    /// assert_eq!(query, "INSERT INTO t (a) VALUES ($1),($2)");
    /// assert_eq!(values, [Value::Int(1), Value::Int(2)]);
    /// # Ok::<(), sqlsw::Error>(())
    /// ```
    pub fn bind_named_batch<A>(&self, query: &str, args: &A) -> crate::Result<(String, Vec<Value>)>
    where
        A: ToArguments + ?Sized,
    {
        let args = args.to_arguments();
        let count = match &args {
            Arguments::Sequence(items) => items.len(),
            _ => 1,
        };

        let (rewritten, names) = self.parse(query)?.into_parts();
        let values = bind_arguments(&names, &args, &self.cache)?;
        if count < 2 {
            return Ok((rewritten, values));
        }

        let expanded = self.parse(&expand_values(query, count)?)?;
        tracing::trace!(rows = count, query = expanded.query(), "expanded batch insert");
        Ok((expanded.into_parts().0, values))
    }

    /// Rewrites `template`, binds `args` and returns a query ready to run
    /// through SQLx.
    pub fn query<A>(&self, template: &str, args: &A) -> crate::Result<NamedQuery<'_>>
    where
        A: ToArguments + ?Sized,
    {
        let (sql, values) = self.bind_named_batch(template, args)?;
        Ok(NamedQuery::new(self, sql, values))
    }

    /// The cached field layout of `T`.
    pub fn describe<T: Record>(&self) -> crate::Result<Arc<StructDescriptor>> {
        self.cache.describe::<T>()
    }

    pub fn cache(&self) -> &StructCache {
        &self.cache
    }

    /// Copies the current row of `cursor` into `dest`, leaving `dest` as it
    /// was if any column fails to decode.
    pub fn scan_row<T: Record + Default>(
        &self,
        cursor: &mut impl RowCursor,
        dest: &mut T,
    ) -> crate::Result<()> {
        scan::scan_row(cursor, dest, &self.cache, self.unsafe_mode())
    }

    /// Reads every remaining row of `cursor` into `dest`, replacing its
    /// contents.
    pub fn scan_all<T: Record + Default>(
        &self,
        cursor: &mut impl RowCursor,
        dest: &mut Vec<T>,
    ) -> crate::Result<()> {
        scan::scan_all(cursor, dest, &self.cache, self.unsafe_mode())
    }

    pub fn scan_all_boxed<T: Record + Default>(
        &self,
        cursor: &mut impl RowCursor,
        dest: &mut Vec<Box<T>>,
    ) -> crate::Result<()> {
        scan::scan_all_boxed(cursor, dest, &self.cache, self.unsafe_mode())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::record;
    use crate::scan::MemoryRows;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        first_name: String,
        last_name: String,
        email: Option<String>,
    }

    record!(Person {
        column first_name: "first_name",
        column last_name: "last_name",
        column email,
    });

    fn ada() -> Person {
        Person {
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            email: None,
        }
    }

    #[test]
    fn test_mapper_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Mapper>();
    }

    #[test]
    fn test_for_driver() {
        assert_eq!(Mapper::for_driver("mysql").unwrap().bind_style(), BindStyle::Question);
        assert_eq!(Mapper::for_driver("sqlserver").unwrap().bind_style(), BindStyle::At);
        let err = Mapper::for_driver("no-such-driver").unwrap_err();
        assert!(matches!(err, Error::UnknownDriver(name) if name == "no-such-driver"));
    }

    #[test]
    fn test_bind_named_record() {
        let mapper = Mapper::new(BindStyle::At);
        let (query, values) = mapper
            .bind_named(
                "UPDATE person SET last_name = :last_name WHERE first_name = :first_name",
                &ada(),
            )
            .unwrap();
        assert_eq!(
            query,
            "UPDATE person SET last_name = @1 WHERE first_name = @2"
        );
        assert_eq!(values, [Value::from("Lovelace"), Value::from("Ada")]);
    }

    #[test]
    fn test_bind_named_untagged_field() {
        let strict = Mapper::new(BindStyle::Question);
        let err = strict.bind_named("SELECT :email", &ada()).unwrap_err();
        assert!(matches!(err, Error::MissingValue { name } if name == "email"));

        let compat = Mapper::sqlx_compat(BindStyle::Question);
        let (_, values) = compat.bind_named("SELECT :email", &ada()).unwrap();
        assert_eq!(values, [Value::Null]);
    }

    #[test]
    fn test_sqlx_compat_unknown_style() {
        let args = HashMap::from([("id", 1i64)]);

        let mapper = Mapper::new(BindStyle::Unknown);
        let err = mapper.bind_named("SELECT :id", &args).unwrap_err();
        assert!(matches!(err, Error::BindStyleNotSet));

        let mapper = Mapper::sqlx_compat(BindStyle::Unknown);
        let (query, _) = mapper.bind_named("SELECT :id", &args).unwrap();
        assert_eq!(query, "SELECT ?");
    }

    #[test]
    fn test_bind_named_batch() {
        let mapper = Mapper::new(BindStyle::Dollar);
        let people = vec![ada(), ada()];
        let (query, values) = mapper
            .bind_named_batch(
                "INSERT INTO person (first_name, last_name) VALUES (:first_name, :last_name)",
                &people,
            )
            .unwrap();
        assert_eq!(
            query,
            "INSERT INTO person (first_name, last_name) VALUES ($1, $2),($3, $4)"
        );
        assert_eq!(values.len(), 4);
        assert_eq!(values[2], Value::from("Ada"));
    }

    #[test]
    fn test_bind_named_batch_single_element() {
        let mapper = Mapper::new(BindStyle::Question);
        let (query, values) = mapper
            .bind_named_batch("INSERT INTO person (first_name) VALUES (:first_name)", &[ada()])
            .unwrap();
        assert_eq!(query, "INSERT INTO person (first_name) VALUES (?)");
        assert_eq!(values, [Value::from("Ada")]);
    }

    #[test]
    fn test_scan_through_mapper() {
        let mut mapper = Mapper::new(BindStyle::Question);
        let rows = || {
            MemoryRows::new(["first_name", "last_name", "age"]).with_row([
                Value::from("Ada"),
                Value::from("Lovelace"),
                Value::Int(36),
            ])
        };

        let mut people: Vec<Person> = Vec::new();
        assert!(matches!(
            mapper.scan_all(&mut rows(), &mut people),
            Err(Error::UnmappedColumn { .. })
        ));

        mapper.set_unsafe_mode(true);
        mapper.scan_all(&mut rows(), &mut people).unwrap();
        assert_eq!(people, [ada()]);
    }

    #[test]
    fn test_describe_is_cached() {
        let mapper = Mapper::new(BindStyle::Question);
        let first = mapper.describe::<Person>().unwrap();
        let second = mapper.describe::<Person>().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            first.field_names().collect::<Vec<_>>(),
            ["first_name", "last_name"]
        );
    }
}
