use sqlx::{Executor, MySql};

use crate::mysql::MySqlRows;
use crate::query::NamedQuery;
use crate::record::Record;
use crate::scan::RowCursor;

/// Typed results, filled through the mapper's record descriptors.
impl NamedQuery<'_> {
    /// Executes the query and returns all matching rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or if any row cannot be stored
    /// into `T`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use std::collections::HashMap;
    /// use sqlx::MySqlPool;
    /// use sqlsw::{record, Mapper};
    ///
    /// #[derive(Debug, Default)]
    /// struct User {
    ///     id: i64,
    ///     name: String,
    /// }
    ///
    /// record!(User {
    ///     column id: "id",
    ///     column name: "name",
    /// });
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let pool = MySqlPool::connect("mysql://localhost/test").await?;
    /// let mapper = Mapper::for_driver("mysql")?;
    /// let args = HashMap::from([("min_age", 18i64)]);
    ///
    /// let users: Vec<User> = mapper
    ///     .query("SELECT id, name FROM users WHERE age > :min_age", &args)?
    ///     .fetch_all(&pool)
    ///     .await?;
    /// println!("Found {} users", users.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn fetch_all<'e, T, E>(&self, executor: E) -> crate::Result<Vec<T>>
    where
        T: Record + Default,
        E: Executor<'e, Database = MySql>,
    {
        let mut rows = self.fetch_rows(executor).await?;
        let mut records = Vec::new();
        self.mapper.scan_all(&mut rows, &mut records)?;
        Ok(records)
    }

    /// Executes the query and returns the first row.
    ///
    /// # Errors
    ///
    /// Returns [`sqlx::Error::RowNotFound`] (as [`Error::Database`](crate::Error::Database))
    /// if the query returned no rows.
    pub async fn fetch_one<'e, T, E>(&self, executor: E) -> crate::Result<T>
    where
        T: Record + Default,
        E: Executor<'e, Database = MySql>,
    {
        self.fetch_optional(executor)
            .await?
            .ok_or_else(|| sqlx::Error::RowNotFound.into())
    }

    /// Executes the query and returns the first row, if any.
    ///
    /// Only the first row is read from the server.
    pub async fn fetch_optional<'e, T, E>(&self, executor: E) -> crate::Result<Option<T>>
    where
        T: Record + Default,
        E: Executor<'e, Database = MySql>,
    {
        let Some(row) = self.build().fetch_optional(executor).await? else {
            return Ok(None);
        };
        let mut rows = MySqlRows::from_rows(std::slice::from_ref(&row))?;
        if !rows.advance() {
            return Ok(None);
        }
        let mut record = T::default();
        self.mapper.scan_row(&mut rows, &mut record)?;
        Ok(Some(record))
    }
}
