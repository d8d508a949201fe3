use sqlx::mysql::{MySqlArguments, MySqlQueryResult};
use sqlx::query::Query;
use sqlx::{Executor, MySql};

use crate::mapper::Mapper;
use crate::mysql::MySqlRows;
use crate::value::Value;

/// Type alias for SQLx Query with MySQL arguments
pub type Q<'q> = Query<'q, MySql, MySqlArguments>;

/// A named query that has been rewritten and bound, ready to run through
/// SQLx.
///
/// `NamedQuery` keeps the rewritten SQL and the resolved values, and builds
/// a fresh SQLx `Query` on each execution, so it can be run any number of
/// times against a pool or a transaction.
///
/// # Examples
///
/// ```rust,no_run
/// use std::collections::HashMap;
/// use sqlx::MySqlPool;
/// use sqlsw::Mapper;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let pool = MySqlPool::connect("mysql://localhost/test").await?;
/// let mapper = Mapper::for_driver("mysql")?;
/// let args = HashMap::from([("user_id", 42i64)]);
///
/// let query = mapper.query("DELETE FROM users WHERE user_id = :user_id", &args)?;
/// let result = query.execute(&pool).await?;
/// println!("Deleted {} rows", result.rows_affected());
/// # Ok(())
/// # }
/// ```
///
/// # Using with Transactions
///
/// ```rust,no_run
/// use std::collections::HashMap;
/// use sqlx::{MySql, MySqlPool, Transaction};
/// use sqlsw::Mapper;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let pool = MySqlPool::connect("mysql://localhost/test").await?;
/// let mapper = Mapper::for_driver("mysql")?;
/// let mut tx: Transaction<MySql> = pool.begin().await?;
///
/// let args = HashMap::from([("user_id", "1".to_owned()), ("name", "Jane Doe".to_owned())]);
/// mapper
///     .query("UPDATE users SET name = :name WHERE user_id = :user_id", &args)?
///     .execute(&mut *tx)
///     .await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct NamedQuery<'m> {
    pub(crate) mapper: &'m Mapper,
    sql: String,
    values: Vec<Value>,
}

impl<'m> NamedQuery<'m> {
    pub(crate) fn new(mapper: &'m Mapper, sql: String, values: Vec<Value>) -> Self {
        Self { mapper, sql, values }
    }

    /// The rewritten SQL.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Values in placeholder order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub(crate) fn build(&self) -> Q<'_> {
        tracing::trace!(sql = %self.sql, values = self.values.len(), "running named query");
        self.values
            .iter()
            .fold(sqlx::query::<MySql>(&self.sql), bind_value)
    }

    /// Executes the query using the provided executor.
    ///
    /// Works with any SQLx `Executor`, including `MySqlPool` and
    /// `Transaction`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn execute<'e, E>(&self, executor: E) -> crate::Result<MySqlQueryResult>
    where
        E: Executor<'e, Database = MySql>,
    {
        Ok(self.build().execute(executor).await?)
    }

    /// Executes the query and buffers every result row.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a column has a type with no
    /// [`Value`] representation.
    pub async fn fetch_rows<'e, E>(&self, executor: E) -> crate::Result<MySqlRows>
    where
        E: Executor<'e, Database = MySql>,
    {
        let rows = self.build().fetch_all(executor).await?;
        MySqlRows::from_rows(&rows)
    }
}

fn bind_value<'q>(query: Q<'q>, value: &Value) -> Q<'q> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::UInt(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Bytes(v) => query.bind(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::{BindStyle, Mapper, Value};

    #[test]
    fn test_named_query_rewrites_and_binds() {
        let mapper = Mapper::new(BindStyle::Question);
        let args = HashMap::from([("id", Value::Int(1)), ("name", Value::from("Ada"))]);
        let query = mapper
            .query(
                "SELECT * FROM users WHERE id = :id OR name = :name OR parent_id = :id",
                &args,
            )
            .unwrap();

        assert_eq!(
            query.sql(),
            "SELECT * FROM users WHERE id = ? OR name = ? OR parent_id = ?"
        );
        assert_eq!(
            query.values(),
            [Value::Int(1), Value::from("Ada"), Value::Int(1)]
        );
    }

    #[test]
    fn test_named_query_without_parameters() {
        let mapper = Mapper::new(BindStyle::Question);
        let args: HashMap<&str, Value> = HashMap::new();
        let query = mapper.query("SELECT 1", &args).unwrap();
        assert_eq!(query.sql(), "SELECT 1");
        assert!(query.values().is_empty());
    }
}
