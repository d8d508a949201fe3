use crate::bind_style::BindStyle;

/// Error types for sqlsw
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A quoted literal was opened but never closed
    #[error("missing matching {quote} character between `{fragment}`")]
    UnterminatedLiteral { quote: char, fragment: String },

    /// The query named parameters but the bind style was never resolved
    #[error("bind type is not set")]
    BindStyleNotSet,

    /// The bind style cannot be used for this operation
    #[error("unsupported bind type: {0}")]
    UnsupportedBindStyle(BindStyle),

    /// A driver name was registered twice
    #[error("cannot bind over existing driver name: {0}")]
    DuplicateDriver(String),

    /// No bind style is known for the driver name
    #[error("unable to get bind type for driver: {0}, use BindStyle::register to define how your database handles bound parameters")]
    UnknownDriver(String),

    /// The named argument is not a map, record or sequence of those
    #[error("unexpected named parameter {shape}, expected map, array, slice, struct or pointer to struct")]
    UnexpectedArgument { shape: &'static str },

    /// A named parameter has no value in the map or record it was bound from
    #[error("missing value for named parameter: {name}")]
    MissingValue { name: String },

    /// A sequence argument with no elements
    #[error("length of argument sequence is 0")]
    EmptySequence,

    /// A result column has no field on the destination record
    #[error("missing destination name {column} in {record}")]
    UnmappedColumn { column: String, record: &'static str },

    /// One or more problems found while describing a record type
    #[error(transparent)]
    Reflection(#[from] ReflectionErrors),

    /// A cached field path does not match what the record reports at runtime
    #[error("field path for `{name}` is not valid on {record}")]
    InvalidFieldPath { name: String, record: &'static str },

    /// A column value could not be stored into its destination
    #[error("unable to decode column `{column}`: {source}")]
    Decode {
        column: String,
        #[source]
        source: ValueError,
    },

    /// A row was scanned before advancing the cursor or after its last row
    #[error("scan called without a current row, call advance first")]
    NoCurrentRow,

    /// The cursor returned a different number of values than it has columns
    #[error("expected {expected} values from row but scan returned {actual}")]
    ColumnCount { expected: usize, actual: usize },

    /// The driver returned a column type that has no `Value` representation
    #[error("unsupported type {type_name} for column `{column}`")]
    UnsupportedColumnType { column: String, type_name: String },

    /// Error while compiling an internal pattern
    #[error("Failed to compile pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Error from SQLx database operations
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A failed conversion between a [`Value`](crate::Value) and a field type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("unexpected NULL for non-optional {expected}")]
    UnexpectedNull { expected: &'static str },

    #[error("cannot convert {found} into {expected}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("value {value} is out of range for {expected}")]
    OutOfRange { expected: &'static str, value: String },
}

/// All problems collected while describing one record type.
///
/// Describing keeps going after the first problem so a single error lists
/// everything wrong with the type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", summarize(.errors))]
pub struct ReflectionErrors {
    errors: Vec<String>,
}

impl ReflectionErrors {
    pub(crate) fn new(errors: Vec<String>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

fn summarize(errors: &[String]) -> String {
    match errors {
        [] => "missing error information".to_owned(),
        [only] => only.clone(),
        many => many.iter().fold(
            String::from("Multiple reflection errors:\n"),
            |mut out, err| {
                out.push_str("- ");
                out.push_str(err);
                out.push('\n');
                out
            },
        ),
    }
}

/// Result type alias for sqlsw operations
pub type Result<T> = std::result::Result<T, Error>;
