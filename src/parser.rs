use smallvec::SmallVec;

use crate::bind_style::BindStyle;
use crate::error::Error;

/// Options for [`parse`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Placeholder syntax written into the rewritten query
    pub bind_style: BindStyle,
    /// Rewrite to `?` when the bind style is [`BindStyle::Unknown`] instead of
    /// failing, as legacy sqlx code expects
    pub sqlx_compat: bool,
}

impl ParseOptions {
    pub fn new(bind_style: BindStyle) -> Self {
        Self {
            bind_style,
            sqlx_compat: false,
        }
    }
}

/// A query with its named parameters replaced by driver placeholders.
///
/// `parameters()[i]` is the name that was written at the `i`-th placeholder
/// of `query()`, counting from the left. A name used twice appears twice.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParseResult {
    query: String,
    parameters: Vec<String>,
}

impl ParseResult {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.query, self.parameters)
    }
}

/// Replaces the named parameters (`:name`) of `query` with the placeholders
/// of the configured bind style and returns the parameter names in order.
///
/// The query is scanned once from left to right. Text inside `'...'`,
/// `"..."` and `` `...` `` is copied untouched, `::` (a PostgreSQL cast) is
/// never a parameter, and a `:` that is not followed by a name is kept as is.
///
/// # Parameter names
///
/// A name is a run of letters, digits and `_`. A `.` joins two such runs,
/// so `:address.city` names a nested field, but a trailing dot ends the
/// name and is copied as text. A bare `:` (followed by a space, a quote,
/// punctuation or the end of the query) is copied unchanged and the next
/// character is handled normally.
///
/// ```
/// use sqlsw::{parse, BindStyle, ParseOptions};
///
/// let parsed = parse(
///     "select a : b from t where x = :first_name and y = :address.city and z = :id.",
///     ParseOptions::new(BindStyle::Question),
/// )?;
/// assert_eq!(parsed.query(), "select a : b from t where x = ? and y = ? and z = ?.");
/// assert_eq!(parsed.parameters(), ["first_name", "address.city", "id"]);
/// # Ok::<(), sqlsw::Error>(())
/// ```
///
/// # Examples
///
/// ```
/// use sqlsw::{parse, BindStyle, ParseOptions};
///
/// let parsed = parse(
///     r#"select "ID" from "MyTable" where "ID" = :ID or "Parent" = :ID"#,
///     ParseOptions::new(BindStyle::Dollar),
/// )?;
/// assert_eq!(parsed.query(), r#"select "ID" from "MyTable" where "ID" = $1 or "Parent" = $2"#);
/// assert_eq!(parsed.parameters(), ["ID", "ID"]);
/// # Ok::<(), sqlsw::Error>(())
/// ```
///
/// # Errors
///
/// Returns [`Error::UnterminatedLiteral`] if a quote is never closed and
/// [`Error::BindStyleNotSet`] if a parameter is found while the bind style
/// is still unknown.
pub fn parse(query: &str, options: ParseOptions) -> crate::Result<ParseResult> {
    let mut rewritten = String::with_capacity(query.len());
    let mut parameters: SmallVec<[&str; 16]> = SmallVec::new();
    // numbered styles count placeholders, not distinct names
    let mut index = 1usize;
    let mut pos = 0;

    while let Some(c) = query[pos..].chars().next() {
        match c {
            ':' => {
                let start = pos + 1;
                let end = start + name_len(&query[start..]);
                if start == end {
                    if query[start..].starts_with(':') {
                        rewritten.push_str("::");
                        pos = start + 1;
                    } else {
                        rewritten.push(':');
                        pos = start;
                    }
                    continue;
                }
                let name = &query[start..end];
                parameters.push(name);
                match options.bind_style {
                    BindStyle::Question => rewritten.push('?'),
                    BindStyle::Named => {
                        rewritten.push(':');
                        rewritten.push_str(name);
                    }
                    BindStyle::Dollar => {
                        rewritten.push('$');
                        rewritten.push_str(&index.to_string());
                        index += 1;
                    }
                    BindStyle::At => {
                        rewritten.push('@');
                        rewritten.push_str(&index.to_string());
                        index += 1;
                    }
                    BindStyle::Unknown if options.sqlx_compat => rewritten.push('?'),
                    BindStyle::Unknown => return Err(Error::BindStyleNotSet),
                }
                pos = end;
            }
            '\'' | '"' | '`' => {
                let body = pos + 1;
                let Some(offset) = query[body..].find(c) else {
                    return Err(Error::UnterminatedLiteral {
                        quote: c,
                        fragment: query[pos..].to_owned(),
                    });
                };
                let end = body + offset + 1;
                rewritten.push_str(&query[pos..end]);
                pos = end;
            }
            _ => {
                rewritten.push(c);
                pos += c.len_utf8();
            }
        }
    }

    tracing::trace!(query = %rewritten, parameters = parameters.len(), "rewrote named query");

    Ok(ParseResult {
        query: rewritten,
        parameters: parameters.iter().map(|&name| name.to_owned()).collect(),
    })
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Byte length of the parameter name at the start of `rest`.
///
/// A `.` only continues a name when another name character follows it, so
/// `:user.id` is one name but the dot in `= :id.` is plain text.
fn name_len(rest: &str) -> usize {
    let mut len = 0;
    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if is_name_char(c) {
            len = i + c.len_utf8();
            continue;
        }
        if c == '.' && len > 0 && chars.peek().is_some_and(|&(_, next)| is_name_char(next)) {
            continue;
        }
        break;
    }
    len
}
