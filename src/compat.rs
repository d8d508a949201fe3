//! Helpers kept for code written against sqlx's query conventions.

use std::sync::LazyLock;

use regex::Regex;

use crate::bind_style::BindStyle;

static VALUES_GROUP: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\)\s*(?i)VALUES\s*\("));

/// Rewrites the `?` placeholders of `query` for another bind style.
///
/// Numbered styles become `$1`, `@p1` or `:arg1`. `?` inside quoted
/// literals is left alone. Queries for [`BindStyle::Question`] and
/// [`BindStyle::Unknown`] are returned unchanged.
///
/// ```
/// use sqlsw::{compat::rebind, BindStyle};
///
/// assert_eq!(
///     rebind(BindStyle::Dollar, "select * from t where a = ? and b = '?' and c = ?"),
///     "select * from t where a = $1 and b = '?' and c = $2",
/// );
/// ```
pub fn rebind(style: BindStyle, query: &str) -> String {
    let prefix = match style {
        BindStyle::Question | BindStyle::Unknown => return query.to_owned(),
        BindStyle::Dollar => "$",
        BindStyle::Named => ":arg",
        BindStyle::At => "@p",
    };

    let mut rebound = String::with_capacity(query.len() + 10);
    let mut count = 0usize;
    let mut quote = None;
    for c in query.chars() {
        match (quote, c) {
            (Some(open), _) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '?') => {
                count += 1;
                rebound.push_str(prefix);
                rebound.push_str(&count.to_string());
                continue;
            }
            (None, _) => {}
        }
        rebound.push(c);
    }
    rebound
}

/// Repeats the first `VALUES (...)` group of an insert `count` times, for
/// inserting every element of a sequence argument in one statement.
///
/// The query is returned unchanged if it has no `VALUES (...)` group, if
/// the group's brackets do not balance, or if `count` is less than 2.
///
/// ```
/// use sqlsw::compat::expand_values;
///
/// let query = expand_values("INSERT INTO person (first, last) VALUES (:first, :last)", 3)?;
/// assert_eq!(
///     query,
///     "INSERT INTO person (first, last) VALUES (:first, :last),(:first, :last),(:first, :last)",
/// );
/// # Ok::<(), sqlsw::Error>(())
/// ```
pub fn expand_values(query: &str, count: usize) -> crate::Result<String> {
    let values = VALUES_GROUP.as_ref().map_err(|err| err.clone())?;
    let Some(found) = values.find(query) else {
        return Ok(query.to_owned());
    };
    if count < 2 {
        return Ok(query.to_owned());
    }

    let open = found.end() - 1;
    let Some(close) = matching_bracket(&query[open..]).map(|i| open + i + 1) else {
        return Ok(query.to_owned());
    };

    let group = &query[open..close];
    let mut expanded = String::with_capacity(query.len() + (group.len() + 1) * (count - 1));
    expanded.push_str(&query[..close]);
    for _ in 1..count {
        expanded.push(',');
        expanded.push_str(group);
    }
    expanded.push_str(&query[close..]);
    Ok(expanded)
}

/// Byte offset of the `)` closing the `(` that starts `s`.
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebind_styles() {
        let query = "SELECT * FROM foo WHERE a = ? AND b = ?";
        assert_eq!(rebind(BindStyle::Question, query), query);
        assert_eq!(rebind(BindStyle::Unknown, query), query);
        assert_eq!(
            rebind(BindStyle::Dollar, query),
            "SELECT * FROM foo WHERE a = $1 AND b = $2"
        );
        assert_eq!(
            rebind(BindStyle::At, query),
            "SELECT * FROM foo WHERE a = @p1 AND b = @p2"
        );
        assert_eq!(
            rebind(BindStyle::Named, query),
            "SELECT * FROM foo WHERE a = :arg1 AND b = :arg2"
        );
    }

    #[test]
    fn test_rebind_skips_literals() {
        assert_eq!(
            rebind(BindStyle::Dollar, r#"SELECT "why?", '?' FROM t WHERE a = ?"#),
            r#"SELECT "why?", '?' FROM t WHERE a = $1"#
        );
    }

    #[test]
    fn test_expand_values() {
        let query = "INSERT INTO t (a, b) VALUES (:a, lower(:b)) ON CONFLICT DO NOTHING";
        assert_eq!(
            expand_values(query, 2).unwrap(),
            "INSERT INTO t (a, b) VALUES (:a, lower(:b)),(:a, lower(:b)) ON CONFLICT DO NOTHING"
        );
    }

    #[test]
    fn test_expand_values_case_insensitive() {
        assert_eq!(
            expand_values("insert into t (a) values(:a)", 2).unwrap(),
            "insert into t (a) values(:a),(:a)"
        );
    }

    #[test]
    fn test_expand_values_unchanged() {
        let single = "INSERT INTO t (a) VALUES (:a)";
        assert_eq!(expand_values(single, 1).unwrap(), single);

        let no_values = "UPDATE t SET a = :a";
        assert_eq!(expand_values(no_values, 3).unwrap(), no_values);

        let unbalanced = "INSERT INTO t (a) VALUES (:a";
        assert_eq!(expand_values(unbalanced, 3).unwrap(), unbalanced);
    }

    #[test]
    fn test_values_pattern_is_shared() {
        assert!(VALUES_GROUP.is_ok());
        for count in 2..5 {
            let expanded = expand_values("INSERT INTO t (a) VALUES (?)", count).unwrap();
            assert_eq!(expanded.matches("(?)").count(), count);
        }
    }
}
