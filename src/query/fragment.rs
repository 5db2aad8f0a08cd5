//! Parameterized SQL fragments
//!
//! Values never enter the SQL text: every value is bound through a `?`
//! placeholder and carried in `params`. Only static skeletons and quoted
//! identifiers are appended as text.

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};

use crate::codec::Token;

/// A bound parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<Token> for SqlParam {
    fn from(token: Token) -> Self {
        match token {
            Token::Null => SqlParam::Null,
            Token::Integer(n) => SqlParam::Integer(n),
            Token::Real(f) => SqlParam::Real(f),
            Token::Text(s) => SqlParam::Text(s),
        }
    }
}

impl From<i64> for SqlParam {
    fn from(n: i64) -> Self {
        SqlParam::Integer(n)
    }
}

impl From<&str> for SqlParam {
    fn from(s: &str) -> Self {
        SqlParam::Text(s.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(s: String) -> Self {
        SqlParam::Text(s)
    }
}

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(match self {
            SqlParam::Null => SqlValue::Null,
            SqlParam::Integer(n) => SqlValue::Integer(*n),
            SqlParam::Real(f) => SqlValue::Real(*f),
            SqlParam::Text(s) => SqlValue::Text(s.clone()),
        }))
    }
}

/// Quotes an identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL text with its bound parameters in placeholder order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fragment from static SQL text
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Appends static SQL text
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Appends a `?` placeholder bound to `param`
    pub fn push_param(&mut self, param: impl Into<SqlParam>) -> &mut Self {
        self.sql.push('?');
        self.params.push(param.into());
        self
    }

    /// Appends a comma-separated placeholder list
    pub fn push_params<P: Into<SqlParam>>(&mut self, params: impl IntoIterator<Item = P>) -> &mut Self {
        for (i, param) in params.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.push_param(param);
        }
        self
    }

    /// Appends a quoted identifier
    pub fn push_ident(&mut self, name: &str) -> &mut Self {
        self.sql.push_str(&quote_ident(name));
        self
    }

    /// Appends another fragment with its parameters
    pub fn append(&mut self, other: &SqlFragment) -> &mut Self {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params.iter().cloned());
        self
    }

    /// Joins fragments with a static separator
    pub fn join(parts: &[SqlFragment], separator: &str) -> SqlFragment {
        let mut out = SqlFragment::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            out.append(part);
        }
        out
    }

    /// Wraps the fragment in parentheses
    pub fn parenthesized(&self) -> SqlFragment {
        let mut out = SqlFragment::raw("(");
        out.append(self).push(")");
        out
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// Number of `?` placeholders the text carries
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_follow_placeholders() {
        let mut frag = SqlFragment::raw("v.");
        frag.push_ident("pos").push(" IN (").push_params([1i64, 2, 3]).push(")");
        assert_eq!(frag.sql, "v.\"pos\" IN (?, ?, ?)");
        assert_eq!(frag.params.len(), 3);
        assert_eq!(frag.placeholder_count(), 3);
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_join_and_parenthesize() {
        let mut a = SqlFragment::raw("x = ");
        a.push_param("it's");
        let b = SqlFragment::raw("y IS NULL");
        let joined = SqlFragment::join(&[a, b], " OR ").parenthesized();
        assert_eq!(joined.sql, "(x = ? OR y IS NULL)");
        assert_eq!(joined.params, vec![SqlParam::Text("it's".to_string())]);
    }
}
