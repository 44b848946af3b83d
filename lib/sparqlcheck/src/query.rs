//! Just enough query inspection to pick a result shape.

use regex::Regex;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

static IRI_OR_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<[^<>"{}|^`\\\s]*>|"""(?:[^"\\]|\\.|"[^"])*"""|'''(?:[^'\\]|\\.|'[^'])*'''|"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'"#)
        .unwrap_or_else(|e| unreachable!("{e}"))
});
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[^\n]*").unwrap_or_else(|e| unreachable!("{e}")));
static FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(SELECT|CONSTRUCT|DESCRIBE|ASK)\b").unwrap_or_else(|e| unreachable!("{e}"))
});
static ORDER_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bORDER\s+BY\b").unwrap_or_else(|e| unreachable!("{e}")));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryForm {
    Select,
    Construct,
    Describe,
    Ask,
}

impl QueryForm {
    pub fn returns_graph(self) -> bool {
        matches!(self, Self::Construct | Self::Describe)
    }
}

/// The query form and whether the solutions are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryInfo {
    pub form: QueryForm,
    pub ordered: bool,
}

impl Default for QueryInfo {
    fn default() -> Self {
        Self {
            form: QueryForm::Select,
            ordered: false,
        }
    }
}

impl QueryInfo {
    pub fn read(path: &Path) -> io::Result<Self> {
        Ok(Self::sniff(&fs::read_to_string(path)?))
    }

    /// Guesses the form from the first query keyword outside IRIs, strings and comments.
    ///
    /// Queries without any form keyword are treated as `SELECT`.
    pub fn sniff(query: &str) -> Self {
        let stripped = IRI_OR_STRING.replace_all(query, " ");
        let stripped = COMMENT.replace_all(&stripped, " ");
        let form = FORM
            .captures(&stripped)
            .and_then(|c| c.get(1))
            .map_or(QueryForm::Select, |m| {
                match m.as_str().to_ascii_uppercase().as_str() {
                    "CONSTRUCT" => QueryForm::Construct,
                    "DESCRIBE" => QueryForm::Describe,
                    "ASK" => QueryForm::Ask,
                    _ => QueryForm::Select,
                }
            });
        Self {
            form,
            ordered: ORDER_BY.is_match(&stripped),
        }
    }
}
