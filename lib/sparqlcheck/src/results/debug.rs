//! The engine's debug output: one `row: [name=value, ...]` line per solution.

use super::bindings::Bindings;
use crate::error::ResultsError;
use crate::vocab::xsd;
use oxrdf::{BlankNode, Literal, NamedNode, Term};
use std::str::FromStr;

/// Reads the solutions printed in debug format.
///
/// Lines other than rows are ignored.
pub fn parse_debug_rows(text: &str) -> Result<Bindings, ResultsError> {
    let mut bindings = Bindings::default();
    for (number, line) in text.lines().enumerate() {
        let Some(row) = line
            .trim()
            .strip_prefix("row:")
            .map(str::trim_start)
            .and_then(|r| r.strip_prefix('['))
            .and_then(|r| r.strip_suffix(']'))
        else {
            continue;
        };
        let values = RowParser { rest: row }
            .parse()
            .map_err(|e| ResultsError::msg(format!("line {}: {e}", number + 1)))?;
        bindings.push_row(values);
    }
    Ok(bindings)
}

/// Reads a boolean printed as `boolean: true`, `... boolean result: true` or just `true`.
pub fn parse_debug_boolean(text: &str) -> Result<bool, ResultsError> {
    for line in text.lines().map(str::trim) {
        let value = line
            .strip_prefix("boolean:")
            .or_else(|| line.rsplit_once("boolean result:").map(|(_, v)| v))
            .unwrap_or(line)
            .trim();
        match value {
            "true" => return Ok(true),
            "false" => return Ok(false),
            _ => (),
        }
    }
    Err(ResultsError::msg("no boolean result found"))
}

struct RowParser<'a> {
    rest: &'a str,
}

impl RowParser<'_> {
    fn parse(mut self) -> Result<Vec<(String, Term)>, String> {
        let mut values = Vec::new();
        while !self.rest.trim().is_empty() {
            let (name, rest) = self
                .rest
                .split_once('=')
                .ok_or_else(|| format!("expecting name=value in '{}'", self.rest))?;
            self.rest = rest;
            let name = name.trim().trim_start_matches(['?', '$']).to_owned();
            if let Some(value) = self.value()? {
                values.push((name, value));
            }
            self.rest = self.rest.trim_start();
            if let Some(rest) = self.rest.strip_prefix(',') {
                self.rest = rest;
            } else if !self.rest.is_empty() {
                return Err(format!("unexpected '{}' after value", self.rest));
            }
        }
        Ok(values)
    }

    fn value(&mut self) -> Result<Option<Term>, String> {
        let rest = self.rest.trim_start();
        for unbound in ["NULL", "UNDEF"] {
            if let Some(r) = rest.strip_prefix(unbound) {
                self.rest = r;
                return Ok(None);
            }
        }
        if let Some(r) = rest.strip_prefix("uri<") {
            let (iri, r) = r.split_once('>').ok_or("unterminated uri<")?;
            self.rest = r;
            return NamedNode::new(iri)
                .map(|n| Some(n.into()))
                .map_err(|e| e.to_string());
        }
        if let Some(r) = rest.strip_prefix("blank _:").or_else(|| rest.strip_prefix("_:")) {
            let end = r
                .find(|c: char| c == ',' || c.is_whitespace())
                .unwrap_or(r.len());
            self.rest = &r[end..];
            return blank_node(&r[..end]).map(Some);
        }
        if let Some(r) = rest.strip_prefix("blank(") {
            let (id, r) = r.split_once(')').ok_or("unterminated blank(")?;
            self.rest = r;
            return blank_node(id).map(Some);
        }
        if let Some(r) = rest.strip_prefix("string(") {
            let end = literal_end(r)?;
            let literal = &r[..end];
            self.rest = r[end..].strip_prefix(')').ok_or("unterminated string(")?;
            return Literal::from_str(literal)
                .map(|l| Some(l.into()))
                .map_err(|e| e.to_string());
        }
        if rest.starts_with('"') {
            let end = literal_end(rest)?;
            self.rest = &rest[end..];
            return Literal::from_str(&rest[..end])
                .map(|l| Some(l.into()))
                .map_err(|e| e.to_string());
        }
        if let Some(r) = rest.strip_prefix('<') {
            let (iri, r) = r.split_once('>').ok_or("unterminated IRI")?;
            self.rest = r;
            return NamedNode::new(iri)
                .map(|n| Some(n.into()))
                .map_err(|e| e.to_string());
        }
        if let Some((function, r)) = rest.split_once('(') {
            if let Some(datatype) = shorthand_datatype(function) {
                let (lexical, r) = r.split_once(')').ok_or("unterminated typed value")?;
                self.rest = r;
                return Ok(Some(
                    Literal::new_typed_literal(
                        lexical,
                        NamedNode::new_unchecked(format!("{}{datatype}", xsd::NAMESPACE)),
                    )
                    .into(),
                ));
            }
        }
        Err(format!("unsupported value '{rest}'"))
    }
}

fn shorthand_datatype(function: &str) -> Option<&'static str> {
    Some(match function {
        "integer" => "integer",
        "decimal" => "decimal",
        "double" => "double",
        "float" => "float",
        "boolean" => "boolean",
        "datetime" | "dateTime" => "dateTime",
        "date" => "date",
        _ => return None,
    })
}

fn blank_node(id: &str) -> Result<Term, String> {
    BlankNode::new(id).map(Into::into).map_err(|e| e.to_string())
}

/// Byte length of the N-Triples literal at the start of `text`, suffix included.
fn literal_end(text: &str) -> Result<usize, String> {
    if !text.starts_with('"') {
        return Err(format!("expecting a quoted literal in '{text}'"));
    }
    let mut escaped = false;
    let mut end = None;
    for (i, c) in text.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => {
                end = Some(i + 1);
                break;
            }
            _ => (),
        }
    }
    let end = end.ok_or("unterminated string")?;
    let suffix = &text[end..];
    if let Some(language) = suffix.strip_prefix('@') {
        let len = language
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(language.len());
        Ok(end + 1 + len)
    } else if let Some(datatype) = suffix.strip_prefix("^^<") {
        let len = datatype.find('>').ok_or("unterminated datatype")?;
        Ok(end + 3 + len + 1)
    } else {
        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_every_value_form() {
        let output = "roqet: Running query\n\
            row: [a=uri<http://example.com/a>, b=string(\"x, y\"@en), c=NULL]\n\
            row: [a=blank _:r1, b=integer(5), c=string(\"q\\\"\"^^<http://example.com/dt>)]\n\
            row: [a=blank(r2), b=\"plain\", c=<http://example.com/c>]\n\
            roqet: Query returned 3 results\n";
        let bindings = parse_debug_rows(output).unwrap();
        assert_eq!(bindings.variables(), ["a", "b", "c"]);
        assert_eq!(bindings.len(), 3);
        let rows = bindings.rows();
        assert_eq!(
            rows[0]["b"],
            Term::from(Literal::new_language_tagged_literal_unchecked("x, y", "en"))
        );
        assert!(!rows[0].contains_key("c"));
        assert_eq!(rows[1]["a"], Term::from(BlankNode::new_unchecked("r1")));
        assert_eq!(
            rows[1]["b"],
            Term::from(Literal::new_typed_literal(
                "5",
                NamedNode::new_unchecked("http://www.w3.org/2001/XMLSchema#integer")
            ))
        );
        assert_eq!(
            rows[1]["c"],
            Term::from(Literal::new_typed_literal(
                "q\"",
                NamedNode::new_unchecked("http://example.com/dt")
            ))
        );
        assert_eq!(rows[2]["a"], Term::from(BlankNode::new_unchecked("r2")));
        assert_eq!(rows[2]["b"], Term::from(Literal::new_simple_literal("plain")));
    }

    #[test]
    fn no_rows_is_empty() {
        assert!(parse_debug_rows("roqet: Query returned 0 results\n").unwrap().is_empty());
    }

    #[test]
    fn malformed_rows_are_errors() {
        assert!(parse_debug_rows("row: [a=mystery]\n").is_err());
        assert!(parse_debug_rows("row: [a=string(\"open)]\n").is_err());
    }

    #[test]
    fn booleans() {
        assert!(parse_debug_boolean("boolean: true\n").unwrap());
        assert!(!parse_debug_boolean("roqet: Query has a boolean result: false\n").unwrap());
        assert!(parse_debug_boolean("\ntrue\n").unwrap());
        assert!(parse_debug_boolean("row: [a=NULL]\n").is_err());
    }
}
