//! SPARQL results JSON compared as documents.

use super::BlankNodeRenamer;
use crate::error::ResultsError;
use serde_json::{Map, Value};
use std::fmt;

/// A SPARQL results JSON document reduced to its logical content.
///
/// Only `head` (without `link`), `results.bindings` and `boolean` are kept,
/// `typed-literal` values are plain `literal`s and blank nodes are relabeled.
/// The variables of a document without any solution are dropped, so an
/// engine printing nothing matches an empty expected document.
/// The text is pretty printed with sorted keys so equal documents are equal strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredDocument {
    text: String,
}

impl StructuredDocument {
    pub fn parse(content: &[u8], ordered: bool) -> Result<Self, ResultsError> {
        let Value::Object(mut root) = serde_json::from_slice(content)? else {
            return Err(ResultsError::msg("the results document is not a JSON object"));
        };
        let mut document = Map::new();
        let bindings = match root
            .get_mut("results")
            .and_then(|results| results.get_mut("bindings"))
            .map(Value::take)
        {
            Some(Value::Array(bindings)) => Some(bindings),
            _ => None,
        };
        let no_solution = bindings.as_ref().is_some_and(Vec::is_empty);
        if let Some(mut head) = root.remove("head") {
            if let Value::Object(head) = &mut head {
                head.remove("link");
                if no_solution {
                    head.remove("vars");
                }
            }
            if head.as_object().is_none_or(|head| !head.is_empty()) {
                document.insert("head".into(), head);
            }
        }
        if let Some(boolean) = root.remove("boolean") {
            document.insert("boolean".into(), boolean);
        }
        if let Some(bindings) = bindings {
            let mut results = Map::new();
            results.insert("bindings".into(), Value::Array(normalize(bindings, ordered)));
            document.insert("results".into(), Value::Object(results));
        }
        Ok(Self {
            text: serde_json::to_string_pretty(&Value::Object(document))?,
        })
    }

    /// The document of an empty solution sequence.
    pub fn empty() -> Result<Self, ResultsError> {
        Self::parse(br#"{"results":{"bindings":[]}}"#, false)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

impl fmt::Display for StructuredDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn normalize(bindings: Vec<Value>, ordered: bool) -> Vec<Value> {
    let mut bindings = bindings
        .into_iter()
        .map(|mut binding| {
            for_each_term(&mut binding, |term| {
                if term.get("type").and_then(Value::as_str) == Some("typed-literal") {
                    term.insert("type".into(), "literal".into());
                }
            });
            let mut masked = binding.clone();
            for_each_term(&mut masked, |term| {
                if term.get("type").and_then(Value::as_str) == Some("bnode") {
                    term.insert("value".into(), "".into());
                }
            });
            (masked.to_string(), binding)
        })
        .collect::<Vec<_>>();
    if !ordered {
        bindings.sort_by(|(a, _), (b, _)| a.cmp(b));
    }
    let mut renamer = BlankNodeRenamer::default();
    bindings
        .into_iter()
        .map(|(_, mut binding)| {
            for_each_term(&mut binding, |term| {
                if term.get("type").and_then(Value::as_str) == Some("bnode") {
                    if let Some(Value::String(id)) = term.get("value") {
                        let label = renamer.rename(id);
                        term.insert("value".into(), label.into());
                    }
                }
            });
            binding
        })
        .collect()
}

/// Calls `f` on the term object of each variable of a binding, in variable order.
fn for_each_term(binding: &mut Value, mut f: impl FnMut(&mut Map<String, Value>)) {
    if let Value::Object(binding) = binding {
        for term in binding.values_mut() {
            if let Value::Object(term) = term {
                f(term);
            }
        }
    }
}
