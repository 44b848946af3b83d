//! SPARQL results CSV and TSV helpers.

use super::bindings::{Bindings, Fidelity};
use crate::error::ResultsError;
use oxiri::Iri;
use oxrdf::{BlankNode, Literal, NamedNode, Term};

/// Reads SPARQL results CSV.
///
/// CSV does not say what kind of term a value is: `_:` prefixed values are
/// taken as blank nodes, absolute IRIs as IRIs and anything else as a simple
/// literal. Empty values are unbound.
pub fn parse_csv(text: &str) -> Result<Bindings, ResultsError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let variables = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches(['?', '$']).to_owned())
        .filter(|h| !h.is_empty())
        .collect::<Vec<_>>();
    let mut bindings = Bindings::new(variables.iter().cloned()).with_fidelity(Fidelity::Csv);
    for record in reader.records() {
        let record = record?;
        if record.len() > variables.len() {
            return Err(ResultsError::msg(format!(
                "CSV row {} has {} values for {} variables",
                record.position().map_or(0, |p| p.line()),
                record.len(),
                variables.len()
            )));
        }
        bindings.push_row(
            variables
                .iter()
                .zip(record.iter())
                .filter_map(|(variable, value)| Some((variable.clone(), csv_term(value)?))),
        );
    }
    Ok(bindings)
}

/// The term a CSV value stands for, `None` if the value is empty.
pub(crate) fn csv_term(value: &str) -> Option<Term> {
    if value.is_empty() {
        return None;
    }
    if let Some(id) = value.strip_prefix("_:") {
        if let Ok(node) = BlankNode::new(id) {
            return Some(node.into());
        }
    }
    if value.contains(':') && Iri::parse(value).is_ok() {
        return Some(NamedNode::new_unchecked(value).into());
    }
    Some(Literal::new_simple_literal(value).into())
}

/// Reads a boolean written as a single value under an optional header line.
pub fn parse_delimited_boolean(text: &str) -> Result<bool, ResultsError> {
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.trim_matches('"').to_ascii_lowercase().as_str() {
            "true" | "1" => return Ok(true),
            "false" | "0" => return Ok(false),
            _ => (),
        }
    }
    Err(ResultsError::msg("no boolean value found"))
}
