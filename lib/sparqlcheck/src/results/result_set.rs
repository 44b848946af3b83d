//! Results written as `rs:ResultSet` RDF graphs.

use super::bindings::Bindings;
use super::standard::StandardResults;
use crate::error::ResultsError;
use crate::index::TripleIndex;
use crate::vocab::{rdf, rs};
use oxrdf::Term;

/// Decodes results written with the DAWG result-set vocabulary.
///
/// Solutions carrying an `rs:index` are put in index order, before the ones without.
pub fn from_result_set_graph(index: &TripleIndex) -> Result<StandardResults, ResultsError> {
    let result_set_type = Term::from(rs::RESULT_SET);
    let result_set = index
        .subjects()
        .find(|s| index.contains(s, rdf::TYPE, &result_set_type))
        .or_else(|| index.subjects_with(rs::BOOLEAN).next())
        .or_else(|| index.subjects_with(rs::RESULT_VARIABLE).next())
        .or_else(|| index.subjects_with(rs::SOLUTION).next())
        .ok_or_else(|| {
            ResultsError::msg(format!(
                "{} does not contain a rs:ResultSet",
                index.source().display()
            ))
        })?;

    if let Some(value) = index.object(result_set, rs::BOOLEAN) {
        return match value {
            Term::Literal(literal) => match literal.value() {
                "true" | "1" => Ok(StandardResults::Boolean(true)),
                "false" | "0" => Ok(StandardResults::Boolean(false)),
                other => Err(ResultsError::msg(format!("invalid rs:boolean value {other}"))),
            },
            other => Err(ResultsError::msg(format!("invalid rs:boolean value {other}"))),
        };
    }

    let mut bindings = Bindings::new(
        index
            .objects(result_set, rs::RESULT_VARIABLE)
            .filter_map(|v| match v {
                Term::Literal(v) => Some(v.value().to_owned()),
                _ => None,
            }),
    );
    let mut solutions = index
        .objects(result_set, rs::SOLUTION)
        .map(|solution| -> Result<_, ResultsError> {
            let position = match index.object(solution, rs::INDEX) {
                Some(Term::Literal(i)) => Some(i.value().parse::<u64>().map_err(|_| {
                    ResultsError::msg(format!("invalid rs:index value {}", i.value()))
                })?),
                _ => None,
            };
            let row = index
                .objects(solution, rs::BINDING)
                .filter_map(|binding| {
                    let Some(Term::Literal(variable)) = index.object(binding, rs::VARIABLE) else {
                        return None;
                    };
                    let value = index.object(binding, rs::VALUE)?;
                    Some((variable.value().to_owned(), value.clone()))
                })
                .collect::<Vec<_>>();
            Ok((position, row))
        })
        .collect::<Result<Vec<_>, _>>()?;
    solutions.sort_by_key(|(position, _)| position.map_or((1, 0), |p| (0, p)));
    for (_, row) in solutions {
        bindings.push_row(row);
    }
    Ok(StandardResults::Bindings(bindings))
}
