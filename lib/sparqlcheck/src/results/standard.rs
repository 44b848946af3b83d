//! SPARQL results XML, JSON and TSV documents.

use super::bindings::Bindings;
use crate::error::ResultsError;
use sparesults::{QueryResultsFormat, QueryResultsParser, ReaderQueryResultsParserOutput};

/// What a standard SPARQL results document contains.
#[derive(Debug, Clone, PartialEq)]
pub enum StandardResults {
    Bindings(Bindings),
    Boolean(bool),
}

/// Reads SPARQL results XML, JSON or TSV.
pub fn parse_standard(
    content: &[u8],
    format: QueryResultsFormat,
) -> Result<StandardResults, ResultsError> {
    match QueryResultsParser::from_format(format).for_reader(content)? {
        ReaderQueryResultsParserOutput::Boolean(value) => Ok(StandardResults::Boolean(value)),
        ReaderQueryResultsParserOutput::Solutions(solutions) => {
            let mut bindings =
                Bindings::new(solutions.variables().iter().map(|v| v.as_str().to_owned()));
            for solution in solutions {
                let solution = solution?;
                bindings.push_row(
                    solution
                        .iter()
                        .map(|(variable, value)| (variable.as_str().to_owned(), value.clone())),
                );
            }
            Ok(StandardResults::Bindings(bindings))
        }
    }
}
