//! Query results in canonical form, read from engine output or expected result files.

mod bindings;
mod debug;
mod delimited;
mod document;
mod graph;
mod result_set;
mod standard;

pub use self::bindings::{Bindings, Fidelity, canonical_pair, column_order};
pub use self::debug::{parse_debug_boolean, parse_debug_rows};
pub use self::delimited::{parse_csv, parse_delimited_boolean};
pub use self::document::StructuredDocument;
pub use self::graph::CanonicalGraph;
pub use self::result_set::from_result_set_graph;
pub use self::standard::{StandardResults, parse_standard};

use crate::compare::Cardinality;
use crate::config::Tool;
use crate::engine::ResultFormat;
use crate::error::ResultsError;
use crate::index::TripleIndex;
use crate::process::{self, EnvOverlay, Invocation};
use crate::query::{QueryForm, QueryInfo};
use sparesults::QueryResultsFormat;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// The four kinds of results a query can be compared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Graph,
    Bindings,
    Boolean,
    Document,
}

impl Shape {
    /// The shape a test is compared on.
    pub fn select(
        query: QueryInfo,
        format: ResultFormat,
        expected: Option<&Path>,
        cardinality: Cardinality,
    ) -> Self {
        if query.form.returns_graph() {
            Self::Graph
        } else if query.form == QueryForm::Ask {
            Self::Boolean
        } else if format == ResultFormat::Srj
            && cardinality == Cardinality::Strict
            && expected.is_some_and(|p| p.extension().is_some_and(|e| e == "srj"))
        {
            Self::Document
        } else {
            Self::Bindings
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Graph => "graph",
            Self::Bindings => "bindings",
            Self::Boolean => "boolean",
            Self::Document => "structured document",
        })
    }
}

/// A query result in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Graph(CanonicalGraph),
    Bindings(Bindings),
    Boolean(bool),
    Document(StructuredDocument),
}

impl QueryResult {
    pub fn shape(&self) -> Shape {
        match self {
            Self::Graph(_) => Shape::Graph,
            Self::Bindings(_) => Shape::Bindings,
            Self::Boolean(_) => Shape::Boolean,
            Self::Document(_) => Shape::Document,
        }
    }

    fn from_standard(results: StandardResults, ordered: bool) -> Self {
        match results {
            StandardResults::Bindings(bindings) => Self::Bindings(bindings.with_order(ordered)),
            StandardResults::Boolean(value) => Self::Boolean(value),
        }
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph(graph) => {
                for line in graph.lines() {
                    writeln!(f, "{line}")?;
                }
                Ok(())
            }
            Self::Bindings(bindings) => {
                for line in bindings.canonical_lines(bindings.variables()) {
                    writeln!(f, "{line}")?;
                }
                Ok(())
            }
            Self::Boolean(value) => writeln!(f, "{value}"),
            Self::Document(document) => writeln!(f, "{document}"),
        }
    }
}

/// Formats of expected result files, guessed from their extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFileFormat {
    Xml,
    Json,
    Csv,
    Tsv,
    /// Anything else is an RDF document read through the converter.
    Rdf,
}

impl ResultFileFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("srx" | "xml") => Self::Xml,
            Some("srj" | "json") => Self::Json,
            Some("csv") => Self::Csv,
            Some("tsv") => Self::Tsv,
            _ => Self::Rdf,
        }
    }
}

/// Reads results, going through the RDF converter when a graph is involved.
pub struct ResultLoader<'a> {
    converter: &'a Tool,
    env: &'a EnvOverlay,
    timeout: Duration,
}

impl<'a> ResultLoader<'a> {
    pub fn new(converter: &'a Tool, env: &'a EnvOverlay, timeout: Duration) -> Self {
        Self {
            converter,
            env,
            timeout,
        }
    }

    /// Reads an expected result file.
    pub fn expected(
        &self,
        path: &Path,
        shape: Shape,
        ordered: bool,
    ) -> Result<QueryResult, ResultsError> {
        let format = ResultFileFormat::from_path(path);
        if format == ResultFileFormat::Rdf {
            let ntriples = self.convert(path)?;
            return if shape == Shape::Graph {
                Ok(QueryResult::Graph(CanonicalGraph::from_ntriples(&ntriples)?))
            } else {
                let index = TripleIndex::from_ntriples(path, &ntriples);
                Ok(QueryResult::from_standard(
                    from_result_set_graph(&index)?,
                    ordered,
                ))
            };
        }
        let content = fs::read(path)?;
        parse_text(&content, format, shape, ordered)
    }

    /// Reads what the engine printed for `format`.
    pub fn actual(
        &self,
        output: &str,
        format: ResultFormat,
        shape: Shape,
        ordered: bool,
    ) -> Result<QueryResult, ResultsError> {
        match format {
            ResultFormat::NTriples => Ok(QueryResult::Graph(CanonicalGraph::from_ntriples(
                output,
            )?)),
            ResultFormat::Turtle => {
                let mut file = tempfile::Builder::new()
                    .prefix("sparqlcheck-actual-")
                    .suffix(".ttl")
                    .tempfile()?;
                file.write_all(output.as_bytes())?;
                file.flush()?;
                let ntriples = self.convert(file.path())?;
                Ok(QueryResult::Graph(CanonicalGraph::from_ntriples(&ntriples)?))
            }
            ResultFormat::Simple => match shape {
                Shape::Boolean => Ok(QueryResult::Boolean(parse_debug_boolean(output)?)),
                Shape::Graph => Ok(QueryResult::Graph(CanonicalGraph::from_ntriples(output)?)),
                Shape::Bindings | Shape::Document => Ok(QueryResult::Bindings(
                    parse_debug_rows(output)?.with_order(ordered),
                )),
            },
            ResultFormat::Csv => parse_text(output.as_bytes(), ResultFileFormat::Csv, shape, ordered),
            ResultFormat::Tsv => parse_text(output.as_bytes(), ResultFileFormat::Tsv, shape, ordered),
            ResultFormat::Srj => {
                parse_text(output.as_bytes(), ResultFileFormat::Json, shape, ordered)
            }
            ResultFormat::Xml => parse_text(output.as_bytes(), ResultFileFormat::Xml, shape, ordered),
        }
    }

    fn convert(&self, path: &Path) -> Result<String, ResultsError> {
        let invocation: Invocation = self
            .converter
            .invocation()
            .arg(path)
            .env(self.env.clone())
            .timeout(self.timeout);
        let output = process::run(&invocation, None)
            .map_err(|e| ResultsError::msg(format!("can not convert {}: {e}", path.display())))?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(ResultsError::msg(format!(
                "{} failed on {} with exit code {}: {}",
                self.converter.program,
                path.display(),
                output.exit_code,
                output.stderr.trim()
            )))
        }
    }
}

/// Parses a result document that needs no converter.
///
/// A document with no content at all is an empty solution sequence.
pub fn parse_text(
    content: &[u8],
    format: ResultFileFormat,
    shape: Shape,
    ordered: bool,
) -> Result<QueryResult, ResultsError> {
    let is_blank = content.iter().all(u8::is_ascii_whitespace);
    if is_blank {
        match shape {
            Shape::Boolean => (),
            Shape::Document => return Ok(QueryResult::Document(StructuredDocument::empty()?)),
            Shape::Graph | Shape::Bindings => {
                return Ok(QueryResult::Bindings(Bindings::default().with_order(ordered)));
            }
        }
    }
    match format {
        ResultFileFormat::Csv => {
            let text = String::from_utf8_lossy(content);
            if shape == Shape::Boolean {
                Ok(QueryResult::Boolean(parse_delimited_boolean(&text)?))
            } else {
                Ok(QueryResult::Bindings(parse_csv(&text)?.with_order(ordered)))
            }
        }
        ResultFileFormat::Tsv if shape == Shape::Boolean => Ok(QueryResult::Boolean(
            parse_delimited_boolean(&String::from_utf8_lossy(content))?,
        )),
        ResultFileFormat::Tsv => Ok(QueryResult::from_standard(
            parse_standard(content, QueryResultsFormat::Tsv)?,
            ordered,
        )),
        ResultFileFormat::Json if shape == Shape::Document => Ok(QueryResult::Document(
            StructuredDocument::parse(content, ordered)?,
        )),
        ResultFileFormat::Json => Ok(QueryResult::from_standard(
            parse_standard(content, QueryResultsFormat::Json)?,
            ordered,
        )),
        ResultFileFormat::Xml => Ok(QueryResult::from_standard(
            parse_standard(content, QueryResultsFormat::Xml)?,
            ordered,
        )),
        ResultFileFormat::Rdf => Err(ResultsError::msg(
            "RDF result documents need to be converted first",
        )),
    }
}

/// Renames blank nodes to `b0`, `b1`... in the order they are first seen.
#[derive(Debug, Default)]
pub(crate) struct BlankNodeRenamer {
    labels: HashMap<String, String>,
}

impl BlankNodeRenamer {
    pub(crate) fn rename(&mut self, id: &str) -> String {
        let next = self.labels.len();
        self.labels
            .entry(id.to_owned())
            .or_insert_with(|| format!("b{next}"))
            .clone()
    }
}
