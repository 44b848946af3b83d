//! RDF graphs with canonically relabeled blank nodes.

use super::BlankNodeRenamer;
use crate::error::ResultsError;
use oxrdf::Term;
use oxttl::NTriplesParser;

/// A graph as sorted, deduplicated N-Triples lines with canonical blank node labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalGraph {
    lines: Vec<String>,
}

impl CanonicalGraph {
    /// Blank nodes are renamed `_:b0`, `_:b1`... in the order they first appear in `ntriples`.
    pub fn from_ntriples(ntriples: &str) -> Result<Self, ResultsError> {
        let mut renamer = BlankNodeRenamer::default();
        let mut lines = Vec::new();
        for (number, line) in ntriples.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let triple = NTriplesParser::new()
                .for_reader(line.as_bytes())
                .next()
                .ok_or_else(|| ResultsError::msg(format!("line {}: no triple", number + 1)))?
                .map_err(|e| ResultsError::msg(format!("line {}: {e}", number + 1)))?;
            let mut render = |term: Term| match term {
                Term::BlankNode(node) => format!("_:{}", renamer.rename(node.as_str())),
                term => term.to_string(),
            };
            let subject = render(triple.subject.into());
            let object = render(triple.object);
            lines.push(format!("{subject} {} {object} .", triple.predicate));
        }
        lines.sort();
        lines.dedup();
        Ok(Self { lines })
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of distinct triples.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
