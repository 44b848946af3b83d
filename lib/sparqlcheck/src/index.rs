//! In-memory subject index over the N-Triples rendering of a manifest.

use crate::config::Tool;
use crate::error::HarnessError;
use crate::process::{self, EnvOverlay, RunError};
use oxrdf::{NamedNode, NamedNodeRef, Term};
use oxttl::NTriplesParser;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, trace};

/// Maps each subject to its (predicate, object) pairs, in document order.
///
/// The index only supports the lookups needed to walk manifests and result-set graphs.
#[derive(Debug, Default)]
pub struct TripleIndex {
    source: PathBuf,
    subjects: Vec<Term>,
    properties: HashMap<Term, Vec<(NamedNode, Term)>>,
    len: usize,
}

impl TripleIndex {
    /// Converts `path` to N-Triples with `converter` and indexes the output.
    pub fn parse(
        path: &Path,
        converter: &Tool,
        env: &EnvOverlay,
        timeout: Duration,
    ) -> Result<Self, HarnessError> {
        let invocation = converter
            .invocation()
            .arg(path)
            .env(env.clone())
            .timeout(timeout);
        let output = process::run(&invocation, None).map_err(|e| match e {
            RunError::ToolNotFound { program } => HarnessError::tool(program, "command not found"),
            RunError::Io { program, source } => HarnessError::tool(program, source.to_string()),
        })?;
        if !output.success() {
            return Err(HarnessError::tool(
                &converter.program,
                format!(
                    "exited with code {} on {}{}",
                    output.exit_code,
                    path.display(),
                    if output.stderr.trim().is_empty() {
                        String::new()
                    } else {
                        format!(": {}", output.stderr.trim())
                    }
                ),
            ));
        }
        let index = Self::from_ntriples(path, &output.stdout);
        debug!(path = %path.display(), triples = index.len(), "indexed manifest");
        Ok(index)
    }

    /// Indexes N-Triples text, dropping every line that is not a valid triple.
    pub fn from_ntriples(source: impl Into<PathBuf>, ntriples: &str) -> Self {
        let mut index = Self {
            source: source.into(),
            ..Self::default()
        };
        for line in ntriples.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match NTriplesParser::new()
                .lenient()
                .for_reader(line.as_bytes())
                .next()
            {
                Some(Ok(triple)) => {
                    index.insert(triple.subject.into(), triple.predicate, triple.object)
                }
                Some(Err(error)) => trace!(%error, line, "dropping malformed triple"),
                None => (),
            }
        }
        index
    }

    pub fn insert(&mut self, subject: Term, predicate: NamedNode, object: Term) {
        let properties = self.properties.entry(subject).or_insert_with_key(|subject| {
            self.subjects.push(subject.clone());
            Vec::new()
        });
        properties.push((predicate, object));
        self.len += 1;
    }

    /// The document the index was built from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Number of triples.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Subjects in first-seen order.
    pub fn subjects(&self) -> impl Iterator<Item = &Term> {
        self.subjects.iter()
    }

    pub fn properties(&self, subject: &Term) -> &[(NamedNode, Term)] {
        self.properties.get(subject).map_or(&[], Vec::as_slice)
    }

    pub fn objects<'a>(
        &'a self,
        subject: &Term,
        predicate: NamedNodeRef<'a>,
    ) -> impl Iterator<Item = &'a Term> + use<'a> {
        self.properties(subject)
            .iter()
            .filter(move |(p, _)| p.as_ref() == predicate)
            .map(|(_, o)| o)
    }

    pub fn object(&self, subject: &Term, predicate: NamedNodeRef<'_>) -> Option<&Term> {
        self.properties(subject)
            .iter()
            .find(|(p, _)| p.as_ref() == predicate)
            .map(|(_, o)| o)
    }

    /// Subjects having at least one value for `predicate`, in first-seen order.
    pub fn subjects_with<'a>(
        &'a self,
        predicate: NamedNodeRef<'a>,
    ) -> impl Iterator<Item = &'a Term> + use<'a> {
        self.subjects
            .iter()
            .filter(move |s| self.object(s, predicate).is_some())
    }

    pub fn contains(&self, subject: &Term, predicate: NamedNodeRef<'_>, object: &Term) -> bool {
        self.properties(subject)
            .iter()
            .any(|(p, o)| p.as_ref() == predicate && o == object)
    }

    /// The lexical value of a literal object, if any.
    pub fn literal(&self, subject: &Term, predicate: NamedNodeRef<'_>) -> Option<&str> {
        match self.object(subject, predicate)? {
            Term::Literal(literal) => Some(literal.value()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::rdf;
    use oxrdf::{BlankNode, Literal};

    const DOC: &str = r#"
<http://example.com/m> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/Manifest> .
# a comment
<http://example.com/m> <http://example.com/name> "manifest"@en .
this is not a triple
_:b0 <http://example.com/p> <http://example.com/o> .
<http://example.com/m> <http://example.com/name> "second" .
"#;

    #[test]
    fn malformed_lines_are_dropped() {
        let index = TripleIndex::from_ntriples("m.nt", DOC);
        assert_eq!(index.len(), 4);
        assert_eq!(index.subjects().count(), 2);
    }

    #[test]
    fn properties_keep_document_order() {
        let index = TripleIndex::from_ntriples("m.nt", DOC);
        let m = Term::from(NamedNode::new_unchecked("http://example.com/m"));
        let name = NamedNodeRef::new_unchecked("http://example.com/name");
        let names = index.objects(&m, name).collect::<Vec<_>>();
        assert_eq!(
            names,
            [
                &Term::from(Literal::new_language_tagged_literal_unchecked("manifest", "en")),
                &Term::from(Literal::new_simple_literal("second")),
            ]
        );
        assert_eq!(index.literal(&m, name), Some("manifest"));
        assert!(index.object(&m, rdf::FIRST).is_none());
    }

    #[test]
    fn blank_node_subjects_are_kept() {
        let index = TripleIndex::from_ntriples("m.nt", DOC);
        let b0 = Term::from(BlankNode::new_unchecked("b0"));
        assert_eq!(index.properties(&b0).len(), 1);
        let p = NamedNodeRef::new_unchecked("http://example.com/p");
        assert_eq!(index.subjects_with(p).collect::<Vec<_>>(), [&b0]);
    }
}
