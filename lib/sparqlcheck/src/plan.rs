//! Generation of plan documents from a directory of query files.

use crate::error::HarnessError;
use crate::kind::{TestKind, classify};
use crate::vocab::{mf, qt, rdf, rdfs, t};
use oxrdf::{BlankNode, Literal, NamedNode, Term, Triple};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

const QUERY_EXTENSIONS: [&str; 2] = ["rq", "ru"];
const RESULT_EXTENSIONS: [&str; 6] = ["srx", "srj", "csv", "tsv", "ttl", "nt"];

/// Builds a manifest listing every query file of a directory.
///
/// The document is written in N-Triples, which is also valid Turtle, so it can be
/// read back by any converter, including one that copies its input.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    suite: String,
    kind: Option<TestKind>,
    fallback: TestKind,
    description: Option<String>,
    path: Option<String>,
    data: Vec<PathBuf>,
}

impl PlanBuilder {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            kind: None,
            fallback: TestKind::QueryEvaluation,
            description: None,
            path: None,
            data: Vec::new(),
        }
    }

    /// Forces the kind of every test instead of guessing it from the suite name.
    #[must_use]
    pub fn with_kind(mut self, kind: TestKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// The kind used when the suite name says nothing.
    #[must_use]
    pub fn with_fallback(mut self, fallback: TestKind) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Directory, relative to the suite, put first on `PATH` while the suite runs.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Adds a default graph file to every evaluation test.
    #[must_use]
    pub fn with_data(mut self, data: impl Into<PathBuf>) -> Self {
        self.data.push(data.into());
        self
    }

    pub fn kind(&self) -> TestKind {
        classify(self.kind.as_ref(), &self.suite, self.fallback.clone())
    }

    /// The plan of the query files found directly in `directory`, sorted by name.
    pub fn build(&self, directory: &Path) -> Result<String, HarnessError> {
        let directory = directory.canonicalize()?;
        let base = Url::from_directory_path(&directory)
            .map_err(|()| HarnessError::Manifest {
                path: directory.clone(),
            })?
            .join("manifest#")
            .map_err(|_| HarnessError::Manifest {
                path: directory.clone(),
            })?;
        let mut queries = fs::read_dir(&directory)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        queries.retain(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| QUERY_EXTENSIONS.contains(&e))
        });
        queries.sort();

        let kind = self.kind();
        let manifest = NamedNode::new_unchecked(base.as_str().trim_end_matches('#'));
        let mut triples = vec![Triple::new(
            manifest.clone(),
            rdf::TYPE,
            mf::MANIFEST.into_owned(),
        )];
        if let Some(description) = &self.description {
            triples.push(Triple::new(
                manifest.clone(),
                rdfs::COMMENT,
                Literal::new_simple_literal(description),
            ));
        }
        if let Some(path) = &self.path {
            triples.push(Triple::new(
                manifest.clone(),
                t::PATH,
                Literal::new_simple_literal(path),
            ));
        }

        let mut entries = Vec::new();
        for query in &queries {
            let Some(name) = query.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(id) = NamedNode::new(format!("{base}{name}")) else {
                warn!(
                    query = %query.display(),
                    "skipping query whose name is not a valid IRI fragment"
                );
                continue;
            };
            let Some(action) = file_iri(query) else {
                continue;
            };
            triples.push(Triple::new(id.clone(), rdf::TYPE, kind.iri()));
            triples.push(Triple::new(
                id.clone(),
                mf::NAME,
                Literal::new_simple_literal(name),
            ));
            if kind.is_syntax() || kind == TestKind::Warning {
                triples.push(Triple::new(id.clone(), mf::ACTION, action));
            } else {
                let action_node = BlankNode::default();
                triples.push(Triple::new(id.clone(), mf::ACTION, action_node.clone()));
                triples.push(Triple::new(action_node.clone(), qt::QUERY, action));
                for data in &self.data {
                    let data = directory.join(data);
                    if let Some(data) = file_iri(&data) {
                        triples.push(Triple::new(action_node.clone(), qt::DATA, data));
                    }
                }
                if let Some(result) = RESULT_EXTENSIONS
                    .iter()
                    .map(|extension| query.with_extension(extension))
                    .find(|candidate| candidate.is_file())
                    .and_then(|result| file_iri(&result))
                {
                    triples.push(Triple::new(id.clone(), mf::RESULT, result));
                }
            }
            entries.push(id);
        }

        let mut head = Term::from(rdf::NIL.into_owned());
        for entry in entries.into_iter().rev() {
            let cell = BlankNode::default();
            triples.push(Triple::new(cell.clone(), rdf::FIRST, entry));
            triples.push(Triple::new(cell.clone(), rdf::REST, head));
            head = cell.into();
        }
        triples.insert(1, Triple::new(manifest, mf::ENTRIES, head));

        Ok(triples
            .iter()
            .map(|triple| format!("{triple} .\n"))
            .collect())
    }
}

fn file_iri(path: &Path) -> Option<NamedNode> {
    let url = Url::from_file_path(path).ok()?;
    NamedNode::new(url.as_str()).ok()
}
