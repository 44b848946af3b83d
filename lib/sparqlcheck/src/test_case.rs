//! Test cases read from manifest entries.

use crate::compare::Cardinality;
use crate::index::TripleIndex;
use crate::kind::{Language, TestKind};
use crate::manifest::{ManifestEntry, resolve_path};
use crate::outcome::Expectation;
use crate::vocab::{dawgt, mf, qt, rdf, rdfs, sd, t, ut};
use oxrdf::{NamedNodeRef, Term};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

/// A fully resolved test, ready to be executed.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: String,
    /// The IRI identifying the test in reports.
    pub uri: String,
    pub kind: TestKind,
    pub query: Option<PathBuf>,
    pub execute: bool,
    pub expected: Expectation,
    pub language: Language,
    pub cardinality: Cardinality,
    pub approved: bool,
    pub withdrawn: bool,
    pub entailment_regime: Option<String>,
    pub result: Option<PathBuf>,
    pub data: Vec<PathBuf>,
    pub named_graphs: Vec<PathBuf>,
    pub extra_files: Vec<PathBuf>,
    pub comment: Option<String>,
    pub skip_reason: Option<String>,
}

impl TestCase {
    /// Reads the test described by `entry`.
    ///
    /// Returns `None`, after logging why, when the entry lacks something needed to run it.
    pub fn from_entry(entry: &ManifestEntry, run_entailment: bool) -> Option<Self> {
        TestCaseReader {
            index: &entry.index,
            manifest: entry.manifest_path(),
        }
        .read(&entry.id, run_entailment)
    }

    pub fn is_skipped(&self) -> bool {
        self.expected == Expectation::Skip
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)?;
        if let Some(query) = &self.query {
            write!(f, " on query {}", query.display())?;
        }
        for data in &self.data {
            write!(f, " with data {}", data.display())?;
        }
        for graph in &self.named_graphs {
            write!(f, " and graph data {}", graph.display())?;
        }
        if let Some(result) = &self.result {
            write!(f, " and expected result {}", result.display())?;
        }
        Ok(())
    }
}

struct TestCaseReader<'a> {
    index: &'a TripleIndex,
    manifest: &'a Path,
}

impl<'a> TestCaseReader<'a> {
    fn read(&self, id: &Term, run_entailment: bool) -> Option<TestCase> {
        let index = self.index;
        let name = match index.literal(id, mf::NAME) {
            Some(name) => name.to_owned(),
            None => match id {
                Term::NamedNode(node) => local_name(node.as_str()).to_owned(),
                _ => {
                    warn!(
                        manifest = %self.manifest.display(),
                        entry = %id,
                        "skipping entry without mf:name"
                    );
                    return None;
                }
            },
        };
        let uri = match id {
            Term::NamedNode(node) => node.as_str().to_owned(),
            _ => self.synthetic_uri(&name),
        };

        let kind = TestKind::from_types(index.objects(id, rdf::TYPE).filter_map(|ty| match ty {
            Term::NamedNode(ty) => Some(ty.as_ref()),
            _ => None,
        }));
        let behavior = kind.behavior();

        let action = index.object(id, mf::ACTION);
        let (query, data, named_graphs) = match action {
            Some(action @ (Term::NamedNode(_) | Term::Literal(_))) => {
                (self.path(action), Vec::new(), Vec::new())
            }
            Some(action @ Term::BlankNode(_)) => (
                index
                    .object(action, qt::QUERY)
                    .or_else(|| index.object(action, ut::REQUEST))
                    .and_then(|query| self.path(query)),
                self.paths(action, qt::DATA)
                    .chain(self.paths(action, ut::DATA))
                    .collect(),
                index
                    .objects(action, qt::GRAPH_DATA)
                    .chain(index.objects(action, ut::GRAPH_DATA))
                    .filter_map(|graph| match graph {
                        Term::BlankNode(_) => index
                            .object(graph, ut::GRAPH)
                            .and_then(|graph| self.path(graph)),
                        graph => self.path(graph),
                    })
                    .collect(),
            ),
            _ => (None, Vec::new(), Vec::new()),
        };

        let entailment_regime = action
            .and_then(|action| index.object(action, sd::ENTAILMENT_REGIME))
            .or_else(|| index.object(id, sd::ENTAILMENT_REGIME))
            .map(|regime| match regime {
                Term::NamedNode(node) => node.as_str().to_owned(),
                Term::Literal(literal) => literal.value().to_owned(),
                other => other.to_string(),
            });
        let approved = index.contains(id, dawgt::APPROVAL, &dawgt::APPROVED.into());
        let withdrawn = index.contains(id, dawgt::APPROVAL, &dawgt::WITHDRAWN.into());
        let rejected = index.contains(id, dawgt::APPROVAL, &dawgt::REJECTED.into());

        let skip_reason = if kind.should_skip() {
            Some(format!("{kind} tests are not supported"))
        } else if withdrawn {
            Some("withdrawn".to_owned())
        } else if rejected {
            Some("rejected".to_owned())
        } else if entailment_regime.is_some() && !run_entailment {
            Some("entailment regime tests are disabled".to_owned())
        } else {
            None
        };

        if skip_reason.is_none() && query.is_none() {
            warn!(
                manifest = %self.manifest.display(),
                test = %uri,
                "skipping test without a query file"
            );
            return None;
        }

        let cardinality = if index.contains(
            id,
            mf::RESULT_CARDINALITY,
            &mf::LAX_CARDINALITY.into(),
        ) {
            Cardinality::Lax
        } else {
            Cardinality::Strict
        };

        let (execute, expected) = if skip_reason.is_some() {
            (false, Expectation::Skip)
        } else {
            (behavior.execute, behavior.expected)
        };

        Some(TestCase {
            name,
            uri,
            query,
            execute,
            expected,
            language: behavior.language,
            cardinality,
            approved,
            withdrawn,
            entailment_regime,
            result: index.object(id, mf::RESULT).and_then(|r| self.path(r)),
            data,
            named_graphs,
            extra_files: self.paths(id, t::EXTRA_FILE).collect(),
            comment: index.literal(id, rdfs::COMMENT).map(ToOwned::to_owned),
            skip_reason,
            kind,
        })
    }

    fn path(&self, term: &Term) -> Option<PathBuf> {
        resolve_path(term, self.manifest)
    }

    fn paths(
        &self,
        subject: &Term,
        predicate: NamedNodeRef<'a>,
    ) -> impl Iterator<Item = PathBuf> + use<'a> {
        let manifest = self.manifest;
        self.index
            .objects(subject, predicate)
            .filter_map(move |object| resolve_path(object, manifest))
    }

    fn synthetic_uri(&self, name: &str) -> String {
        let manifest = self
            .manifest
            .canonicalize()
            .unwrap_or_else(|_| self.manifest.to_owned());
        match Url::from_file_path(&manifest) {
            Ok(mut url) => {
                url.set_fragment(Some(name));
                url.into()
            }
            Err(()) => format!("{}#{name}", manifest.display()),
        }
    }
}

fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}
