//! Manifest traversal: RDF lists of entries and nested manifest inclusion.

use crate::config::Tool;
use crate::error::HarnessError;
use crate::index::TripleIndex;
use crate::process::EnvOverlay;
use crate::vocab::{mf, rdf};
use oxrdf::Term;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// A test entry together with the manifest it was declared in.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub id: Term,
    pub index: Arc<TripleIndex>,
}

impl ManifestEntry {
    pub fn manifest_path(&self) -> &Path {
        self.index.source()
    }
}

/// The node carrying the manifest-level properties.
///
/// A subject with `mf:entries` wins over one with `mf:include`.
pub fn primary_node(index: &TripleIndex) -> Result<&Term, HarnessError> {
    index
        .subjects_with(mf::ENTRIES)
        .next()
        .or_else(|| index.subjects_with(mf::INCLUDE).next())
        .ok_or_else(|| HarnessError::Manifest {
            path: index.source().to_owned(),
        })
}

/// The entries of a single manifest, without following inclusions.
pub fn find_entries(index: &TripleIndex) -> Result<Vec<Term>, HarnessError> {
    let primary = primary_node(index)?;
    match index.object(primary, mf::ENTRIES) {
        Some(head) => walk_list(index, head),
        None => Ok(Vec::new()),
    }
}

/// Collects the items of the RDF list starting at `head`.
///
/// A list must reach `rdf:nil`: a cell without `rdf:rest`, a literal `rdf:rest`
/// or a cell seen twice is rejected instead of looping.
/// Cells without `rdf:first` are skipped.
pub fn walk_list(index: &TripleIndex, head: &Term) -> Result<Vec<Term>, HarnessError> {
    let unterminated = || HarnessError::UnterminatedList {
        path: index.source().to_owned(),
        head: head.to_string(),
    };
    let nil = Term::from(rdf::NIL);
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    let mut current = head;
    while *current != nil {
        if matches!(current, Term::Literal(_)) || !seen.insert(current) {
            return Err(unterminated());
        }
        match index.object(current, rdf::FIRST) {
            Some(item) => items.push(item.clone()),
            None => warn!(
                manifest = %index.source().display(),
                cell = %current,
                "list cell without rdf:first"
            ),
        }
        current = index.object(current, rdf::REST).ok_or_else(unterminated)?;
    }
    Ok(items)
}

/// Loads manifests and resolves their inclusions.
pub struct ManifestLoader<'a> {
    converter: &'a Tool,
    env: EnvOverlay,
    timeout: Duration,
    stack: HashSet<PathBuf>,
}

impl<'a> ManifestLoader<'a> {
    pub fn new(converter: &'a Tool, env: EnvOverlay, timeout: Duration) -> Self {
        Self {
            converter,
            env,
            timeout,
            stack: HashSet::new(),
        }
    }

    /// All entries reachable from the manifest at `path`.
    ///
    /// Entries of included manifests come first, in inclusion order,
    /// followed by the manifest's own entries.
    pub fn load(&mut self, path: &Path) -> Result<Vec<ManifestEntry>, HarnessError> {
        let index = TripleIndex::parse(path, self.converter, &self.env, self.timeout)?;
        self.load_index(Arc::new(index))
    }

    /// Same as [`load`](Self::load) for an already parsed manifest.
    pub fn load_index(
        &mut self,
        index: Arc<TripleIndex>,
    ) -> Result<Vec<ManifestEntry>, HarnessError> {
        let path = canonical(index.source());
        if !self.stack.insert(path.clone()) {
            return Err(HarnessError::ManifestCycle { path });
        }
        let result = self.resolve(&index);
        self.stack.remove(&path);
        result
    }

    fn resolve(&mut self, index: &Arc<TripleIndex>) -> Result<Vec<ManifestEntry>, HarnessError> {
        let primary = primary_node(index)?;
        let mut entries = Vec::new();

        let includes = index
            .subjects_with(mf::INCLUDE)
            .map(|subject| {
                index
                    .objects(subject, mf::INCLUDE)
                    .map(|head| walk_list(index, head))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        for included in includes.into_iter().flatten().flatten() {
            let Some(included_path) = resolve_path(&included, index.source()) else {
                warn!(
                    manifest = %index.source().display(),
                    include = %included,
                    "skipping include that is not a file"
                );
                continue;
            };
            debug!(
                manifest = %index.source().display(),
                include = %included_path.display(),
                "following include"
            );
            entries.extend(self.load(&included_path)?);
        }

        if let Some(head) = index.object(primary, mf::ENTRIES) {
            entries.extend(walk_list(index, head)?.into_iter().map(|id| ManifestEntry {
                id,
                index: Arc::clone(index),
            }));
        }
        Ok(entries)
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_owned())
}

/// Maps a term naming a file to a local path.
///
/// `file:` IRIs are converted directly, other IRIs are looked up by their last
/// path segment next to `manifest`, and literals are taken as relative paths.
pub fn resolve_path(term: &Term, manifest: &Path) -> Option<PathBuf> {
    let base = manifest.parent().unwrap_or(Path::new(""));
    match term {
        Term::NamedNode(node) => {
            let url = Url::parse(node.as_str()).ok()?;
            if url.scheme() == "file" {
                url.to_file_path().ok()
            } else {
                let name = url.path_segments()?.last()?;
                (!name.is_empty()).then(|| base.join(name))
            }
        }
        Term::Literal(literal) => {
            let value = literal.value();
            (!value.is_empty()).then(|| base.join(value))
        }
        _ => None,
    }
}
