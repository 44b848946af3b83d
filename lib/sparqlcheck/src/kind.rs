//! Test kinds and the execution policy attached to each of them.

use crate::outcome::Expectation;
use crate::vocab::{mf, mfx, t};
use oxrdf::{NamedNode, NamedNodeRef};
use std::fmt;

/// The RDF type of a test entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TestKind {
    PositiveSyntax,
    PositiveSyntax11,
    NegativeSyntax,
    NegativeSyntax11,
    PositiveUpdateSyntax11,
    NegativeUpdateSyntax11,
    /// `mfx:TestBadSyntax`
    BadSyntax,
    /// `mfx:TestSyntax`
    Syntax,
    QueryEvaluation,
    CsvResultFormat,
    /// A test known to fail with the engine under test.
    XFail,
    /// A test that must make the engine emit warnings.
    Warning,
    UpdateEvaluation,
    Protocol,
    ServiceDescription,
    GraphStoreProtocol,
    Unknown(NamedNode),
}

const KNOWN: [(&str, &str, TestKind); 16] = [
    (mf::NAMESPACE, "PositiveSyntaxTest", TestKind::PositiveSyntax),
    (mf::NAMESPACE, "PositiveSyntaxTest11", TestKind::PositiveSyntax11),
    (mf::NAMESPACE, "NegativeSyntaxTest", TestKind::NegativeSyntax),
    (mf::NAMESPACE, "NegativeSyntaxTest11", TestKind::NegativeSyntax11),
    (mf::NAMESPACE, "PositiveUpdateSyntaxTest11", TestKind::PositiveUpdateSyntax11),
    (mf::NAMESPACE, "NegativeUpdateSyntaxTest11", TestKind::NegativeUpdateSyntax11),
    (mfx::NAMESPACE, "TestBadSyntax", TestKind::BadSyntax),
    (mfx::NAMESPACE, "TestSyntax", TestKind::Syntax),
    (mf::NAMESPACE, "QueryEvaluationTest", TestKind::QueryEvaluation),
    (mf::NAMESPACE, "CSVResultFormatTest", TestKind::CsvResultFormat),
    (t::NAMESPACE, "XFailTest", TestKind::XFail),
    (t::NAMESPACE, "WarningTest", TestKind::Warning),
    (mf::NAMESPACE, "UpdateEvaluationTest", TestKind::UpdateEvaluation),
    (mf::NAMESPACE, "ProtocolTest", TestKind::Protocol),
    (mf::NAMESPACE, "ServiceDescriptionTest", TestKind::ServiceDescription),
    (mf::NAMESPACE, "GraphStoreProtocolTest", TestKind::GraphStoreProtocol),
];

impl TestKind {
    pub fn from_iri(iri: NamedNodeRef<'_>) -> Self {
        let iri = iri.as_str();
        KNOWN
            .iter()
            .find(|(namespace, local, _)| iri.strip_prefix(*namespace) == Some(*local))
            .map_or_else(
                || Self::Unknown(NamedNode::new_unchecked(iri)),
                |(_, _, kind)| kind.clone(),
            )
    }

    /// Picks the kind of an entry from all its `rdf:type` values.
    ///
    /// The first known type wins. An entry without any type is a query evaluation test.
    pub fn from_types<'a>(types: impl IntoIterator<Item = NamedNodeRef<'a>>) -> Self {
        let mut first_unknown = None;
        for iri in types {
            match Self::from_iri(iri) {
                Self::Unknown(iri) => {
                    first_unknown.get_or_insert(iri);
                }
                kind => return kind,
            }
        }
        first_unknown.map_or(Self::QueryEvaluation, Self::Unknown)
    }

    pub fn iri(&self) -> NamedNode {
        match self {
            Self::Unknown(iri) => iri.clone(),
            kind => KNOWN
                .iter()
                .find(|(_, _, k)| k == kind)
                .map(|(namespace, local, _)| NamedNode::new_unchecked(format!("{namespace}{local}")))
                .unwrap_or_else(|| NamedNode::new_unchecked(format!("{}{kind:?}", t::NAMESPACE))),
        }
    }

    /// Kinds whose supporting infrastructure is absent: their tests are always skipped.
    pub fn should_skip(&self) -> bool {
        matches!(
            self,
            Self::UpdateEvaluation
                | Self::Protocol
                | Self::ServiceDescription
                | Self::GraphStoreProtocol
        )
    }

    pub fn is_syntax(&self) -> bool {
        matches!(
            self,
            Self::PositiveSyntax
                | Self::PositiveSyntax11
                | Self::NegativeSyntax
                | Self::NegativeSyntax11
                | Self::PositiveUpdateSyntax11
                | Self::NegativeUpdateSyntax11
                | Self::BadSyntax
                | Self::Syntax
        )
    }

    /// How a test of this kind is run.
    pub fn behavior(&self) -> Behavior {
        let (expected, language) = match self {
            Self::PositiveSyntax11 | Self::CsvResultFormat => (Expectation::Pass, Language::Sparql11),
            Self::NegativeSyntax | Self::BadSyntax => (Expectation::Fail, Language::Sparql),
            Self::NegativeSyntax11 => (Expectation::Fail, Language::Sparql11),
            Self::PositiveUpdateSyntax11 => (Expectation::Pass, Language::Sparql11Update),
            Self::NegativeUpdateSyntax11 => (Expectation::Fail, Language::Sparql11Update),
            Self::XFail => (Expectation::XFail, Language::Sparql),
            Self::UpdateEvaluation
            | Self::Protocol
            | Self::ServiceDescription
            | Self::GraphStoreProtocol => {
                return Behavior {
                    execute: false,
                    expected: Expectation::Skip,
                    language: Language::Sparql11,
                };
            }
            Self::PositiveSyntax
            | Self::Syntax
            | Self::QueryEvaluation
            | Self::Warning
            | Self::Unknown(_) => (Expectation::Pass, Language::Sparql),
        };
        Behavior {
            execute: true,
            expected,
            language,
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.iri())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Behavior {
    pub execute: bool,
    pub expected: Expectation,
    pub language: Language,
}

/// The query language variant passed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Sparql,
    Sparql11,
    Sparql11Update,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sparql => "sparql",
            Self::Sparql11 => "sparql11",
            Self::Sparql11Update => "sparql11-update",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guesses the kind of a test for plan generation.
///
/// A known kind is kept. Otherwise the suite name decides, and `fallback` is used
/// when it says nothing.
pub fn classify(kind: Option<&TestKind>, suite: &str, fallback: TestKind) -> TestKind {
    if let Some(kind) = kind.filter(|kind| !matches!(kind, TestKind::Unknown(_))) {
        return kind.clone();
    }
    let suite = suite.to_ascii_lowercase();
    if suite.contains("negative") || suite.contains("bad") {
        TestKind::NegativeSyntax
    } else if suite.contains("warning") {
        TestKind::Warning
    } else if suite.contains("syntax") {
        TestKind::PositiveSyntax
    } else if suite.contains("xfail") {
        TestKind::XFail
    } else {
        fallback
    }
}
