#![cfg(unix)]

use anyhow::Result;
use sparqlcheck::{
    BuildTool, HarnessConfig, HarnessError, Outcome, PlanBuilder, ResultFormat, RunCoordinator,
    Signal, Suite, SuiteRunner, SuiteStatus, Target, Tool,
};
use std::fmt::Write as _;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;
use url::Url;

const MF: &str = "http://www.w3.org/2001/sw/DataAccess/tests/test-manifest#";
const QT: &str = "http://www.w3.org/2001/sw/DataAccess/tests/test-query#";
const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const T: &str = "http://ns.librdf.org/2009/test-manifest#";

/// Prints `NAME.out` and exits with the code in `NAME.exit` for a query `NAME.rq`.
/// A `NAME.crash` file makes it kill itself with SIGSEGV.
const ENGINE: &str = r#"#!/bin/sh
for last; do :; done
query="${last#file://}"
base="${query%.*}"
if [ -f "$base.crash" ]; then kill -SEGV $$; fi
if [ -f "$base.out" ]; then cat "$base.out"; fi
if [ -f "$base.exit" ]; then exit "$(cat "$base.exit")"; fi
exit 0
"#;

struct Entry<'a> {
    name: &'a str,
    kind: String,
    query: &'a str,
    result: Option<&'a str>,
    lax: bool,
}

impl<'a> Entry<'a> {
    fn new(name: &'a str, kind: &str, query: &'a str) -> Self {
        Self {
            name,
            kind: format!("{MF}{kind}"),
            query,
            result: None,
            lax: false,
        }
    }

    fn xfail(name: &'a str, query: &'a str) -> Self {
        Self {
            kind: format!("{T}XFailTest"),
            ..Self::new(name, "", query)
        }
    }

    fn with_result(mut self, result: &'a str) -> Self {
        self.result = Some(result);
        self
    }

    fn lax(mut self) -> Self {
        self.lax = true;
        self
    }
}

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn iri(&self, name: &str) -> String {
        Url::from_file_path(self.path(name))
            .map(String::from)
            .unwrap_or_default()
    }

    fn file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    fn script(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.file(name, content)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    /// Manifests are written in N-Triples so that `cat` can be the converter.
    fn config(&self) -> Result<HarnessConfig> {
        let mut config = HarnessConfig {
            converter: Tool::new("cat"),
            ..HarnessConfig::default()
        };
        config.engine.tool = Tool::new(self.script("engine.sh", ENGINE)?.to_string_lossy());
        Ok(config)
    }

    fn manifest(&self, file: &str, entries: &[Entry<'_>], includes: &[&str]) -> Result<PathBuf> {
        let manifest = self.iri(file);
        let mut nt = format!("<{manifest}> <{RDF}type> <{MF}Manifest> .\n");
        if !includes.is_empty() {
            nt += &list(
                &manifest,
                &format!("{MF}include"),
                "i",
                includes.iter().map(|i| format!("<{}>", self.iri(i))),
            );
        }
        if !entries.is_empty() {
            nt += &list(
                &manifest,
                &format!("{MF}entries"),
                "e",
                entries.iter().map(|e| format!("<{manifest}#{}>", e.name)),
            );
        }
        for (i, entry) in entries.iter().enumerate() {
            let id = format!("<{manifest}#{}>", entry.name);
            writeln!(nt, "{id} <{RDF}type> <{}> .", entry.kind)?;
            writeln!(nt, "{id} <{MF}name> \"{}\" .", entry.name)?;
            writeln!(nt, "{id} <{MF}action> _:a{i} .")?;
            writeln!(nt, "_:a{i} <{QT}query> <{}> .", self.iri(entry.query))?;
            if let Some(result) = entry.result {
                writeln!(nt, "{id} <{MF}result> <{}> .", self.iri(result))?;
            }
            if entry.lax {
                writeln!(nt, "{id} <{MF}resultCardinality> <{MF}LaxCardinality> .")?;
            }
        }
        self.file(file, &nt)
    }
}

fn list(subject: &str, predicate: &str, prefix: &str, items: impl Iterator<Item = String>) -> String {
    let items = items.collect::<Vec<_>>();
    let mut nt = format!("<{subject}> <{predicate}> _:{prefix}0 .\n");
    for (i, item) in items.iter().enumerate() {
        nt += &format!("_:{prefix}{i} <{RDF}first> {item} .\n");
        if i + 1 == items.len() {
            nt += &format!("_:{prefix}{i} <{RDF}rest> <{RDF}nil> .\n");
        } else {
            nt += &format!("_:{prefix}{i} <{RDF}rest> _:{prefix}{} .\n", i + 1);
        }
    }
    nt
}

fn srx_literals(values: &[&str]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\"?>\n<sparql xmlns=\"http://www.w3.org/2005/sparql-results#\">\n<head><variable name=\"x\"/></head>\n<results>\n",
    );
    for value in values {
        xml += &format!("<result><binding name=\"x\"><literal>{value}</literal></binding></result>\n");
    }
    xml + "</results>\n</sparql>\n"
}

fn debug_rows(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("row: [x=string(\"{v}\")]\n"))
        .collect()
}

fn outcomes(suite: &Suite, config: &HarnessConfig) -> (Vec<Outcome>, SuiteStatus) {
    let report = SuiteRunner::new(config, None).run(suite);
    (
        report.records.iter().map(|r| r.outcome).collect(),
        report.status(),
    )
}

#[test]
fn syntax_tests_end_to_end() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config()?;
    fixture.file("good.rq", "SELECT * WHERE { ?s ?p ?o }")?;
    fixture.file("bad.rq", "SELECT * WHERE {")?;
    fixture.file("bad.exit", "1")?;
    fixture.file("broken.rq", "SELECT * WHERE { FILTER(?x) }")?;
    fixture.file("broken.exit", "1")?;
    let manifest = fixture.manifest(
        "manifest.nt",
        &[
            Entry::new("good", "PositiveSyntaxTest11", "good.rq"),
            Entry::new("bad", "NegativeSyntaxTest11", "bad.rq"),
            Entry::xfail("broken", "broken.rq"),
        ],
        &[],
    )?;

    let suite = Suite::from_manifest("syntax", &manifest, &config)?;
    assert_eq!(
        outcomes(&suite, &config),
        (
            vec![Outcome::Passed, Outcome::XFailed, Outcome::XFailed],
            SuiteStatus::Pass
        )
    );

    let summary = RunCoordinator::new(&config, None).run(&[Target::Manifest(manifest)]);
    assert_eq!(summary.totals.passed, 1);
    assert_eq!(summary.totals.xfailed, 2);
    assert_eq!(summary.exit_code(), 0);
    Ok(())
}

#[test]
fn unexpected_passes_fail_the_suite() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config()?;
    fixture.file("accepted.rq", "SELECT * WHERE {")?;
    let manifest = fixture.manifest(
        "manifest.nt",
        &[Entry::new("accepted", "NegativeSyntaxTest", "accepted.rq")],
        &[],
    )?;
    let suite = Suite::from_manifest("syntax", &manifest, &config)?;
    assert_eq!(
        outcomes(&suite, &config),
        (vec![Outcome::UxPassed], SuiteStatus::Fail)
    );
    let summary = RunCoordinator::new(&config, None).run(&[Target::Manifest(manifest)]);
    assert_eq!(summary.exit_code(), 1);
    Ok(())
}

#[test]
fn evaluation_results_are_compared() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config()?;
    fixture.file("same.rq", "SELECT ?x WHERE { ?x ?p ?o }")?;
    fixture.file("same.out", &debug_rows(&["b", "a"]))?;
    fixture.file("same.srx", &srx_literals(&["a", "b"]))?;
    fixture.file("other.rq", "SELECT ?x WHERE { ?x ?p ?o }")?;
    fixture.file("other.out", &debug_rows(&["a", "c"]))?;
    fixture.file("other.srx", &srx_literals(&["a", "b"]))?;
    fixture.file("ordered.rq", "SELECT ?x WHERE { ?x ?p ?o } ORDER BY DESC(?x)")?;
    fixture.file("ordered.out", &debug_rows(&["a", "b"]))?;
    fixture.file("ordered.srx", &srx_literals(&["b", "a"]))?;
    fixture.file("missing.rq", "SELECT ?x WHERE { ?x ?p ?o }")?;
    let manifest = fixture.manifest(
        "manifest.nt",
        &[
            Entry::new("same", "QueryEvaluationTest", "same.rq").with_result("same.srx"),
            Entry::new("other", "QueryEvaluationTest", "other.rq").with_result("other.srx"),
            Entry::new("ordered", "QueryEvaluationTest", "ordered.rq").with_result("ordered.srx"),
            Entry::new("missing", "QueryEvaluationTest", "missing.rq").with_result("missing.srx"),
        ],
        &[],
    )?;
    let suite = Suite::from_manifest("evaluation", &manifest, &config)?;
    let report = SuiteRunner::new(&config, None).run(&suite);
    let outcomes = report.records.iter().map(|r| r.outcome).collect::<Vec<_>>();
    assert_eq!(
        outcomes,
        [
            Outcome::Passed,
            Outcome::Failed,
            Outcome::Failed,
            Outcome::Failed
        ]
    );
    assert!(report.records[1].detail.starts_with("--- expected\n+++ actual\n"));
    assert!(report.records[1].detail.contains("+[x=\"c\"]"));
    assert!(report.records[3].detail.contains("does not exist"));
    Ok(())
}

#[test]
fn lax_cardinality_allows_fewer_solutions() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config()?;
    fixture.file("expected.srx", &srx_literals(&["1", "2", "3", "4", "5"]))?;
    fixture.file("fewer.rq", "SELECT ?x WHERE { ?x ?p ?o }")?;
    fixture.file("fewer.out", &debug_rows(&["1", "2", "3"]))?;
    fixture.file("more.rq", "SELECT ?x WHERE { ?x ?p ?o }")?;
    fixture.file("more.out", &debug_rows(&["1", "2", "3", "4", "5", "6"]))?;
    fixture.file("strict.rq", "SELECT ?x WHERE { ?x ?p ?o }")?;
    fixture.file("strict.out", &debug_rows(&["1", "2", "3"]))?;
    let manifest = fixture.manifest(
        "manifest.nt",
        &[
            Entry::new("fewer", "QueryEvaluationTest", "fewer.rq")
                .with_result("expected.srx")
                .lax(),
            Entry::new("more", "QueryEvaluationTest", "more.rq")
                .with_result("expected.srx")
                .lax(),
            Entry::new("strict", "QueryEvaluationTest", "strict.rq").with_result("expected.srx"),
        ],
        &[],
    )?;
    let suite = Suite::from_manifest("lax", &manifest, &config)?;
    assert_eq!(
        outcomes(&suite, &config).0,
        [Outcome::Passed, Outcome::Failed, Outcome::Failed]
    );
    Ok(())
}

#[test]
fn graphs_and_booleans() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config()?;
    fixture.file("graph.rq", "CONSTRUCT { ?s ?p ?o } WHERE { ?s ?p ?o }")?;
    fixture.file(
        "graph.out",
        "_:x <http://example.com/p> \"v\" .\n<http://example.com/s> <http://example.com/p> _:x .\n",
    )?;
    fixture.file(
        "graph.nt",
        "<http://example.com/s> <http://example.com/p> _:node .\n_:node <http://example.com/p> \"v\" .\n",
    )?;
    fixture.file("ask.rq", "ASK { ?s ?p ?o }")?;
    fixture.file("ask.out", "roqet: Query has a boolean result: true\n")?;
    fixture.file(
        "ask.srx",
        "<?xml version=\"1.0\"?>\n<sparql xmlns=\"http://www.w3.org/2005/sparql-results#\"><head/><boolean>true</boolean></sparql>\n",
    )?;
    let manifest = fixture.manifest(
        "manifest.nt",
        &[
            Entry::new("graph", "QueryEvaluationTest", "graph.rq").with_result("graph.nt"),
            Entry::new("ask", "QueryEvaluationTest", "ask.rq").with_result("ask.srx"),
        ],
        &[],
    )?;
    let suite = Suite::from_manifest("shapes", &manifest, &config)?;
    assert_eq!(
        outcomes(&suite, &config),
        (vec![Outcome::Passed, Outcome::Passed], SuiteStatus::Pass)
    );
    Ok(())
}

#[test]
fn crashes_are_failures() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config()?;
    fixture.file("crash.rq", "SELECT * WHERE {")?;
    fixture.file("crash.crash", "")?;
    let manifest = fixture.manifest(
        "manifest.nt",
        &[Entry::new("crash", "NegativeSyntaxTest", "crash.rq")],
        &[],
    )?;
    let suite = Suite::from_manifest("crash", &manifest, &config)?;
    let report = SuiteRunner::new(&config, None).run(&suite);
    let record = &report.records[0];
    assert_eq!(record.outcome, Outcome::Failed);
    assert_eq!(record.signal, Some(Signal(11)));
    assert!(record.is_crash());
    assert!(record.detail.contains("SIGSEGV"));
    assert_eq!(report.status(), SuiteStatus::Fail);
    Ok(())
}

#[test]
fn shell_reported_signals_are_crashes() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config()?;
    fixture.file("segv.rq", "SELECT * WHERE {")?;
    fixture.file("segv.exit", "139")?;
    fixture.file("usage.rq", "SELECT * WHERE {")?;
    fixture.file("usage.exit", "2")?;
    let manifest = fixture.manifest(
        "manifest.nt",
        &[
            Entry::new("segv", "NegativeSyntaxTest", "segv.rq"),
            Entry::new("usage", "NegativeSyntaxTest", "usage.rq"),
        ],
        &[],
    )?;
    let suite = Suite::from_manifest("crash", &manifest, &config)?;
    let report = SuiteRunner::new(&config, None).run(&suite);
    let segv = &report.records[0];
    assert_eq!(segv.outcome, Outcome::Failed);
    assert_eq!(segv.exit_code, Some(139));
    assert_eq!(segv.signal, Some(Signal(11)));
    assert!(segv.is_crash());
    assert!(segv.detail.contains("SIGSEGV"), "{}", segv.detail);
    let usage = &report.records[1];
    assert_eq!(usage.outcome, Outcome::XFailed);
    assert_eq!(usage.signal, None);
    assert_eq!(report.crashes().count(), 1);
    Ok(())
}

#[test]
fn structured_json_documents_are_compared() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut config = fixture.config()?;
    config.result_format = ResultFormat::Srj;
    let query = "SELECT ?x WHERE { ?x ?p ?o }";
    fixture.file(
        "expected.srj",
        r#"{"head":{"vars":["x"]},"results":{"bindings":[
            {"x":{"datatype":"http://www.w3.org/2001/XMLSchema#integer","type":"literal","value":"1"}},
            {"x":{"type":"bnode","value":"r0"}}
        ]}}"#,
    )?;
    fixture.file(
        "empty.srj",
        r#"{"head":{"vars":["x"]},"results":{"bindings":[]}}"#,
    )?;
    fixture.file("same.rq", query)?;
    fixture.file(
        "same.out",
        r#"{"head":{"vars":["x"],"link":["http://example.com/about"]},"results":{"bindings":[
            {"x":{"type":"bnode","value":"n42"}},
            {"x":{"datatype":"http://www.w3.org/2001/XMLSchema#integer","type":"typed-literal","value":"1"}}
        ]}}"#,
    )?;
    fixture.file("extra.rq", query)?;
    fixture.file(
        "extra.out",
        r#"{"head":{"vars":["x"]},"results":{"bindings":[
            {"x":{"datatype":"http://www.w3.org/2001/XMLSchema#integer","type":"literal","value":"1"}},
            {"x":{"type":"bnode","value":"r0"}},
            {"x":{"type":"uri","value":"http://example.com/"}}
        ]}}"#,
    )?;
    fixture.file("silent.rq", query)?;
    fixture.file("declared.rq", query)?;
    fixture.file(
        "declared.out",
        r#"{"head":{"vars":["x"]},"results":{"bindings":[]}}"#,
    )?;
    fixture.file("missed.rq", query)?;
    let manifest = fixture.manifest(
        "manifest.nt",
        &[
            Entry::new("same", "QueryEvaluationTest", "same.rq").with_result("expected.srj"),
            Entry::new("extra", "QueryEvaluationTest", "extra.rq").with_result("expected.srj"),
            Entry::new("silent", "QueryEvaluationTest", "silent.rq").with_result("empty.srj"),
            Entry::new("declared", "QueryEvaluationTest", "declared.rq").with_result("empty.srj"),
            Entry::new("missed", "QueryEvaluationTest", "missed.rq").with_result("expected.srj"),
        ],
        &[],
    )?;
    let suite = Suite::from_manifest("srj", &manifest, &config)?;
    let report = SuiteRunner::new(&config, None).run(&suite);
    let outcomes = report.records.iter().map(|r| r.outcome).collect::<Vec<_>>();
    assert_eq!(
        outcomes,
        [
            Outcome::Passed,
            Outcome::Failed,
            Outcome::Passed,
            Outcome::Passed,
            Outcome::Failed
        ]
    );
    assert!(report.records[1].detail.contains("http://example.com/"));
    Ok(())
}

#[test]
fn delimited_engine_output_is_compared() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config()?;
    let query = "SELECT ?x WHERE { ?x ?p ?o }";
    fixture.file("expected.srx", &srx_literals(&["a", "b"]))?;
    fixture.file("csv.rq", query)?;
    fixture.file("csv.out", "x\r\nb\r\na\r\n")?;
    fixture.file("csv-other.rq", query)?;
    fixture.file("csv-other.out", "x\r\na\r\nc\r\n")?;
    fixture.file("expected.csv", "x\na\nhttp://example.com/\n")?;
    fixture.file("csv-file.rq", query)?;
    fixture.file("csv-file.out", "x\r\nhttp://example.com/\r\na\r\n")?;
    fixture.file("expected.tsv", "?x\n\"a\"\n<http://example.com/>\n")?;
    fixture.file("tsv.rq", query)?;
    fixture.file("tsv.out", "?x\n<http://example.com/>\n\"a\"\n")?;
    fixture.file("tsv-other.rq", query)?;
    fixture.file("tsv-other.out", "?x\n\"a\"\n\"http://example.com/\"\n")?;
    let manifest = fixture.manifest(
        "manifest.nt",
        &[
            Entry::new("csv", "CSVResultFormatTest", "csv.rq").with_result("expected.srx"),
            Entry::new("csv-other", "CSVResultFormatTest", "csv-other.rq")
                .with_result("expected.srx"),
            Entry::new("csv-file", "QueryEvaluationTest", "csv-file.rq")
                .with_result("expected.csv"),
            Entry::new("tsv", "QueryEvaluationTest", "tsv.rq").with_result("expected.tsv"),
            Entry::new("tsv-other", "QueryEvaluationTest", "tsv-other.rq")
                .with_result("expected.tsv"),
        ],
        &[],
    )?;
    let suite = Suite::from_manifest("delimited", &manifest, &config)?;
    let report = SuiteRunner::new(&config, None).run(&suite);
    let outcomes = report.records.iter().map(|r| r.outcome).collect::<Vec<_>>();
    assert_eq!(
        outcomes,
        [
            Outcome::Passed,
            Outcome::Failed,
            Outcome::Passed,
            Outcome::Passed,
            Outcome::Failed
        ]
    );
    assert!(report.records[1].detail.contains("\"c\""), "{}", report.records[1].detail);
    Ok(())
}

#[test]
fn included_entries_come_first() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config()?;
    fixture.file("outer.rq", "ASK {}")?;
    fixture.file("inner.rq", "ASK {}")?;
    fixture.manifest(
        "inner.nt",
        &[Entry::new("inner", "PositiveSyntaxTest", "inner.rq")],
        &[],
    )?;
    let manifest = fixture.manifest(
        "outer.nt",
        &[Entry::new("outer", "PositiveSyntaxTest", "outer.rq")],
        &["inner.nt"],
    )?;
    let suite = Suite::from_manifest("nested", &manifest, &config)?;
    let names = suite.tests.iter().map(|t| t.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["inner", "outer"]);
    assert!(suite.tests[0].uri.ends_with("inner.nt#inner"));
    Ok(())
}

#[test]
fn include_cycles_are_rejected() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config()?;
    fixture.file("q.rq", "ASK {}")?;
    fixture.manifest(
        "a.nt",
        &[Entry::new("a", "PositiveSyntaxTest", "q.rq")],
        &["b.nt"],
    )?;
    let manifest = fixture.manifest(
        "b.nt",
        &[Entry::new("b", "PositiveSyntaxTest", "q.rq")],
        &["a.nt"],
    )?;
    let error = Suite::from_manifest("cycle", &manifest, &config).unwrap_err();
    assert!(matches!(error, HarnessError::ManifestCycle { .. }), "{error}");
    Ok(())
}

#[test]
fn suites_are_discovered_through_the_build_system() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut config = fixture.config()?;
    fixture.file("one.rq", "ASK {}")?;
    fixture.file("two.rq", "ASK {}")?;
    fixture.file("two.exit", "1")?;
    let plan = PlanBuilder::new("sparql-bad-syntax").build(fixture.dir.path())?;
    fixture.file("plan.txt", &plan)?;
    let build = fixture.script(
        "build.sh",
        "#!/bin/sh\ncase \"$1\" in\n  list) echo bad-syntax ;;\n  plan-bad-syntax) cat plan.txt ;;\n  *) exit 2 ;;\nesac\n",
    )?;
    config.build = BuildTool {
        tool: Tool::new(build.to_string_lossy()),
        list_target: "list".into(),
        plan_target_prefix: "plan-".into(),
    };

    let summary = RunCoordinator::new(&config, None)
        .run(&[Target::Directory(fixture.dir.path().to_owned())]);
    assert!(summary.setup_errors.is_empty(), "{:?}", summary.setup_errors);
    assert_eq!(summary.suites.len(), 1);
    assert_eq!(summary.suites[0].name, "bad-syntax");
    assert_eq!(summary.totals.uxpassed, 1);
    assert_eq!(summary.totals.xfailed, 1);
    assert_eq!(summary.exit_code(), 1);

    // Generated plans do not outlive the run
    let leftovers = fs::read_dir(fixture.dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".sparqlcheck-"))
        .count();
    assert_eq!(leftovers, 0);
    Ok(())
}

#[test]
fn plans_are_deleted_once_their_suite_ran() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut config = fixture.config()?;
    fixture.file("q.rq", "ASK {}")?;
    let plan = PlanBuilder::new("sparql-bad-syntax").build(fixture.dir.path())?;
    fixture.file("plan.txt", &plan)?;
    let build = fixture.script(
        "build.sh",
        "#!/bin/sh\ncase \"$1\" in\n  list) echo first second ;;\n  plan-*) cat plan.txt ;;\n  *) exit 2 ;;\nesac\n",
    )?;
    config.build = BuildTool {
        tool: Tool::new(build.to_string_lossy()),
        list_target: "list".into(),
        plan_target_prefix: "plan-".into(),
    };
    let directory = fixture.dir.path().to_string_lossy().into_owned();
    let count_plans = format!(
        "ls -a '{directory}' | grep -c '^\\.sparqlcheck-' >> '{directory}/plans.log'; exit 0"
    );
    config.engine.tool = Tool::new("sh").with_args(["-c", count_plans.as_str(), "engine"]);

    let summary = RunCoordinator::new(&config, None)
        .run(&[Target::Directory(fixture.dir.path().to_owned())]);
    assert!(summary.setup_errors.is_empty(), "{:?}", summary.setup_errors);
    assert_eq!(summary.suites.len(), 2);
    assert_eq!(fs::read_to_string(fixture.path("plans.log"))?, "2\n1\n");
    Ok(())
}

#[test]
fn build_system_failures_are_setup_errors() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut config = fixture.config()?;
    config.build.tool = Tool::new("false");
    let summary = RunCoordinator::new(&config, None)
        .run(&[Target::Directory(fixture.dir.path().to_owned())]);
    assert!(matches!(
        summary.setup_errors.as_slice(),
        [HarnessError::BuildSystem { .. }]
    ));
    assert_eq!(summary.exit_code(), 1);
    Ok(())
}

#[test]
fn dry_runs_execute_nothing() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut config = fixture.config()?;
    config.dry_run = true;
    config.engine.tool = Tool::new("sparqlcheck-no-such-engine");
    fixture.file("q.rq", "ASK {}")?;
    let manifest = fixture.manifest(
        "manifest.nt",
        &[Entry::new("q", "PositiveSyntaxTest", "q.rq")],
        &[],
    )?;
    let summary = RunCoordinator::new(&config, None).run(&[Target::Manifest(manifest)]);
    assert!(summary.setup_errors.is_empty());
    assert_eq!(summary.totals.skipped, 1);
    assert_eq!(summary.exit_code(), 0);
    Ok(())
}

#[test]
fn missing_engine_is_a_setup_error() -> Result<()> {
    let fixture = Fixture::new()?;
    let mut config = fixture.config()?;
    config.engine.tool = Tool::new("sparqlcheck-no-such-engine");
    fixture.file("q.rq", "ASK {}")?;
    let manifest = fixture.manifest(
        "manifest.nt",
        &[Entry::new("q", "PositiveSyntaxTest", "q.rq")],
        &[],
    )?;
    let summary = RunCoordinator::new(&config, None).run(&[Target::Manifest(manifest)]);
    assert!(summary.suites.is_empty());
    assert_eq!(summary.setup_errors.len(), 1);
    assert_eq!(summary.exit_code(), 1);
    Ok(())
}
