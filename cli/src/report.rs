//! JUnit XML and EARL renderings of a run.

use anyhow::Context;
use oxrdf::vocab::{rdf, xsd};
use oxrdf::{BlankNode, Literal, NamedNode, NamedNodeRef, Triple};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use sparqlcheck::{ExecutionRecord, Outcome, RunSummary};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

mod earl {
    use oxrdf::NamedNodeRef;

    pub const ASSERTION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/earl#Assertion");
    pub const ASSERTED_BY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/earl#assertedBy");
    pub const SUBJECT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/earl#subject");
    pub const TEST: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/earl#test");
    pub const RESULT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/earl#result");
    pub const TEST_RESULT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/earl#TestResult");
    pub const OUTCOME: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/earl#outcome");
    pub const PASSED: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/earl#passed");
    pub const FAILED: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/earl#failed");
    pub const UNTESTED: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/earl#untested");
    pub const SOFTWARE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/earl#Software");
}

const DC_DATE: NamedNodeRef<'_> = NamedNodeRef::new_unchecked("http://purl.org/dc/terms/date");
const DOAP_NAME: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://usefulinc.com/ns/doap#name");

/// One `testsuite` element per suite, failed and unexpectedly passed tests as `failure`.
pub fn junit(summary: &RunSummary) -> anyhow::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let tests = summary.totals.total().to_string();
    let failures = (summary.totals.failed + summary.totals.uxpassed).to_string();
    let skipped = summary.totals.skipped.to_string();
    writer.write_event(Event::Start(BytesStart::new("testsuites").with_attributes([
        ("name", "sparqlcheck"),
        ("tests", tests.as_str()),
        ("failures", failures.as_str()),
        ("skipped", skipped.as_str()),
    ])))?;
    for suite in &summary.suites {
        let tests = suite.counts.total().to_string();
        let failures = (suite.counts.failed + suite.counts.uxpassed).to_string();
        let skipped = suite.counts.skipped.to_string();
        let time = format!("{:.3}", suite.elapsed.as_secs_f64());
        writer.write_event(Event::Start(BytesStart::new("testsuite").with_attributes([
            ("name", suite.name.as_str()),
            ("tests", tests.as_str()),
            ("failures", failures.as_str()),
            ("skipped", skipped.as_str()),
            ("time", time.as_str()),
        ])))?;
        for record in &suite.records {
            write_test_case(&mut writer, &suite.name, record)?;
        }
        writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;
    let mut xml = String::from_utf8(writer.into_inner()).context("invalid JUnit report")?;
    xml.push('\n');
    Ok(xml)
}

fn write_test_case(
    writer: &mut Writer<Vec<u8>>,
    suite: &str,
    record: &ExecutionRecord,
) -> anyhow::Result<()> {
    let time = format!("{:.3}", record.elapsed.as_secs_f64());
    let start = BytesStart::new("testcase").with_attributes([
        ("name", record.name.as_str()),
        ("classname", suite),
        ("id", record.test.as_str()),
        ("time", time.as_str()),
    ]);
    let child = match record.outcome {
        Outcome::Failed | Outcome::UxPassed => "failure",
        Outcome::Skipped => "skipped",
        Outcome::Passed | Outcome::XFailed => {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
    };
    writer.write_event(Event::Start(start))?;
    let message = if record.detail.is_empty() {
        record.outcome.as_str()
    } else {
        record.detail.as_str()
    };
    let element = BytesStart::new(child).with_attributes([("message", message)]);
    if record.output.is_empty() {
        writer.write_event(Event::Empty(element))?;
    } else {
        writer.write_event(Event::Start(element))?;
        writer.write_event(Event::Text(BytesText::new(&record.output)))?;
        writer.write_event(Event::End(BytesEnd::new(child)))?;
    }
    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// EARL assertions in N-Triples about the engine, one per executed or skipped test.
pub fn earl(summary: &RunSummary, engine: &str) -> anyhow::Result<String> {
    let date = Literal::new_typed_literal(
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("failed to format the report date")?,
        xsd::DATE_TIME,
    );
    let subject = BlankNode::default();
    let mut triples = vec![
        Triple::new(subject.clone(), rdf::TYPE, earl::SOFTWARE),
        Triple::new(subject.clone(), DOAP_NAME, Literal::new_simple_literal(engine)),
    ];
    for record in summary.suites.iter().flat_map(|suite| &suite.records) {
        let Ok(test) = NamedNode::new(&record.test) else {
            warn!(test = %record.test, "not writing an EARL assertion for a test without IRI");
            continue;
        };
        let assertion = BlankNode::default();
        let result = BlankNode::default();
        let outcome = match record.outcome {
            Outcome::Passed | Outcome::XFailed => earl::PASSED,
            Outcome::Failed | Outcome::UxPassed => earl::FAILED,
            Outcome::Skipped => earl::UNTESTED,
        };
        triples.extend([
            Triple::new(assertion.clone(), rdf::TYPE, earl::ASSERTION),
            Triple::new(assertion.clone(), earl::ASSERTED_BY, subject.clone()),
            Triple::new(assertion.clone(), earl::SUBJECT, subject.clone()),
            Triple::new(assertion.clone(), earl::TEST, test),
            Triple::new(assertion, earl::RESULT, result.clone()),
            Triple::new(result.clone(), rdf::TYPE, earl::TEST_RESULT),
            Triple::new(result.clone(), earl::OUTCOME, outcome),
            Triple::new(result, DC_DATE, date.clone()),
        ]);
    }
    Ok(triples
        .iter()
        .map(|triple| format!("{triple} .\n"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparqlcheck::{Counts, SuiteReport};
    use std::path::PathBuf;
    use std::time::Duration;

    fn record(name: &str, outcome: Outcome, detail: &str) -> ExecutionRecord {
        ExecutionRecord {
            outcome,
            output: if outcome == Outcome::Failed {
                "line <1>\n".into()
            } else {
                String::new()
            },
            elapsed: Duration::from_millis(5),
            ..ExecutionRecord::skipped(format!("http://example.com/manifest#{name}"), name, detail)
        }
    }

    fn summary() -> RunSummary {
        let records = vec![
            record("ok", Outcome::Passed, ""),
            record("known", Outcome::XFailed, ""),
            record("broken", Outcome::Failed, "results differ"),
            record("surprise", Outcome::UxPassed, ""),
            record("later", Outcome::Skipped, "entailment"),
        ];
        let mut counts = Counts::default();
        for record in &records {
            counts.record(record.outcome);
        }
        RunSummary {
            suites: vec![SuiteReport {
                name: "sparql-query".into(),
                directory: PathBuf::from("."),
                description: None,
                records,
                counts,
                aborted: false,
                elapsed: Duration::from_secs(1),
            }],
            totals: counts,
            ..RunSummary::default()
        }
    }

    #[test]
    fn junit_report() -> anyhow::Result<()> {
        let xml = junit(&summary())?;
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains(
            "<testsuite name=\"sparql-query\" tests=\"5\" failures=\"2\" skipped=\"1\" time=\"1.000\">"
        ));
        assert!(xml.contains("<testcase name=\"ok\" classname=\"sparql-query\" id=\"http://example.com/manifest#ok\" time=\"0.005\"/>"));
        assert!(xml.contains("<failure message=\"results differ\">line &lt;1&gt;"));
        assert!(xml.contains("<failure message=\"uxpassed\"/>"));
        assert!(xml.contains("<skipped message=\"entailment\"/>"));
        assert_eq!(xml.matches("<testcase ").count(), 5);
        Ok(())
    }

    #[test]
    fn earl_report() -> anyhow::Result<()> {
        let nt = earl(&summary(), "roqet")?;
        assert!(nt.contains("<http://usefulinc.com/ns/doap#name> \"roqet\" .\n"));
        assert_eq!(nt.matches("<http://www.w3.org/ns/earl#Assertion>").count(), 5);
        assert_eq!(nt.matches("<http://www.w3.org/ns/earl#passed>").count(), 2);
        assert_eq!(nt.matches("<http://www.w3.org/ns/earl#failed>").count(), 2);
        assert_eq!(nt.matches("<http://www.w3.org/ns/earl#untested>").count(), 1);
        assert!(nt.contains(
            "<http://www.w3.org/ns/earl#test> <http://example.com/manifest#broken> .\n"
        ));
        assert!(nt.contains("^^<http://www.w3.org/2001/XMLSchema#dateTime> .\n"));
        Ok(())
    }
}
