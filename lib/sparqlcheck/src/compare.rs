//! Comparison of canonical query results.

use crate::config::Tool;
use crate::process::{self, EnvOverlay};
use crate::results::{QueryResult, Shape, canonical_pair};
use dissimilar::Chunk;
use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::debug;

const CONTEXT_LINES: usize = 3;

/// How the number of solutions is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cardinality {
    /// Both sides must have the same solutions.
    #[default]
    Strict,
    /// The engine may return fewer solutions than expected, never more.
    Lax,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub equal: bool,
    /// A human readable explanation of the difference, if any.
    pub diff: Option<String>,
}

impl Comparison {
    fn equal() -> Self {
        Self {
            equal: true,
            diff: None,
        }
    }

    fn different(diff: impl Into<String>) -> Self {
        Self {
            equal: false,
            diff: Some(diff.into()),
        }
    }
}

/// Compares two canonical results.
pub fn compare(
    actual: &QueryResult,
    expected: &QueryResult,
    cardinality: Cardinality,
) -> Comparison {
    match (actual, expected) {
        (QueryResult::Graph(actual), QueryResult::Graph(expected)) => {
            lines_comparison(expected.lines(), actual.lines())
        }
        (QueryResult::Bindings(actual), QueryResult::Bindings(expected)) => {
            let (expected_lines, actual_lines) = canonical_pair(expected, actual);
            let comparison = lines_comparison(&expected_lines, &actual_lines);
            if !comparison.equal
                && cardinality == Cardinality::Lax
                && actual.len() <= expected.len()
            {
                debug!(
                    actual = actual.len(),
                    expected = expected.len(),
                    "lax cardinality accepts the difference"
                );
                return Comparison::equal();
            }
            comparison
        }
        (QueryResult::Boolean(actual), QueryResult::Boolean(expected)) => {
            if actual == expected {
                Comparison::equal()
            } else {
                Comparison::different(format!("expected {expected}, got {actual}"))
            }
        }
        (QueryResult::Document(actual), QueryResult::Document(expected)) => {
            let expected = expected.lines().collect::<Vec<_>>();
            let actual = actual.lines().collect::<Vec<_>>();
            lines_comparison(&expected, &actual)
        }
        (actual, expected) => Comparison::different(format!(
            "expected a {} result, got a {} result",
            expected.shape(),
            actual.shape()
        )),
    }
}

fn lines_comparison(expected: &[impl AsRef<str>], actual: &[impl AsRef<str>]) -> Comparison {
    if expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .all(|(e, a)| e.as_ref() == a.as_ref())
    {
        Comparison::equal()
    } else {
        Comparison::different(format_diff(expected, actual))
    }
}

/// Compares results, asking the configured external tools when the texts differ.
pub struct Comparator<'a> {
    compare_tool: Option<&'a Tool>,
    diff_tool: Option<&'a Tool>,
    env: &'a EnvOverlay,
    timeout: Duration,
}

impl<'a> Comparator<'a> {
    pub fn new(
        compare_tool: Option<&'a Tool>,
        diff_tool: Option<&'a Tool>,
        env: &'a EnvOverlay,
        timeout: Duration,
    ) -> Self {
        Self {
            compare_tool,
            diff_tool,
            env,
            timeout,
        }
    }

    pub fn compare(
        &self,
        actual: &QueryResult,
        expected: &QueryResult,
        cardinality: Cardinality,
    ) -> Comparison {
        let mut comparison = compare(actual, expected, cardinality);
        if comparison.equal || actual.shape() != expected.shape() {
            return comparison;
        }
        if cardinality == Cardinality::Lax && actual.shape() == Shape::Bindings {
            return comparison;
        }
        if self.compare_tool.is_none() && self.diff_tool.is_none() {
            return comparison;
        }
        let files = match canonical_files(actual, expected) {
            Ok(files) => files,
            Err(e) => {
                debug!(error = %e, "can not write results for the external tools");
                return comparison;
            }
        };
        if let Some(tool) = self.compare_tool {
            match self.run(tool, &files) {
                Some(output) if output.exit_code == 0 => return Comparison::equal(),
                Some(output) if output.exit_code != 1 => {
                    debug!(
                        tool = %tool.program,
                        exit_code = output.exit_code,
                        timed_out = output.timed_out,
                        "comparison tool gave no verdict, keeping the textual comparison"
                    );
                }
                _ => (),
            }
        }
        if let Some(tool) = self.diff_tool {
            if let Some(output) = self.run(tool, &files) {
                if !output.timed_out && matches!(output.exit_code, 0 | 1) {
                    comparison.diff = Some(output.stdout);
                } else {
                    debug!(
                        tool = %tool.program,
                        exit_code = output.exit_code,
                        "diff tool failed, keeping the built-in diff"
                    );
                }
            }
        }
        comparison
    }

    fn run(
        &self,
        tool: &Tool,
        (expected, actual): &(NamedTempFile, NamedTempFile),
    ) -> Option<process::ProcessOutput> {
        let invocation = tool
            .invocation()
            .arg(expected.path())
            .arg(actual.path())
            .env(self.env.clone())
            .timeout(self.timeout);
        match process::run(&invocation, None) {
            Ok(output) => Some(output),
            Err(e) => {
                debug!(tool = %tool.program, error = %e, "can not run external tool");
                None
            }
        }
    }
}

/// Writes the canonical texts of both sides, expected first.
fn canonical_files(
    actual: &QueryResult,
    expected: &QueryResult,
) -> io::Result<(NamedTempFile, NamedTempFile)> {
    let (expected_text, actual_text) = match (expected, actual) {
        (QueryResult::Bindings(expected), QueryResult::Bindings(actual)) => {
            let (expected, actual) = canonical_pair(expected, actual);
            (expected.join("\n") + "\n", actual.join("\n") + "\n")
        }
        _ => (expected.to_string(), actual.to_string()),
    };
    let write = |prefix: &str, text: &str| -> io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new().prefix(prefix).suffix(".txt").tempfile()?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        Ok(file)
    };
    Ok((
        write("sparqlcheck-expected-", &expected_text)?,
        write("sparqlcheck-actual-", &actual_text)?,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Equal,
    Delete,
    Insert,
}

/// A unified diff of two line sequences, with `@@` hunks and three lines of context.
pub fn format_diff(expected: &[impl AsRef<str>], actual: &[impl AsRef<str>]) -> String {
    let expected = expected.iter().map(AsRef::as_ref).collect::<Vec<_>>();
    let actual = actual.iter().map(AsRef::as_ref).collect::<Vec<_>>();
    let operations = line_operations(&expected, &actual);
    let mut out = String::from("--- expected\n+++ actual\n");

    // Positions of each operation in both files
    let mut positions = Vec::with_capacity(operations.len());
    let (mut old, mut new) = (0, 0);
    for (tag, _) in &operations {
        positions.push((old, new));
        match tag {
            Tag::Equal => {
                old += 1;
                new += 1;
            }
            Tag::Delete => old += 1,
            Tag::Insert => new += 1,
        }
    }

    let changes = operations
        .iter()
        .enumerate()
        .filter(|(_, (tag, _))| *tag != Tag::Equal)
        .map(|(i, _)| i)
        .collect::<Vec<_>>();
    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for change in changes {
        let start = change.saturating_sub(CONTEXT_LINES);
        let end = (change + CONTEXT_LINES + 1).min(operations.len());
        match hunks.last_mut() {
            Some((_, last_end)) if start <= *last_end => *last_end = end,
            _ => hunks.push((start, end)),
        }
    }

    for (start, end) in hunks {
        let hunk = &operations[start..end];
        let old_len = hunk.iter().filter(|(tag, _)| *tag != Tag::Insert).count();
        let new_len = hunk.iter().filter(|(tag, _)| *tag != Tag::Delete).count();
        let (old_start, new_start) = positions[start];
        out.push_str(&format!(
            "@@ -{},{old_len} +{},{new_len} @@\n",
            if old_len == 0 { old_start } else { old_start + 1 },
            if new_len == 0 { new_start } else { new_start + 1 },
        ));
        for (tag, line) in hunk {
            out.push(match tag {
                Tag::Equal => ' ',
                Tag::Delete => '-',
                Tag::Insert => '+',
            });
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Diffs line sequences by mapping every distinct line to a single character.
fn line_operations<'a>(expected: &[&'a str], actual: &[&'a str]) -> Vec<(Tag, &'a str)> {
    let mut lines = Vec::<&'a str>::new();
    let mut codes = HashMap::<&'a str, char>::new();
    let mut encode = |text: &[&'a str]| -> Option<String> {
        text.iter()
            .map(|&line| {
                if let Some(code) = codes.get(line) {
                    return Some(*code);
                }
                let code = u32::try_from(lines.len())
                    .ok()
                    .and_then(|i| char::from_u32(0x10000 + i))?;
                codes.insert(line, code);
                lines.push(line);
                Some(code)
            })
            .collect()
    };
    let (Some(old), Some(new)) = (encode(expected), encode(actual)) else {
        // Too many distinct lines, show a full replacement
        return expected
            .iter()
            .map(|&l| (Tag::Delete, l))
            .chain(actual.iter().map(|&l| (Tag::Insert, l)))
            .collect();
    };
    let decode = |chunk: &str| {
        chunk
            .chars()
            .filter_map(|c| {
                let i = usize::try_from(u32::from(c) - 0x10000).ok()?;
                lines.get(i).copied()
            })
            .collect::<Vec<_>>()
    };
    dissimilar::diff(&old, &new)
        .into_iter()
        .flat_map(|chunk| {
            let (tag, text) = match chunk {
                Chunk::Equal(text) => (Tag::Equal, text),
                Chunk::Delete(text) => (Tag::Delete, text),
                Chunk::Insert(text) => (Tag::Insert, text),
            };
            decode(text).into_iter().map(move |line| (tag, line))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Bindings;
    use oxrdf::{Literal, Term};

    fn bindings(values: &[&str]) -> QueryResult {
        let mut bindings = Bindings::new(["x"]);
        for value in values {
            bindings.push_row([(
                "x".to_owned(),
                Term::from(Literal::new_simple_literal(*value)),
            )]);
        }
        QueryResult::Bindings(bindings)
    }

    #[test]
    fn lax_cardinality_accepts_fewer_rows_only() {
        let expected = bindings(&["1", "2", "3", "4", "5"]);
        let fewer = bindings(&["1", "2", "3"]);
        let more = bindings(&["1", "2", "3", "4", "5", "6"]);
        assert!(compare(&fewer, &expected, Cardinality::Lax).equal);
        assert!(!compare(&fewer, &expected, Cardinality::Strict).equal);
        assert!(!compare(&more, &expected, Cardinality::Lax).equal);
        assert!(compare(&expected, &expected, Cardinality::Strict).equal);
    }

    #[test]
    fn booleans_and_shapes() {
        let comparison = compare(
            &QueryResult::Boolean(false),
            &QueryResult::Boolean(true),
            Cardinality::Strict,
        );
        assert_eq!(comparison.diff.as_deref(), Some("expected true, got false"));
        let comparison = compare(
            &QueryResult::Boolean(true),
            &bindings(&[]),
            Cardinality::Strict,
        );
        assert!(!comparison.equal);
        assert_eq!(
            comparison.diff.as_deref(),
            Some("expected a bindings result, got a boolean result")
        );
    }

    #[test]
    fn mismatches_come_with_a_unified_diff() {
        let comparison = compare(
            &bindings(&["a", "c", "d"]),
            &bindings(&["a", "b", "c"]),
            Cardinality::Strict,
        );
        assert!(!comparison.equal);
        let diff = comparison.diff.unwrap();
        assert!(diff.starts_with("--- expected\n+++ actual\n@@ -1,4 +1,4 @@\n columns: ?x\n"), "{diff}");
        assert!(diff.contains("\n-[x=\"b\"]\n"), "{diff}");
        assert!(diff.contains("\n+[x=\"d\"]\n"), "{diff}");
        assert!(!diff.contains("+[x=\"a\"]"), "{diff}");
    }

    #[test]
    fn distant_changes_get_separate_hunks() {
        let expected = (0..20).map(|i| i.to_string()).collect::<Vec<_>>();
        let mut actual = expected.clone();
        actual[1] = "one".into();
        actual[18] = "eighteen".into();
        let diff = format_diff(&expected, &actual);
        assert_eq!(diff.matches("@@ -").count(), 2, "{diff}");
        assert!(diff.contains("-1\n+one\n"));
        assert!(diff.contains("-18\n+eighteen\n"));
        assert!(!diff.contains(" 9\n"));
    }

    #[test]
    fn identical_inputs_have_no_hunk() {
        let lines = ["a", "b"];
        assert_eq!(format_diff(&lines, &lines), "--- expected\n+++ actual\n");
    }

    #[cfg(unix)]
    #[test]
    fn external_tool_verdicts() {
        let env = EnvOverlay::new();
        let yes = Tool::new("true");
        let no = Tool::new("false");
        let broken = Tool::new("sh").with_args(["-c", "exit 3"]);
        let expected = bindings(&["a"]);
        let actual = bindings(&["b"]);
        let timeout = Duration::from_secs(10);
        let run = |tool| {
            Comparator::new(Some(tool), None, &env, timeout).compare(&actual, &expected, Cardinality::Strict)
        };
        assert!(run(&yes).equal);
        assert!(!run(&no).equal);
        let fallback = run(&broken);
        assert!(!fallback.equal);
        assert!(fallback.diff.unwrap().starts_with("--- expected"));
    }
}
