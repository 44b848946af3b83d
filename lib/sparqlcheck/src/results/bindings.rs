//! Variable bindings and their canonical rendering.

use super::BlankNodeRenamer;
use super::delimited::csv_term;
use oxrdf::Term;
use std::collections::{BTreeMap, HashMap};

/// How much of the original terms a result format preserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fidelity {
    #[default]
    Full,
    /// CSV keeps only lexical forms: datatypes and language tags are lost.
    Csv,
}

/// A solution sequence.
///
/// Variables are stored without their `?` and in declaration order. Any variable
/// bound in a row is declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    variables: Vec<String>,
    rows: Vec<BTreeMap<String, Term>>,
    ordered: bool,
    fidelity: Fidelity,
}

impl Bindings {
    pub fn new(variables: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut bindings = Self::default();
        for variable in variables {
            bindings.declare(variable.into());
        }
        bindings
    }

    fn declare(&mut self, variable: String) {
        if !self.variables.contains(&variable) {
            self.variables.push(variable);
        }
    }

    pub fn push_row(&mut self, row: impl IntoIterator<Item = (String, Term)>) {
        let row = row.into_iter().collect::<BTreeMap<_, _>>();
        for variable in row.keys() {
            self.declare(variable.clone());
        }
        self.rows.push(row);
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn rows(&self) -> &[BTreeMap<String, Term>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Marks the row order as significant.
    #[must_use]
    pub fn with_order(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    #[must_use]
    pub fn with_fidelity(mut self, fidelity: Fidelity) -> Self {
        self.fidelity = fidelity;
        self
    }

    pub fn fidelity(&self) -> Fidelity {
        self.fidelity
    }

    /// What these bindings would look like after a trip through CSV.
    #[must_use]
    pub fn to_csv_fidelity(&self) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter_map(|(variable, value)| {
                        let value = match value {
                            Term::Literal(literal) => csv_term(literal.value())?,
                            value => value.clone(),
                        };
                        Some((variable.clone(), value))
                    })
                    .collect()
            })
            .collect();
        Self {
            variables: self.variables.clone(),
            rows,
            ordered: self.ordered,
            fidelity: Fidelity::Csv,
        }
    }

    /// The canonical text of the solutions with the given column order.
    ///
    /// The first line lists the columns, then there is one line per row where
    /// unbound variables are written `UNDEF`. Rows are sorted unless the sequence is
    /// ordered, and blank nodes are renamed once rows are in place.
    pub fn canonical_lines(&self, columns: &[String]) -> Vec<String> {
        self.render(columns, self.ordered)
    }

    fn render(&self, columns: &[String], ordered: bool) -> Vec<String> {
        let mut rows = self
            .rows
            .iter()
            .map(|row| {
                let mut local = HashMap::new();
                let key = render_row(row, columns, &mut |id| {
                    let next = local.len();
                    format!("_:*{}", local.entry(id.to_owned()).or_insert(next))
                });
                (key, row)
            })
            .collect::<Vec<_>>();
        if !ordered {
            rows.sort_by(|(a, _), (b, _)| a.cmp(b));
        }

        let mut renamer = BlankNodeRenamer::default();
        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(header(columns));
        lines.extend(rows.into_iter().map(|(_, row)| {
            render_row(row, columns, &mut |id| format!("_:{}", renamer.rename(id)))
        }));
        lines
    }
}

fn header(columns: &[String]) -> String {
    let mut header = String::from("columns:");
    for column in columns {
        header.push_str(" ?");
        header.push_str(column);
    }
    header
}

fn render_row(
    row: &BTreeMap<String, Term>,
    columns: &[String],
    blank: &mut impl FnMut(&str) -> String,
) -> String {
    let mut line = String::from("[");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            line.push_str(", ");
        }
        line.push_str(column);
        line.push('=');
        match row.get(column) {
            None => line.push_str("UNDEF"),
            Some(Term::BlankNode(node)) => line.push_str(&blank(node.as_str())),
            Some(value) => line.push_str(&value.to_string()),
        }
    }
    line.push(']');
    line
}

/// The variables of the expected side, followed by the ones only the actual side has.
pub fn column_order(expected: &Bindings, actual: &Bindings) -> Vec<String> {
    let mut columns = expected.variables.clone();
    for variable in &actual.variables {
        if !columns.contains(variable) {
            columns.push(variable.clone());
        }
    }
    columns
}

/// Canonical texts of both sides, rendered with the same columns and ordering rules.
///
/// The expected side is degraded to CSV fidelity when the actual side was read from CSV.
pub fn canonical_pair(expected: &Bindings, actual: &Bindings) -> (Vec<String>, Vec<String>) {
    let columns = column_order(expected, actual);
    let ordered = expected.ordered || actual.ordered;
    let expected = if actual.fidelity == Fidelity::Csv && expected.fidelity != Fidelity::Csv {
        expected.to_csv_fidelity().render(&columns, ordered)
    } else {
        expected.render(&columns, ordered)
    };
    (expected, actual.render(&columns, ordered))
}
