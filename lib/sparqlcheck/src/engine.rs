//! Command lines of the query engine under test.

use crate::config::Tool;
use crate::kind::Language;
use crate::process::Invocation;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// Output formats the engine may be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResultFormat {
    /// Debug rows, one `row: [...]` line per solution.
    #[default]
    Simple,
    Csv,
    Tsv,
    /// SPARQL results JSON.
    Srj,
    /// SPARQL results XML.
    Xml,
    NTriples,
    Turtle,
}

impl ResultFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Srj => "srj",
            Self::Xml => "xml",
            Self::NTriples => "ntriples",
            Self::Turtle => "turtle",
        }
    }

    pub fn is_graph(self) -> bool {
        matches!(self, Self::NTriples | Self::Turtle)
    }
}

impl fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "simple" | "debug" => Self::Simple,
            "csv" => Self::Csv,
            "tsv" => Self::Tsv,
            "srj" | "json" => Self::Srj,
            "xml" | "srx" => Self::Xml,
            "ntriples" | "nt" => Self::NTriples,
            "turtle" | "ttl" => Self::Turtle,
            _ => return Err(format!("unknown result format: {s}")),
        })
    }
}

/// The engine program and the flags it understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineProfile {
    pub tool: Tool,
    pub language_flag: String,
    pub format_flag: String,
    pub data_flag: String,
    pub named_graph_flag: String,
    pub parse_only_flag: String,
    pub warning_flag: String,
}

impl Default for EngineProfile {
    fn default() -> Self {
        Self {
            tool: Tool::new("roqet"),
            language_flag: "-i".into(),
            format_flag: "-r".into(),
            data_flag: "-D".into(),
            named_graph_flag: "-G".into(),
            parse_only_flag: "-n".into(),
            warning_flag: "-W".into(),
        }
    }
}

/// One query to hand to the engine.
#[derive(Debug, Clone)]
pub struct EngineRequest<'a> {
    pub query: &'a Path,
    pub language: Language,
    pub format: Option<ResultFormat>,
    pub parse_only: bool,
    pub warning_level: Option<u8>,
    pub data: &'a [PathBuf],
    pub named_graphs: &'a [PathBuf],
}

impl<'a> EngineRequest<'a> {
    pub fn new(query: &'a Path, language: Language) -> Self {
        Self {
            query,
            language,
            format: None,
            parse_only: false,
            warning_level: None,
            data: &[],
            named_graphs: &[],
        }
    }
}

impl EngineProfile {
    pub fn program(&self) -> &str {
        &self.tool.program
    }

    pub fn args(&self, request: &EngineRequest<'_>) -> Vec<OsString> {
        let mut args = Vec::new();
        let mut flag = |flag: &str, value: OsString| {
            if !flag.is_empty() {
                args.push(flag.into());
                args.push(value);
            }
        };
        flag(&self.language_flag, request.language.as_str().into());
        if let Some(level) = request.warning_level {
            flag(&self.warning_flag, level.to_string().into());
        }
        if !request.parse_only {
            if let Some(format) = request.format {
                flag(&self.format_flag, format.as_str().into());
            }
            for data in request.data {
                flag(&self.data_flag, data.as_os_str().to_owned());
            }
            for graph in request.named_graphs {
                flag(&self.named_graph_flag, graph.as_os_str().to_owned());
            }
        }
        if request.parse_only && !self.parse_only_flag.is_empty() {
            args.push(self.parse_only_flag.clone().into());
        }
        args.push(query_argument(request.query));
        args
    }

    pub fn invocation(&self, request: &EngineRequest<'_>) -> Invocation {
        self.tool.invocation().args(self.args(request))
    }
}

/// Absolute query paths are passed as `file://` URIs, others as is.
pub fn query_argument(query: &Path) -> OsString {
    if query.is_absolute() {
        if let Ok(url) = Url::from_file_path(query) {
            return String::from(url).into();
        }
    }
    query.as_os_str().to_owned()
}
