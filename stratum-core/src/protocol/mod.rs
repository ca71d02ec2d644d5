//! Dump protocol model.
//!
//! One JSON object per line, discriminated first on `type`
//! (vertex/edge) and then on `label`. The label set is closed: the
//! correlator matches exhaustively instead of inspecting shapes at
//! runtime, and an unknown label fails the line rather than being
//! silently dropped.

pub mod hover;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use hover::{HoverContents, MarkedString};

/// An opaque element identifier, unique within one dump.
///
/// The wire format allows both numeric and string ids. Numeric ids are
/// by far the common case, so they are kept as integers rather than
/// eagerly stringified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    String(String),
}

impl Id {
    /// Canonical string form, used as a JSON map key in encoded
    /// payloads and as the input to the stable shard hash.
    pub fn as_key(&self) -> String {
        match self {
            Id::Number(n) => n.to_string(),
            Id::String(s) => s.clone(),
        }
    }

    /// Canonical byte form for hashing, without allocating for the
    /// string case.
    pub fn hash_bytes(&self) -> Vec<u8> {
        match self {
            Id::Number(n) => n.to_string().into_bytes(),
            Id::String(s) => s.as_bytes().to_vec(),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(n) => write!(f, "{n}"),
            Id::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for Id {
    fn from(n: u64) -> Self {
        Id::Number(n)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

/// A zero-based (line, character) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// Moniker kinds. Absent or unrecognized kinds deserialize as `Local`,
/// which is never exported or imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MonikerKind {
    #[default]
    Local,
    Import,
    Export,
}

impl<'de> Deserialize<'de> for MonikerKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let kind = String::deserialize(deserializer)?;
        Ok(match kind.as_str() {
            "import" => MonikerKind::Import,
            "export" => MonikerKind::Export,
            _ => MonikerKind::Local,
        })
    }
}

/// One decoded dump line.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Vertex(Vertex),
    Edge(Edge),
}

/// Vertex payloads, discriminated on `label`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "label")]
pub enum Vertex {
    #[serde(rename = "metaData")]
    MetaData { version: String },

    #[serde(rename = "document")]
    Document { id: Id, uri: String },

    #[serde(rename = "range")]
    Range {
        id: Id,
        start: Position,
        end: Position,
    },

    #[serde(rename = "resultSet")]
    ResultSet { id: Id },

    #[serde(rename = "definitionResult")]
    DefinitionResult { id: Id },

    #[serde(rename = "referenceResult")]
    ReferenceResult { id: Id },

    #[serde(rename = "hoverResult")]
    HoverResult { id: Id, result: hover::HoverResult },

    #[serde(rename = "moniker")]
    Moniker {
        id: Id,
        scheme: String,
        identifier: String,
        #[serde(default)]
        kind: MonikerKind,
    },

    #[serde(rename = "packageInformation")]
    PackageInformation {
        id: Id,
        name: String,
        #[serde(default)]
        version: Option<String>,
    },
}

/// Edge payloads, discriminated on `label`.
///
/// `outV`/`inV`/`inVs` endpoints may reference vertices that arrive
/// later in the stream; the correlator stores associations by id and
/// resolves them lazily.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "label")]
pub enum Edge {
    #[serde(rename = "contains")]
    Contains {
        #[serde(rename = "outV")]
        out_v: Id,
        #[serde(rename = "inVs")]
        in_vs: Vec<Id>,
    },

    #[serde(rename = "item")]
    Item {
        #[serde(rename = "outV")]
        out_v: Id,
        #[serde(rename = "inVs")]
        in_vs: Vec<Id>,
        document: Id,
    },

    #[serde(rename = "next")]
    Next {
        #[serde(rename = "outV")]
        out_v: Id,
        #[serde(rename = "inV")]
        in_v: Id,
    },

    #[serde(rename = "moniker")]
    Moniker {
        #[serde(rename = "outV")]
        out_v: Id,
        #[serde(rename = "inV")]
        in_v: Id,
    },

    #[serde(rename = "nextMoniker")]
    NextMoniker {
        #[serde(rename = "outV")]
        out_v: Id,
        #[serde(rename = "inV")]
        in_v: Id,
    },

    #[serde(rename = "packageInformation")]
    PackageInformation {
        #[serde(rename = "outV")]
        out_v: Id,
        #[serde(rename = "inV")]
        in_v: Id,
    },

    #[serde(rename = "textDocument/definition")]
    Definition {
        #[serde(rename = "outV")]
        out_v: Id,
        #[serde(rename = "inV")]
        in_v: Id,
    },

    #[serde(rename = "textDocument/references")]
    References {
        #[serde(rename = "outV")]
        out_v: Id,
        #[serde(rename = "inV")]
        in_v: Id,
    },

    #[serde(rename = "textDocument/hover")]
    Hover {
        #[serde(rename = "outV")]
        out_v: Id,
        #[serde(rename = "inV")]
        in_v: Id,
    },
}
