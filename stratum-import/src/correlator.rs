//! In-memory graph index over one dump.
//!
//! `insert` accepts vertices and edges in any order relative to the ids
//! they reference: all state is id-keyed association, and edge
//! endpoints are buffered until `finalize`, because a dump may
//! reference an id before its defining vertex arrives. Dangling ids
//! surface as [`StructuralError`]s when `finalize` (or a later stage)
//! dereferences them, never at insert time.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use stratum_core::errors::{ImportError, StructuralError};
use stratum_core::protocol::hover::normalize_hover;
use stratum_core::protocol::{Edge, Element, Id, MonikerKind, Position, Vertex};

/// Results shared by ranges and result sets. Mutated only during
/// canonicalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSetData {
    pub definition_result: Option<Id>,
    pub reference_result: Option<Id>,
    pub hover_result: Option<Id>,
    pub monikers: Vec<Id>,
}

/// A source range plus its (canonicalized) results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeData {
    pub start: Position,
    pub end: Position,
    #[serde(flatten)]
    pub results: ResultSetData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonikerData {
    pub scheme: String,
    pub identifier: String,
    pub kind: MonikerKind,
    pub package_information: Option<Id>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInformationData {
    pub name: String,
    pub version: Option<String>,
}

enum ResultEdgeKind {
    Definition,
    Reference,
    Hover,
}

/// Accumulated graph state for one import. Owned exclusively by the
/// backend for the duration of the upload.
#[derive(Default)]
pub struct Correlator {
    /// Version string from the metadata vertex; its absence after the
    /// stream ends fails the upload.
    pub dump_version: Option<String>,

    pub document_paths: FxHashMap<Id, String>,
    pub range_data: FxHashMap<Id, RangeData>,
    pub result_set_data: FxHashMap<Id, ResultSetData>,
    pub hover_data: FxHashMap<Id, String>,
    pub moniker_data: FxHashMap<Id, MonikerData>,
    pub package_information_data: FxHashMap<Id, PackageInformationData>,

    /// Alias edges, removed one by one during canonicalization.
    pub next_data: FxHashMap<Id, Id>,
    /// Undirected moniker-equivalence adjacency; every insertion
    /// updates both directions.
    pub moniker_sets: FxHashMap<Id, FxHashSet<Id>>,
    /// Document id -> contained range ids, in arrival order.
    pub contains_data: FxHashMap<Id, Vec<Id>>,
    /// Result id -> document id -> range ids realizing the result.
    pub definition_data: FxHashMap<Id, FxHashMap<Id, Vec<Id>>>,
    pub reference_data: FxHashMap<Id, FxHashMap<Id, Vec<Id>>>,

    pub exported_monikers: FxHashSet<Id>,
    pub imported_monikers: FxHashSet<Id>,

    // Edge associations buffered until finalize; their endpoints may
    // not have arrived yet.
    item_edges: Vec<(Id, Id, Vec<Id>)>,
    moniker_attachments: Vec<(Id, Id)>,
    package_attachments: Vec<(Id, Id)>,
    result_attachments: Vec<(ResultEdgeKind, Id, Id)>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept one decoded graph element.
    pub fn insert(&mut self, element: Element) {
        match element {
            Element::Vertex(vertex) => self.insert_vertex(vertex),
            Element::Edge(edge) => self.insert_edge(edge),
        }
    }

    fn insert_vertex(&mut self, vertex: Vertex) {
        match vertex {
            Vertex::MetaData { version } => {
                self.dump_version.get_or_insert(version);
            }
            Vertex::Document { id, uri } => {
                self.document_paths.insert(id.clone(), uri);
                // A document with no contains edge assembles to an
                // empty range list rather than failing.
                self.contains_data.entry(id).or_default();
            }
            Vertex::Range { id, start, end } => {
                self.range_data.insert(
                    id,
                    RangeData {
                        start,
                        end,
                        results: ResultSetData::default(),
                    },
                );
            }
            Vertex::ResultSet { id } => {
                self.result_set_data.insert(id, ResultSetData::default());
            }
            Vertex::DefinitionResult { id } => {
                self.definition_data.entry(id).or_default();
            }
            Vertex::ReferenceResult { id } => {
                self.reference_data.entry(id).or_default();
            }
            Vertex::HoverResult { id, result } => {
                self.hover_data
                    .insert(id, normalize_hover(&result.contents));
            }
            Vertex::Moniker {
                id,
                scheme,
                identifier,
                kind,
            } => {
                match kind {
                    MonikerKind::Import => {
                        self.imported_monikers.insert(id.clone());
                    }
                    MonikerKind::Export => {
                        self.exported_monikers.insert(id.clone());
                    }
                    MonikerKind::Local => {}
                }
                self.moniker_data.insert(
                    id,
                    MonikerData {
                        scheme,
                        identifier,
                        kind,
                        package_information: None,
                    },
                );
            }
            Vertex::PackageInformation { id, name, version } => {
                self.package_information_data
                    .insert(id, PackageInformationData { name, version });
            }
        }
    }

    fn insert_edge(&mut self, edge: Edge) {
        match edge {
            Edge::Contains { out_v, in_vs } => {
                self.contains_data.entry(out_v).or_default().extend(in_vs);
            }
            Edge::Item {
                out_v,
                in_vs,
                document,
            } => {
                self.item_edges.push((out_v, document, in_vs));
            }
            Edge::Next { out_v, in_v } => {
                self.next_data.insert(out_v, in_v);
            }
            Edge::Moniker { out_v, in_v } => {
                self.moniker_attachments.push((out_v, in_v));
            }
            Edge::NextMoniker { out_v, in_v } => {
                self.moniker_sets
                    .entry(out_v.clone())
                    .or_default()
                    .insert(in_v.clone());
                self.moniker_sets.entry(in_v).or_default().insert(out_v);
            }
            Edge::PackageInformation { out_v, in_v } => {
                self.package_attachments.push((out_v, in_v));
            }
            Edge::Definition { out_v, in_v } => {
                self.result_attachments
                    .push((ResultEdgeKind::Definition, out_v, in_v));
            }
            Edge::References { out_v, in_v } => {
                self.result_attachments
                    .push((ResultEdgeKind::Reference, out_v, in_v));
            }
            Edge::Hover { out_v, in_v } => {
                self.result_attachments
                    .push((ResultEdgeKind::Hover, out_v, in_v));
            }
        }
    }

    /// Resolve every buffered edge against the vertex tables. Called
    /// once, after the stream is fully consumed.
    pub fn finalize(&mut self) -> Result<(), ImportError> {
        if self.dump_version.is_none() {
            return Err(ImportError::MissingMetadata);
        }

        for (item_id, moniker_id) in std::mem::take(&mut self.moniker_attachments) {
            let results = self.results_mut(&item_id, "moniker")?;
            results.monikers.push(moniker_id);
        }

        for (kind, item_id, target_id) in std::mem::take(&mut self.result_attachments) {
            let relation = match kind {
                ResultEdgeKind::Definition => "textDocument/definition",
                ResultEdgeKind::Reference => "textDocument/references",
                ResultEdgeKind::Hover => "textDocument/hover",
            };
            let results = self.results_mut(&item_id, relation)?;
            let slot = match kind {
                ResultEdgeKind::Definition => &mut results.definition_result,
                ResultEdgeKind::Reference => &mut results.reference_result,
                ResultEdgeKind::Hover => &mut results.hover_result,
            };
            if slot.is_none() {
                *slot = Some(target_id);
            }
        }

        for (moniker_id, package_id) in std::mem::take(&mut self.package_attachments) {
            let moniker = self.moniker_data.get_mut(&moniker_id).ok_or_else(|| {
                StructuralError::MissingReference {
                    relation: "packageInformation",
                    id: moniker_id.clone(),
                }
            })?;
            moniker.package_information.get_or_insert(package_id);
        }

        for (result_id, document_id, range_ids) in std::mem::take(&mut self.item_edges) {
            let per_document = if let Some(map) = self.definition_data.get_mut(&result_id) {
                map
            } else if let Some(map) = self.reference_data.get_mut(&result_id) {
                map
            } else {
                return Err(StructuralError::MissingReference {
                    relation: "item",
                    id: result_id,
                }
                .into());
            };
            per_document
                .entry(document_id)
                .or_default()
                .extend(range_ids);
        }

        Ok(())
    }

    // Typed accessors, each naming the relation it resolves so a
    // dangling id produces an actionable error.

    pub fn document_path(&self, id: &Id) -> Result<&str, StructuralError> {
        self.document_paths
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| StructuralError::MissingReference {
                relation: "document",
                id: id.clone(),
            })
    }

    pub fn range(&self, id: &Id) -> Result<&RangeData, StructuralError> {
        self.range_data
            .get(id)
            .ok_or_else(|| StructuralError::MissingReference {
                relation: "range",
                id: id.clone(),
            })
    }

    pub fn result_set(&self, id: &Id) -> Result<&ResultSetData, StructuralError> {
        self.result_set_data
            .get(id)
            .ok_or_else(|| StructuralError::MissingReference {
                relation: "resultSet",
                id: id.clone(),
            })
    }

    pub fn moniker(&self, id: &Id) -> Result<&MonikerData, StructuralError> {
        self.moniker_data
            .get(id)
            .ok_or_else(|| StructuralError::MissingReference {
                relation: "moniker",
                id: id.clone(),
            })
    }

    pub fn package_information(
        &self,
        id: &Id,
    ) -> Result<&PackageInformationData, StructuralError> {
        self.package_information_data
            .get(id)
            .ok_or_else(|| StructuralError::MissingReference {
                relation: "packageInformation",
                id: id.clone(),
            })
    }

    pub fn hover(&self, id: &Id) -> Result<&str, StructuralError> {
        self.hover_data
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| StructuralError::MissingReference {
                relation: "hoverResult",
                id: id.clone(),
            })
    }

    /// Mutable view of a range's or result set's results.
    pub fn results_mut(
        &mut self,
        id: &Id,
        relation: &'static str,
    ) -> Result<&mut ResultSetData, StructuralError> {
        if let Some(range) = self.range_data.get_mut(id) {
            return Ok(&mut range.results);
        }
        if let Some(set) = self.result_set_data.get_mut(id) {
            return Ok(set);
        }
        Err(StructuralError::MissingReference {
            relation,
            id: id.clone(),
        })
    }
}
