//! Moniker-keyed row projection for the `definitions` and `refs`
//! tables.
//!
//! A row exists for every (moniker, location) pair where the moniker is
//! attached to some range realizing the result. Keying by
//! (scheme, identifier) lets the query layer resolve a remote symbol
//! without decoding any document blob.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use stratum_core::errors::StructuralError;
use stratum_core::protocol::Id;

use crate::correlator::Correlator;

/// One row of the `definitions` or `refs` table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SymbolRow {
    pub scheme: String,
    pub identifier: String,
    pub document_path: String,
    pub start_line: u32,
    pub start_character: u32,
    pub end_line: u32,
    pub end_character: u32,
}

/// Per-result moniker sets: result id -> monikers attached to some
/// range realizing that result. Built from the canonicalized ranges,
/// so the sets already reflect equivalence closures.
fn collect_result_monikers(
    correlator: &Correlator,
) -> (FxHashMap<Id, BTreeSet<Id>>, FxHashMap<Id, BTreeSet<Id>>) {
    let mut definition_monikers: FxHashMap<Id, BTreeSet<Id>> = FxHashMap::default();
    let mut reference_monikers: FxHashMap<Id, BTreeSet<Id>> = FxHashMap::default();

    for range in correlator.range_data.values() {
        if range.results.monikers.is_empty() {
            continue;
        }
        if let Some(result_id) = &range.results.definition_result {
            definition_monikers
                .entry(result_id.clone())
                .or_default()
                .extend(range.results.monikers.iter().cloned());
        }
        if let Some(result_id) = &range.results.reference_result {
            reference_monikers
                .entry(result_id.clone())
                .or_default()
                .extend(range.results.monikers.iter().cloned());
        }
    }
    (definition_monikers, reference_monikers)
}

/// Project the canonicalized graph into sorted definition and
/// reference rows.
pub fn project_rows(
    correlator: &Correlator,
) -> Result<(Vec<SymbolRow>, Vec<SymbolRow>), StructuralError> {
    let (definition_monikers, reference_monikers) = collect_result_monikers(correlator);
    let definitions = moniker_rows(correlator, &correlator.definition_data, &definition_monikers)?;
    let references = moniker_rows(correlator, &correlator.reference_data, &reference_monikers)?;
    Ok((definitions, references))
}

fn moniker_rows(
    correlator: &Correlator,
    results: &FxHashMap<Id, FxHashMap<Id, Vec<Id>>>,
    result_monikers: &FxHashMap<Id, BTreeSet<Id>>,
) -> Result<Vec<SymbolRow>, StructuralError> {
    let mut rows = Vec::new();
    for (result_id, moniker_ids) in result_monikers {
        // Results realized by no range produce no rows.
        let Some(per_document) = results.get(result_id) else {
            continue;
        };
        for moniker_id in moniker_ids {
            let moniker = correlator.moniker(moniker_id)?;
            for (document_id, range_ids) in per_document {
                let path = correlator.document_path(document_id)?;
                for range_id in range_ids {
                    let range = correlator.range(range_id)?;
                    rows.push(SymbolRow {
                        scheme: moniker.scheme.clone(),
                        identifier: moniker.identifier.clone(),
                        document_path: path.to_owned(),
                        start_line: range.start.line,
                        start_character: range.start.character,
                        end_line: range.end.line,
                        end_character: range.end.character,
                    });
                }
            }
        }
    }
    rows.sort();
    rows.dedup();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonicalize::canonicalize_all;
    use stratum_core::protocol::{Edge, Element, MonikerKind, Position, Vertex};

    fn graph() -> Correlator {
        let mut correlator = Correlator::new();
        for element in [
            Element::Vertex(Vertex::MetaData {
                version: "0.4.3".into(),
            }),
            Element::Vertex(Vertex::Document {
                id: 1.into(),
                uri: "src/a.ts".into(),
            }),
            Element::Vertex(Vertex::Range {
                id: 4.into(),
                start: Position { line: 1, character: 5 },
                end: Position { line: 1, character: 12 },
            }),
            Element::Edge(Edge::Contains {
                out_v: 1.into(),
                in_vs: vec![4.into()],
            }),
            Element::Vertex(Vertex::Moniker {
                id: 20.into(),
                scheme: "npm".into(),
                identifier: "pkg:f".into(),
                kind: MonikerKind::Export,
            }),
            Element::Edge(Edge::Moniker {
                out_v: 4.into(),
                in_v: 20.into(),
            }),
            Element::Vertex(Vertex::DefinitionResult { id: 10.into() }),
            Element::Edge(Edge::Definition {
                out_v: 4.into(),
                in_v: 10.into(),
            }),
            Element::Edge(Edge::Item {
                out_v: 10.into(),
                in_vs: vec![4.into()],
                document: 1.into(),
            }),
        ] {
            correlator.insert(element);
        }
        correlator.finalize().unwrap();
        canonicalize_all(&mut correlator).unwrap();
        correlator
    }

    #[test]
    fn exported_definition_projects_one_row() {
        let correlator = graph();
        let (definitions, references) = project_rows(&correlator).unwrap();

        assert_eq!(references, vec![]);
        assert_eq!(
            definitions,
            vec![SymbolRow {
                scheme: "npm".into(),
                identifier: "pkg:f".into(),
                document_path: "src/a.ts".into(),
                start_line: 1,
                start_character: 5,
                end_line: 1,
                end_character: 12,
            }]
        );
    }

    #[test]
    fn ranges_without_monikers_project_nothing() {
        let mut correlator = Correlator::new();
        for element in [
            Element::Vertex(Vertex::MetaData {
                version: "0.4.3".into(),
            }),
            Element::Vertex(Vertex::Document {
                id: 1.into(),
                uri: "src/a.ts".into(),
            }),
            Element::Vertex(Vertex::Range {
                id: 4.into(),
                start: Position { line: 0, character: 0 },
                end: Position { line: 0, character: 1 },
            }),
            Element::Vertex(Vertex::DefinitionResult { id: 10.into() }),
            Element::Edge(Edge::Definition {
                out_v: 4.into(),
                in_v: 10.into(),
            }),
            Element::Edge(Edge::Item {
                out_v: 10.into(),
                in_vs: vec![4.into()],
                document: 1.into(),
            }),
        ] {
            correlator.insert(element);
        }
        correlator.finalize().unwrap();
        canonicalize_all(&mut correlator).unwrap();

        let (definitions, references) = project_rows(&correlator).unwrap();
        assert!(definitions.is_empty());
        assert!(references.is_empty());
    }

    #[test]
    fn duplicate_rows_collapse() {
        // Two equivalent monikers with identical (scheme, identifier)
        // would otherwise emit the same row twice.
        let correlator = graph();
        let (definitions, _) = project_rows(&correlator).unwrap();
        let mut deduped = definitions.clone();
        deduped.dedup();
        assert_eq!(definitions, deduped);
    }
}
