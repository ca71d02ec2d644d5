//! Per-document blob assembly.
//!
//! One blob per document path, holding everything the intraposition
//! queries need: the document's ranges in source order plus the hover
//! texts, monikers, and package information those ranges reference.
//! All maps are keyed by the canonical string form of the id so the
//! encoded payload is byte-stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stratum_core::errors::StructuralError;
use stratum_core::protocol::Id;

use crate::correlator::{Correlator, MonikerData, PackageInformationData, RangeData};

/// Encoded payload of one `documents` row.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentData {
    /// Range id -> index into `ordered_ranges`.
    pub ranges: BTreeMap<String, usize>,
    /// Ranges sorted by start position, ties broken by end position
    /// then id.
    pub ordered_ranges: Vec<RangeData>,
    pub hover_results: BTreeMap<String, String>,
    pub monikers: BTreeMap<String, MonikerData>,
    pub package_information: BTreeMap<String, PackageInformationData>,
}

/// Gather the blob for one document out of the canonicalized graph.
pub fn assemble(correlator: &Correlator, document_id: &Id) -> Result<DocumentData, StructuralError> {
    let mut entries: Vec<(Id, RangeData)> = Vec::new();
    if let Some(range_ids) = correlator.contains_data.get(document_id) {
        for range_id in range_ids {
            entries.push((range_id.clone(), correlator.range(range_id)?.clone()));
        }
    }
    entries.sort_by(|(a_id, a), (b_id, b)| {
        (a.start, a.end, a_id).cmp(&(b.start, b.end, b_id))
    });

    let mut data = DocumentData::default();
    for (range_id, range) in entries {
        let key = range_id.as_key();
        if data.ranges.contains_key(&key) {
            continue;
        }

        if let Some(hover_id) = &range.results.hover_result {
            if !data.hover_results.contains_key(&hover_id.as_key()) {
                let text = correlator.hover(hover_id)?.to_owned();
                data.hover_results.insert(hover_id.as_key(), text);
            }
        }
        for moniker_id in &range.results.monikers {
            let moniker = correlator.moniker(moniker_id)?;
            if let Some(package_id) = &moniker.package_information {
                data.package_information.insert(
                    package_id.as_key(),
                    correlator.package_information(package_id)?.clone(),
                );
            }
            data.monikers.insert(moniker_id.as_key(), moniker.clone());
        }

        data.ranges.insert(key, data.ordered_ranges.len());
        data.ordered_ranges.push(range);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::protocol::{Edge, Element, MonikerKind, Position, Vertex};

    fn range_at(id: u64, line: u32, character: u32) -> Element {
        Element::Vertex(Vertex::Range {
            id: id.into(),
            start: Position { line, character },
            end: Position {
                line,
                character: character + 1,
            },
        })
    }

    fn correlated(elements: Vec<Element>) -> Correlator {
        let mut correlator = Correlator::new();
        correlator.insert(Element::Vertex(Vertex::MetaData {
            version: "0.4.3".into(),
        }));
        correlator.insert(Element::Vertex(Vertex::Document {
            id: 1.into(),
            uri: "src/a.ts".into(),
        }));
        for element in elements {
            correlator.insert(element);
        }
        correlator.finalize().unwrap();
        correlator
    }

    #[test]
    fn ranges_are_ordered_by_start_position() {
        let correlator = correlated(vec![
            range_at(10, 2, 0),
            range_at(11, 1, 5),
            range_at(12, 1, 0),
            Element::Edge(Edge::Contains {
                out_v: 1.into(),
                in_vs: vec![10.into(), 11.into(), 12.into()],
            }),
        ]);
        let data = assemble(&correlator, &1.into()).unwrap();

        let starts: Vec<(u32, u32)> = data
            .ordered_ranges
            .iter()
            .map(|r| (r.start.line, r.start.character))
            .collect();
        assert_eq!(starts, vec![(1, 0), (1, 5), (2, 0)]);
        assert_eq!(data.ranges[&Id::from(12).as_key()], 0);
        assert_eq!(data.ranges[&Id::from(10).as_key()], 2);
    }

    #[test]
    fn document_without_contains_edge_is_empty() {
        let correlator = correlated(vec![]);
        let data = assemble(&correlator, &1.into()).unwrap();
        assert!(data.ordered_ranges.is_empty());
        assert!(data.ranges.is_empty());
    }

    #[test]
    fn referenced_monikers_and_packages_are_embedded() {
        let mut correlator = correlated(vec![
            range_at(10, 0, 0),
            Element::Edge(Edge::Contains {
                out_v: 1.into(),
                in_vs: vec![10.into()],
            }),
            Element::Vertex(Vertex::Moniker {
                id: 20.into(),
                scheme: "npm".into(),
                identifier: "p:f".into(),
                kind: MonikerKind::Export,
            }),
            Element::Vertex(Vertex::PackageInformation {
                id: 30.into(),
                name: "p".into(),
                version: Some("1.0.0".into()),
            }),
            Element::Edge(Edge::Moniker {
                out_v: 10.into(),
                in_v: 20.into(),
            }),
            Element::Edge(Edge::PackageInformation {
                out_v: 20.into(),
                in_v: 30.into(),
            }),
        ]);
        crate::canonicalize::canonicalize_all(&mut correlator).unwrap();
        let data = assemble(&correlator, &1.into()).unwrap();

        assert_eq!(data.monikers[&Id::from(20).as_key()].identifier, "p:f");
        assert_eq!(
            data.package_information[&Id::from(30).as_key()].name,
            "p"
        );
    }

    #[test]
    fn dangling_contains_target_is_reported() {
        let correlator = correlated(vec![Element::Edge(Edge::Contains {
            out_v: 1.into(),
            in_vs: vec![99.into()],
        })]);
        let err = assemble(&correlator, &1.into()).unwrap_err();
        match err {
            StructuralError::MissingReference { relation, .. } => assert_eq!(relation, "range"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
