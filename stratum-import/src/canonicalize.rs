//! Collapse alias edges so every range and result set carries its own
//! results.
//!
//! Dumps route shared results through `next` chains and stitch
//! equivalent monikers together with symmetric equivalence edges. After
//! canonicalization the chains are gone: each item's empty result slots
//! are filled from its alias target (an item's own results always win
//! over inherited ones) and its moniker list is the full equivalence
//! closure, local monikers excluded, in sorted order.

use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};
use stratum_core::errors::StructuralError;
use stratum_core::protocol::{Id, MonikerKind};

use crate::correlator::{Correlator, ResultSetData};

/// Canonicalize every range and result set in the correlator.
///
/// Items are visited in sorted id order; a shared alias target is
/// canonicalized once and merged into each of its dependents. Alias
/// cycles terminate: an item already being canonicalized contributes
/// whatever results it has accumulated so far.
pub fn canonicalize_all(correlator: &mut Correlator) -> Result<(), StructuralError> {
    let mut ids: Vec<Id> = correlator
        .range_data
        .keys()
        .chain(correlator.result_set_data.keys())
        .cloned()
        .collect();
    ids.sort();

    let mut visited = FxHashSet::default();
    for id in ids {
        canonicalize_item(correlator, &mut visited, &id)?;
    }
    Ok(())
}

fn canonicalize_item(
    correlator: &mut Correlator,
    visited: &mut FxHashSet<Id>,
    id: &Id,
) -> Result<(), StructuralError> {
    if !visited.insert(id.clone()) {
        return Ok(());
    }

    if let Some(next_id) = correlator.next_data.get(id).cloned() {
        canonicalize_item(correlator, visited, &next_id)?;

        let inherited = results_of(correlator, &next_id)
            .ok_or_else(|| StructuralError::MissingReference {
                relation: "next",
                id: next_id.clone(),
            })?
            .clone();
        let own = correlator.results_mut(id, "next")?;
        merge_results(own, &inherited);
        correlator.next_data.remove(id);
    }

    let attached = match results_of(correlator, id) {
        Some(results) if !results.monikers.is_empty() => results.monikers.clone(),
        _ => return Ok(()),
    };

    let mut closure = BTreeSet::new();
    for moniker_id in reachable_monikers(&correlator.moniker_sets, attached) {
        if correlator.moniker(&moniker_id)?.kind != MonikerKind::Local {
            closure.insert(moniker_id);
        }
    }
    correlator.results_mut(id, "next")?.monikers = closure.into_iter().collect();
    Ok(())
}

/// The full moniker-equivalence closure of `seeds`, via an iterative
/// walk over the symmetric adjacency.
pub fn reachable_monikers(
    moniker_sets: &FxHashMap<Id, FxHashSet<Id>>,
    seeds: impl IntoIterator<Item = Id>,
) -> BTreeSet<Id> {
    let mut reachable = BTreeSet::new();
    let mut stack: Vec<Id> = seeds.into_iter().collect();
    while let Some(id) = stack.pop() {
        if !reachable.insert(id.clone()) {
            continue;
        }
        if let Some(neighbors) = moniker_sets.get(&id) {
            stack.extend(neighbors.iter().cloned());
        }
    }
    reachable
}

fn results_of<'a>(correlator: &'a Correlator, id: &Id) -> Option<&'a ResultSetData> {
    correlator
        .range_data
        .get(id)
        .map(|range| &range.results)
        .or_else(|| correlator.result_set_data.get(id))
}

fn merge_results(own: &mut ResultSetData, inherited: &ResultSetData) {
    if own.definition_result.is_none() {
        own.definition_result = inherited.definition_result.clone();
    }
    if own.reference_result.is_none() {
        own.reference_result = inherited.reference_result.clone();
    }
    if own.hover_result.is_none() {
        own.hover_result = inherited.hover_result.clone();
    }
    own.monikers.extend(inherited.monikers.iter().cloned());
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::protocol::{Edge, Element, Position, Vertex};

    fn range(id: u64) -> Element {
        Element::Vertex(Vertex::Range {
            id: id.into(),
            start: Position {
                line: 0,
                character: 0,
            },
            end: Position {
                line: 0,
                character: 1,
            },
        })
    }

    fn moniker(id: u64, identifier: &str, kind: MonikerKind) -> Element {
        Element::Vertex(Vertex::Moniker {
            id: id.into(),
            scheme: "npm".into(),
            identifier: identifier.into(),
            kind,
        })
    }

    fn correlated(elements: Vec<Element>) -> Correlator {
        let mut correlator = Correlator::new();
        correlator.insert(Element::Vertex(Vertex::MetaData {
            version: "0.4.3".into(),
        }));
        for element in elements {
            correlator.insert(element);
        }
        correlator.finalize().unwrap();
        correlator
    }

    #[test]
    fn next_chain_fills_empty_slots_only() {
        let mut correlator = correlated(vec![
            range(1),
            Element::Vertex(Vertex::ResultSet { id: 2.into() }),
            Element::Edge(Edge::Next {
                out_v: 1.into(),
                in_v: 2.into(),
            }),
            Element::Edge(Edge::Hover {
                out_v: 1.into(),
                in_v: 10.into(),
            }),
            Element::Edge(Edge::Hover {
                out_v: 2.into(),
                in_v: 11.into(),
            }),
            Element::Edge(Edge::Definition {
                out_v: 2.into(),
                in_v: 12.into(),
            }),
        ]);
        canonicalize_all(&mut correlator).unwrap();

        let results = &correlator.range_data[&1.into()].results;
        // The range's own hover wins; the definition is inherited.
        assert_eq!(results.hover_result, Some(10.into()));
        assert_eq!(results.definition_result, Some(12.into()));
        assert!(correlator.next_data.is_empty());
    }

    #[test]
    fn moniker_closure_spans_equivalence_edges_and_excludes_locals() {
        let mut correlator = correlated(vec![
            range(1),
            moniker(20, "a", MonikerKind::Export),
            moniker(21, "b", MonikerKind::Import),
            moniker(22, "c", MonikerKind::Local),
            Element::Edge(Edge::Moniker {
                out_v: 1.into(),
                in_v: 20.into(),
            }),
            Element::Edge(Edge::NextMoniker {
                out_v: 20.into(),
                in_v: 21.into(),
            }),
            Element::Edge(Edge::NextMoniker {
                out_v: 21.into(),
                in_v: 22.into(),
            }),
        ]);
        canonicalize_all(&mut correlator).unwrap();

        let monikers = &correlator.range_data[&1.into()].results.monikers;
        assert_eq!(monikers, &vec![Id::from(20), Id::from(21)]);
    }

    #[test]
    fn closure_is_the_same_from_any_seed() {
        let mut sets: FxHashMap<Id, FxHashSet<Id>> = FxHashMap::default();
        for (a, b) in [(1u64, 2u64), (2, 3)] {
            sets.entry(a.into()).or_default().insert(b.into());
            sets.entry(b.into()).or_default().insert(a.into());
        }
        let expected: BTreeSet<Id> = [1u64, 2, 3].into_iter().map(Id::from).collect();
        for seed in [1u64, 2, 3] {
            assert_eq!(reachable_monikers(&sets, [Id::from(seed)]), expected);
        }
    }

    #[test]
    fn alias_cycle_terminates() {
        let mut correlator = correlated(vec![
            Element::Vertex(Vertex::ResultSet { id: 1.into() }),
            Element::Vertex(Vertex::ResultSet { id: 2.into() }),
            Element::Edge(Edge::Next {
                out_v: 1.into(),
                in_v: 2.into(),
            }),
            Element::Edge(Edge::Next {
                out_v: 2.into(),
                in_v: 1.into(),
            }),
            Element::Edge(Edge::Hover {
                out_v: 2.into(),
                in_v: 10.into(),
            }),
        ]);
        canonicalize_all(&mut correlator).unwrap();

        assert_eq!(
            correlator.result_set_data[&1.into()].hover_result,
            Some(10.into())
        );
    }

    #[test]
    fn shared_target_canonicalized_once_and_merged_into_each_dependent() {
        let mut correlator = correlated(vec![
            range(1),
            range(2),
            Element::Vertex(Vertex::ResultSet { id: 3.into() }),
            Element::Edge(Edge::Next {
                out_v: 1.into(),
                in_v: 3.into(),
            }),
            Element::Edge(Edge::Next {
                out_v: 2.into(),
                in_v: 3.into(),
            }),
            Element::Edge(Edge::References {
                out_v: 3.into(),
                in_v: 30.into(),
            }),
        ]);
        canonicalize_all(&mut correlator).unwrap();

        for id in [Id::from(1), Id::from(2)] {
            assert_eq!(
                correlator.range_data[&id].results.reference_result,
                Some(30.into())
            );
        }
    }

    #[test]
    fn dangling_next_target_is_reported() {
        let mut correlator = correlated(vec![
            range(1),
            Element::Edge(Edge::Next {
                out_v: 1.into(),
                in_v: 99.into(),
            }),
        ]);
        let err = canonicalize_all(&mut correlator).unwrap_err();
        match err {
            StructuralError::MissingReference { relation, id } => {
                assert_eq!(relation, "next");
                assert_eq!(id, Id::from(99));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
