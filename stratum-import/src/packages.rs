//! Package manifest extraction for the cross-repository index.
//!
//! Exported monikers tell us which packages this commit provides;
//! imported monikers tell us which remote packages (and which symbols
//! within them) it consumes. Both kinds must carry package information
//! or the upload is structurally invalid.

use std::collections::{BTreeMap, BTreeSet};

use stratum_core::errors::StructuralError;
use stratum_core::protocol::Id;

use crate::correlator::Correlator;

/// Identity of a package in the cross-repository index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Package {
    pub scheme: String,
    pub name: String,
    pub version: Option<String>,
}

fn package_of(correlator: &Correlator, moniker_id: &Id, kind: &'static str) -> Result<Package, StructuralError> {
    let moniker = correlator.moniker(moniker_id)?;
    let package_id = moniker.package_information.as_ref().ok_or_else(|| {
        StructuralError::MissingPackageInformation {
            moniker_id: moniker_id.clone(),
            kind,
        }
    })?;
    let package = correlator.package_information(package_id)?;
    Ok(Package {
        scheme: moniker.scheme.clone(),
        name: package.name.clone(),
        version: package.version.clone(),
    })
}

/// The deduplicated, sorted set of packages this dump provides.
pub fn extract_packages(correlator: &Correlator) -> Result<Vec<Package>, StructuralError> {
    let mut packages = BTreeSet::new();
    for moniker_id in &correlator.exported_monikers {
        packages.insert(package_of(correlator, moniker_id, "export")?);
    }
    Ok(packages.into_iter().collect())
}

/// Imported symbol identifiers grouped by the remote package providing
/// them.
pub fn extract_references(
    correlator: &Correlator,
) -> Result<BTreeMap<Package, BTreeSet<String>>, StructuralError> {
    let mut references: BTreeMap<Package, BTreeSet<String>> = BTreeMap::new();
    for moniker_id in &correlator.imported_monikers {
        let package = package_of(correlator, moniker_id, "import")?;
        let moniker = correlator.moniker(moniker_id)?;
        references
            .entry(package)
            .or_default()
            .insert(moniker.identifier.clone());
    }
    Ok(references)
}
