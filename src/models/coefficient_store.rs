use std::collections::BTreeMap;

use crate::config::{SpeciesPolicy, UnknownSpecies};
use crate::error::SimError;

use super::species::SpeciesCoefficients;

/// Immutable per-run lookup of species coefficient records.
///
/// Codes are matched case-insensitively. Build the store once, then share it
/// by reference with every stand simulated in the run.
#[derive(Debug, Clone, Default)]
pub struct CoefficientStore {
    species: BTreeMap<String, SpeciesCoefficients>,
}

impl CoefficientStore {
    /// An empty store with no species.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the built-in species records.
    pub fn builtin() -> Self {
        let mut store = Self::new();
        store.insert(SpeciesCoefficients::loblolly_pine());
        store
    }

    /// Add or replace a species record. Returns the record it replaced.
    pub fn insert(&mut self, mut record: SpeciesCoefficients) -> Option<SpeciesCoefficients> {
        record.code = normalize(&record.code);
        self.species.insert(record.code.clone(), record)
    }

    /// Add every record, replacing existing codes.
    pub fn extend(&mut self, records: impl IntoIterator<Item = SpeciesCoefficients>) {
        for record in records {
            self.insert(record);
        }
    }

    /// Look up a species. Fails with `SpeciesNotFound` for unknown codes.
    pub fn resolve(&self, code: &str) -> Result<&SpeciesCoefficients, SimError> {
        self.species
            .get(&normalize(code))
            .ok_or_else(|| SimError::SpeciesNotFound(code.to_string()))
    }

    /// Look up a species, substituting the policy's fallback species when the
    /// policy allows it. The fallback itself must exist.
    pub fn resolve_with_policy(
        &self,
        code: &str,
        policy: &SpeciesPolicy,
    ) -> Result<&SpeciesCoefficients, SimError> {
        match self.resolve(code) {
            Ok(record) => Ok(record),
            Err(err) => match policy.unknown {
                UnknownSpecies::Error => Err(err),
                UnknownSpecies::Fallback => {
                    let fallback = self.resolve(&policy.fallback)?;
                    tracing::warn!(
                        species = code,
                        fallback = %fallback.code,
                        "unknown species, substituting fallback coefficients"
                    );
                    Ok(fallback)
                }
            },
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.species.contains_key(&normalize(code))
    }

    /// Species codes in sorted order.
    pub fn codes(&self) -> Vec<&str> {
        self.species.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpeciesCoefficients> {
        self.species.values()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}
