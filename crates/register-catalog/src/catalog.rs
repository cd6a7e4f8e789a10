use crate::{ConfigurationError, RegisterDefinition, SourcedRecord};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Name -> definition mapping for one device session. Read-only once built.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct RegisterCatalog {
    registers: BTreeMap<String, RegisterDefinition>,
}

impl RegisterCatalog {
    /// Build from definitions already in memory. Later duplicates are rejected.
    pub fn from_definitions(
        defs: impl IntoIterator<Item = RegisterDefinition>,
    ) -> (Self, Vec<ConfigurationError>) {
        let mut catalog = Self::default();
        let mut errors = Vec::new();
        for def in defs {
            if catalog.registers.contains_key(&def.name) {
                errors.push(ConfigurationError::Duplicate {
                    register: def.name,
                    first: "memory".to_string(),
                });
                continue;
            }
            catalog.registers.insert(def.name.clone(), def);
        }
        (catalog, errors)
    }

    pub fn get(&self, name: &str) -> Option<&RegisterDefinition> {
        self.registers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Register names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registers.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisterDefinition> {
        self.registers.values()
    }
}

/// Turn sourced records into a catalog, skipping (and reporting) every bad entry.
pub fn build_catalog(
    records: impl IntoIterator<Item = SourcedRecord>,
) -> (RegisterCatalog, Vec<ConfigurationError>) {
    let mut catalog = RegisterCatalog::default();
    let mut origins: BTreeMap<String, String> = BTreeMap::new();
    let mut errors = Vec::new();

    for sourced in records {
        if let Some(first) = origins.get(&sourced.name) {
            let err = ConfigurationError::Duplicate {
                register: sourced.name.clone(),
                first: first.clone(),
            };
            warn!(register = %sourced.name, origin = %sourced.origin, "skipping register: {err}");
            errors.push(err);
            continue;
        }
        match RegisterDefinition::from_record(&sourced.name, &sourced.record) {
            Ok(def) => {
                debug!(register = %def.name, address = %def.address, "register loaded");
                origins.insert(sourced.name, sourced.origin);
                catalog.registers.insert(def.name.clone(), def);
            }
            Err(err) => {
                warn!(register = %sourced.name, origin = %sourced.origin, "skipping register: {err}");
                errors.push(err);
            }
        }
    }
    (catalog, errors)
}
