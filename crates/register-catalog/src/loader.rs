use crate::{ConfigurationError, RegisterRecord};
use core::fmt;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// A record together with the source it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedRecord {
    pub name: String,
    pub record: RegisterRecord,
    pub origin: String,
}

pub(crate) fn is_declarative(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json") | Some("yaml") | Some("yml")
    )
}

/// Top-level entries of a document in source order, repeated names included.
struct Entries(Vec<(String, serde_json::Value)>);

impl<'de> Deserialize<'de> for Entries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = Entries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of register names to definitions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Entries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

fn parse_document(path: &Path, raw: &str) -> Result<Entries, String> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(raw).map_err(|e| format!("parsing json: {e}")),
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(raw).map_err(|e| format!("parsing yaml: {e}"))
        }
        _ => Err("unsupported file type (expected .json, .yaml or .yml)".to_string()),
    }
}

/// Read every register entry of one declarative file.
///
/// A file that cannot be read or parsed yields a single `Source` error. Inside a
/// readable file each malformed entry yields its own error and is skipped. A name
/// repeated within the file keeps its first entry; each later one is a `Duplicate`.
pub fn load_records_file(path: impl AsRef<Path>) -> (Vec<SourcedRecord>, Vec<ConfigurationError>) {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            return (
                Vec::new(),
                vec![ConfigurationError::unreadable(origin, format!("reading: {e}"))],
            )
        }
    };
    let doc = match parse_document(path, &raw) {
        Ok(doc) => doc,
        Err(reason) => return (Vec::new(), vec![ConfigurationError::unreadable(origin, reason)]),
    };

    let mut records = Vec::with_capacity(doc.0.len());
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for (name, value) in doc.0 {
        if seen.contains(&name) {
            errors.push(ConfigurationError::Duplicate {
                register: name,
                first: origin.clone(),
            });
            continue;
        }
        match serde_json::from_value::<RegisterRecord>(value) {
            Ok(record) => {
                seen.insert(name.clone());
                records.push(SourcedRecord {
                    name,
                    record,
                    origin: origin.clone(),
                });
            }
            Err(e) => errors.push(ConfigurationError::Malformed {
                register: name,
                reason: e.to_string(),
            }),
        }
    }
    (records, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawAddress;
    use std::path::PathBuf;

    fn fixture(rel: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(rel)
    }

    #[test]
    fn reads_json_entries() {
        let (records, errors) = load_records_file(fixture("partial/registers.json"));
        assert!(errors.is_empty());
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.origin.ends_with("registers.json")));
    }

    #[test]
    fn reads_yaml_entries() {
        let (records, errors) = load_records_file(fixture("mixed/sensors.yaml"));
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn broken_file_is_one_error() {
        let (records, errors) = load_records_file(fixture("mixed/broken.json"));
        assert!(records.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ConfigurationError::Source { .. }));
    }

    #[test]
    fn missing_file_is_one_error() {
        let (records, errors) = load_records_file(fixture("does-not-exist.json"));
        assert!(records.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn entry_of_wrong_shape_is_skipped() {
        let (records, errors) = load_records_file(fixture("mixed/levels.yml"));
        assert_eq!(records.len(), 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].register(), Some("BAD_SHAPE"));
    }

    #[test]
    fn repeated_name_in_json_keeps_first() {
        let (records, errors) = load_records_file(fixture("repeated/registers.json"));
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["HAND_ID", "SAVE"]);
        assert_eq!(records[0].record.address, Some(RawAddress::Single(1000)));
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ConfigurationError::Duplicate { register, first }
                if register == "HAND_ID" && first.ends_with("registers.json")
        ));
    }

    #[test]
    fn repeated_name_in_yaml_keeps_first() {
        let (records, errors) = load_records_file(fixture("repeated/registers.yaml"));
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["LEVEL", "TEMP"]);
        assert_eq!(records[0].record.address, Some(RawAddress::Single(1200)));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].register(), Some("LEVEL"));
        assert!(matches!(errors[0], ConfigurationError::Duplicate { .. }));
    }

    #[test]
    fn malformed_first_entry_does_not_claim_name() {
        let (records, errors) = load_records_file(fixture("repeated/shadowed.yml"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record.address, Some(RawAddress::Single(7)));
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ConfigurationError::Malformed { .. }));
    }

    #[test]
    fn declarative_extensions() {
        assert!(is_declarative(Path::new("a.json")));
        assert!(is_declarative(Path::new("a.yml")));
        assert!(!is_declarative(Path::new("notes.txt")));
        assert!(!is_declarative(Path::new("Makefile")));
    }
}
