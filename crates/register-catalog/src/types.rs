use crate::ConfigurationError;
use core::fmt;
use serde::{Deserialize, Serialize};
use word_transport::{Word, WordSpan, MAX_WORDS_PER_READ};

/// Where a register lives in the device's word space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
    Single(Word),
    Range { start: Word, end: Word },
}

impl Address {
    pub fn start(&self) -> Word {
        match *self {
            Address::Single(offset) => offset,
            Address::Range { start, .. } => start,
        }
    }

    /// Words covered by the address; zero for an inverted range.
    pub fn word_count(&self) -> u32 {
        match *self {
            Address::Single(_) => 1,
            Address::Range { start, end } if end >= start => {
                u32::from(end) - u32::from(start) + 1
            }
            Address::Range { .. } => 0,
        }
    }

    /// The span a single read request must cover, if the address is readable in one go.
    pub fn span(&self) -> Option<WordSpan> {
        match *self {
            Address::Single(offset) => WordSpan::new(offset, 1),
            Address::Range { start, end } => WordSpan::inclusive(start, end),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Single(offset) => write!(f, "{offset}"),
            Address::Range { start, end } => write!(f, "{start}-{end}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Uint8,
    Short,
    /// Untyped run of words, handed to the caller as-is.
    Raw,
}

impl DataType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "uint8" => Some(DataType::Uint8),
            "short" => Some(DataType::Short),
            "raw" => Some(DataType::Raw),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Uint8 => "uint8",
            DataType::Short => "short",
            DataType::Raw => "raw",
        }
    }

    /// Number of protocol words the type occupies; `None` when any length is allowed.
    pub fn word_count(self) -> Option<u32> {
        match self {
            DataType::Uint8 => Some(1),
            DataType::Short => Some(2),
            DataType::Raw => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessType {
    ReadOnly,
    ReadWrite,
}

impl AccessType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "read-only" => Some(AccessType::ReadOnly),
            "read-write" => Some(AccessType::ReadWrite),
            _ => None,
        }
    }

    pub fn is_writable(self) -> bool {
        self == AccessType::ReadWrite
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessType::ReadOnly => "read-only",
            AccessType::ReadWrite => "read-write",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeType {
    Continuous,
    Discrete,
}

impl RangeType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "continuous" => Some(RangeType::Continuous),
            "discrete" => Some(RangeType::Discrete),
            _ => None,
        }
    }
}

/// Inclusive bound in semantic units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: i64,
    pub max: i64,
}

impl ValueRange {
    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// One resolved register. Built once when the catalog loads, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDefinition {
    pub name: String,
    pub address: Address,
    pub data_type: DataType,
    pub access_type: AccessType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_range: Option<ValueRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_type: Option<RangeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<i64>,
    #[serde(default)]
    pub is_persistent: bool,
    #[serde(default)]
    pub description: String,
}

/// Address as written in a declarative source: `1000` or `[1032, 1033]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAddress {
    Single(i64),
    Range(Vec<i64>),
}

/// A register entry exactly as a source declares it, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRecord {
    #[serde(default)]
    pub address: Option<RawAddress>,
    #[serde(default)]
    pub value_range: Option<Vec<i64>>,
    #[serde(default)]
    pub range_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub access_type: Option<String>,
    #[serde(default)]
    pub default_value: Option<i64>,
    #[serde(default)]
    pub is_persistent: Option<bool>,
}

fn to_word(v: i64) -> Option<Word> {
    Word::try_from(v).ok()
}

impl RegisterDefinition {
    /// Validate a declarative record into a definition.
    ///
    /// Only structural checks run here; nothing talks to a device.
    pub fn from_record(name: &str, record: &RegisterRecord) -> Result<Self, ConfigurationError> {
        let missing = |field| ConfigurationError::MissingField {
            register: name.to_string(),
            field,
        };
        let invalid = |field, reason: String| ConfigurationError::InvalidField {
            register: name.to_string(),
            field,
            reason,
        };

        let raw_address = record.address.as_ref().ok_or_else(|| missing("address"))?;
        let raw_type = record
            .data_type
            .as_deref()
            .ok_or_else(|| missing("data_type"))?;
        let raw_access = record
            .access_type
            .as_deref()
            .ok_or_else(|| missing("access_type"))?;

        let address = match raw_address {
            RawAddress::Single(v) => Address::Single(
                to_word(*v).ok_or_else(|| invalid("address", format!("{v} is not a word offset")))?,
            ),
            RawAddress::Range(parts) => match parts.as_slice() {
                [start, end] => {
                    let s = to_word(*start).ok_or_else(|| {
                        invalid("address", format!("{start} is not a word offset"))
                    })?;
                    let e = to_word(*end)
                        .ok_or_else(|| invalid("address", format!("{end} is not a word offset")))?;
                    if e < s {
                        return Err(invalid("address", format!("range end {e} is before start {s}")));
                    }
                    Address::Range { start: s, end: e }
                }
                other => {
                    return Err(invalid(
                        "address",
                        format!("expected an offset or [start, end], got {} values", other.len()),
                    ))
                }
            },
        };
        if address.span().is_none() {
            return Err(invalid(
                "address",
                format!("{address} exceeds {MAX_WORDS_PER_READ} words per read"),
            ));
        }

        let data_type = DataType::parse(raw_type)
            .ok_or_else(|| invalid("data_type", format!("unknown data type `{raw_type}`")))?;
        if let Some(expected) = data_type.word_count() {
            let actual = address.word_count();
            if actual != expected {
                return Err(invalid(
                    "address",
                    format!("{data_type} needs {expected} word(s), {address} covers {actual}"),
                ));
            }
        }

        let access_type = AccessType::parse(raw_access)
            .ok_or_else(|| invalid("access_type", format!("unknown access type `{raw_access}`")))?;

        let range_type = match record.range_type.as_deref() {
            None => None,
            Some(s) => Some(
                RangeType::parse(s)
                    .ok_or_else(|| invalid("range_type", format!("unknown range type `{s}`")))?,
            ),
        };

        let value_range = match record.value_range.as_deref() {
            None => None,
            Some([min, max]) => {
                if min > max {
                    return Err(invalid("value_range", format!("min {min} exceeds max {max}")));
                }
                Some(ValueRange {
                    min: *min,
                    max: *max,
                })
            }
            Some(other) => {
                return Err(invalid(
                    "value_range",
                    format!("expected [min, max], got {} values", other.len()),
                ))
            }
        };

        if let (Some(default), Some(range)) = (record.default_value, value_range) {
            if !range.contains(default) {
                return Err(invalid(
                    "default_value",
                    format!("{default} outside [{}, {}]", range.min, range.max),
                ));
            }
        }

        Ok(Self {
            name: name.to_string(),
            address,
            data_type,
            access_type,
            value_range,
            range_type,
            default_value: record.default_value,
            is_persistent: record.is_persistent.unwrap_or(false),
            description: record.description.clone().unwrap_or_default(),
        })
    }

    pub fn is_writable(&self) -> bool {
        self.access_type.is_writable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(address: RawAddress, data_type: &str) -> RegisterRecord {
        RegisterRecord {
            address: Some(address),
            data_type: Some(data_type.to_string()),
            access_type: Some("read-write".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn single_uint8() {
        let mut rec = record(RawAddress::Single(1000), "uint8");
        rec.value_range = Some(vec![1, 254]);
        rec.default_value = Some(1);
        rec.is_persistent = Some(true);
        rec.range_type = Some("continuous".into());
        let def = RegisterDefinition::from_record("HAND_ID", &rec).unwrap();
        assert_eq!(def.address, Address::Single(1000));
        assert_eq!(def.value_range, Some(ValueRange { min: 1, max: 254 }));
        assert_eq!(def.range_type, Some(RangeType::Continuous));
        assert!(def.is_persistent);
        assert!(def.is_writable());
    }

    #[test]
    fn short_range() {
        let rec = record(RawAddress::Range(vec![1474, 1475]), "short");
        let def = RegisterDefinition::from_record("POS_SET(0)", &rec).unwrap();
        assert_eq!(def.address, Address::Range { start: 1474, end: 1475 });
        assert_eq!(def.address.word_count(), 2);
        assert_eq!(def.address.to_string(), "1474-1475");
        assert!(!def.is_persistent);
        assert_eq!(def.description, "");
    }

    #[test]
    fn missing_fields_are_named() {
        let mut rec = record(RawAddress::Single(1), "uint8");
        rec.address = None;
        assert_eq!(
            RegisterDefinition::from_record("X", &rec),
            Err(ConfigurationError::MissingField {
                register: "X".into(),
                field: "address"
            })
        );
        let mut rec = record(RawAddress::Single(1), "uint8");
        rec.access_type = None;
        assert!(matches!(
            RegisterDefinition::from_record("X", &rec),
            Err(ConfigurationError::MissingField { field: "access_type", .. })
        ));
    }

    #[test]
    fn rejects_inverted_range() {
        let rec = record(RawAddress::Range(vec![20, 10]), "raw");
        assert!(matches!(
            RegisterDefinition::from_record("X", &rec),
            Err(ConfigurationError::InvalidField { field: "address", .. })
        ));
    }

    #[test]
    fn rejects_word_count_mismatch() {
        let rec = record(RawAddress::Single(1032), "short");
        assert!(matches!(
            RegisterDefinition::from_record("X", &rec),
            Err(ConfigurationError::InvalidField { field: "address", .. })
        ));
        let rec = record(RawAddress::Range(vec![10, 12]), "uint8");
        assert!(RegisterDefinition::from_record("X", &rec).is_err());
        let rec = record(RawAddress::Range(vec![10, 12]), "raw");
        assert!(RegisterDefinition::from_record("X", &rec).is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let rec = record(RawAddress::Single(70_000), "uint8");
        assert!(RegisterDefinition::from_record("X", &rec).is_err());

        let rec = record(RawAddress::Single(1), "float128");
        assert!(matches!(
            RegisterDefinition::from_record("X", &rec),
            Err(ConfigurationError::InvalidField { field: "data_type", .. })
        ));

        let mut rec = record(RawAddress::Single(1), "uint8");
        rec.value_range = Some(vec![10, 1]);
        assert!(matches!(
            RegisterDefinition::from_record("X", &rec),
            Err(ConfigurationError::InvalidField { field: "value_range", .. })
        ));

        let mut rec = record(RawAddress::Single(1), "uint8");
        rec.value_range = Some(vec![0, 1]);
        rec.default_value = Some(3);
        assert!(matches!(
            RegisterDefinition::from_record("X", &rec),
            Err(ConfigurationError::InvalidField { field: "default_value", .. })
        ));

        let mut rec = record(RawAddress::Single(1), "uint8");
        rec.access_type = Some("write-only".into());
        assert!(RegisterDefinition::from_record("X", &rec).is_err());
    }

    #[test]
    fn raw_address_forms_deserialize() {
        let rec: RegisterRecord =
            serde_json::from_str(r#"{"address": [1032, 1033], "data_type": "short"}"#).unwrap();
        assert_eq!(rec.address, Some(RawAddress::Range(vec![1032, 1033])));
        let rec: RegisterRecord = serde_yaml::from_str("address: 1000\nvalue_range: null\n").unwrap();
        assert_eq!(rec.address, Some(RawAddress::Single(1000)));
        assert_eq!(rec.value_range, None);
    }
}
