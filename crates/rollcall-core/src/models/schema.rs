use serde::{Deserialize, Serialize};

/// Column position of each semantic field within a sheet row.
///
/// `birthdate` and `phone` are the two required-presence columns the
/// validator checks. Optional columns that are absent from a deployment's
/// sheet read as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub serial: usize,
    pub name: usize,
    pub birthdate: usize,
    pub phone: usize,
    #[serde(default)]
    pub identifier: Option<usize>,
    #[serde(default)]
    pub gender: Option<usize>,
    #[serde(default)]
    pub district: Option<usize>,
    #[serde(default)]
    pub address: Option<usize>,
    #[serde(default)]
    pub category: Option<usize>,
}

impl ColumnMap {
    /// Number of columns a row written with this map occupies.
    pub fn width(&self) -> usize {
        [
            Some(self.serial),
            Some(self.name),
            Some(self.birthdate),
            Some(self.phone),
            self.identifier,
            self.gender,
            self.district,
            self.address,
            self.category,
        ]
        .into_iter()
        .flatten()
        .max()
        .map_or(0, |max| max + 1)
    }
}

/// Sheet layout selected once per deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RosterSchema {
    /// `연번, 성명, 생년월일, 성별, 관할동, 주소, 연락처, 보호유형`.
    /// The identifier is the serial rendered as text.
    #[default]
    Serial,
    /// `번호, ID, 성함, 연락처, 가입일` - the older layout keyed by a short
    /// opaque code. The join date stands in for the birthdate column.
    Opaque,
    /// Explicit column positions for sheets that follow neither layout.
    Custom(ColumnMap),
}

impl RosterSchema {
    pub fn columns(&self) -> ColumnMap {
        match self {
            RosterSchema::Serial => ColumnMap {
                serial: 0,
                name: 1,
                birthdate: 2,
                phone: 6,
                identifier: None,
                gender: Some(3),
                district: Some(4),
                address: Some(5),
                category: Some(7),
            },
            RosterSchema::Opaque => ColumnMap {
                serial: 0,
                name: 2,
                birthdate: 4,
                phone: 3,
                identifier: Some(1),
                gender: None,
                district: None,
                address: None,
                category: None,
            },
            RosterSchema::Custom(map) => map.clone(),
        }
    }

    /// Whether members carry a code of their own rather than their serial.
    pub fn has_identifier_column(&self) -> bool {
        self.columns().identifier.is_some()
    }
}

impl std::fmt::Display for RosterSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterSchema::Serial => write!(f, "serial"),
            RosterSchema::Opaque => write!(f, "opaque"),
            RosterSchema::Custom(map) => write!(f, "custom ({} columns)", map.width()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_widths() {
        assert_eq!(RosterSchema::Serial.columns().width(), 8);
        assert_eq!(RosterSchema::Opaque.columns().width(), 5);
    }

    #[test]
    fn test_custom_width_ignores_missing_columns() {
        let map = ColumnMap {
            serial: 0,
            name: 1,
            birthdate: 2,
            phone: 3,
            identifier: None,
            gender: None,
            district: None,
            address: None,
            category: None,
        };
        assert_eq!(map.width(), 4);
        assert!(!RosterSchema::Custom(map).has_identifier_column());
        assert!(RosterSchema::Opaque.has_identifier_column());
    }

    #[test]
    fn test_schema_serde_tagged() {
        let json = serde_json::to_string(&RosterSchema::Opaque).expect("serialize schema");
        assert_eq!(json, r#"{"kind":"opaque"}"#);

        let custom: RosterSchema = serde_json::from_str(
            r#"{"kind":"custom","serial":0,"name":1,"birthdate":2,"phone":3}"#,
        )
        .expect("parse custom schema");
        assert_eq!(custom.columns().phone, 3);
        assert_eq!(custom.columns().district, None);
    }
}
