use serde::{Deserialize, Serialize};

use super::{ColumnMap, RosterSchema};

/// Placeholder written for an empty phone number, as the sheet convention has it.
pub const EMPTY_PHONE: &str = "-";

/// One roster entry.
///
/// `identifier` is what a printed card encodes. It equals the serial rendered
/// as text for serial-keyed sheets, but the matcher treats it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub serial: u64,
    pub name: String,
    pub birthdate: String,
    pub gender: String,
    pub district: String,
    pub address: String,
    pub phone: String,
    pub category: String,
    pub identifier: String,
}

/// Read a field by column index, treating missing columns as empty.
fn field(fields: &[String], index: usize) -> &str {
    fields.get(index).map(|s| s.trim()).unwrap_or("")
}

fn optional_field(fields: &[String], index: Option<usize>) -> String {
    index.map(|i| field(fields, i).to_string()).unwrap_or_default()
}

/// Parse a serial cell. Only integers strictly greater than zero qualify.
pub fn parse_serial(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|&serial| serial > 0)
}

impl User {
    /// Build a user from an already validated row.
    pub fn from_fields(fields: &[String], columns: &ColumnMap) -> Option<Self> {
        let serial = parse_serial(field(fields, columns.serial))?;

        let identifier = columns
            .identifier
            .map(|i| field(fields, i))
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| serial.to_string());

        Some(Self {
            serial,
            name: field(fields, columns.name).to_string(),
            birthdate: field(fields, columns.birthdate).to_string(),
            gender: optional_field(fields, columns.gender),
            district: optional_field(fields, columns.district),
            address: optional_field(fields, columns.address),
            phone: field(fields, columns.phone).to_string(),
            category: optional_field(fields, columns.category),
            identifier,
        })
    }

    /// Encode this member in the schema's column order for an append.
    ///
    /// `offset` is the zero-based column the target range starts at. Schema
    /// indices are absolute, so the cells left of the range are dropped.
    pub fn to_row(&self, schema: &RosterSchema, offset: usize) -> Vec<String> {
        let columns = schema.columns();
        let mut row = vec![String::new(); columns.width()];

        row[columns.serial] = self.serial.to_string();
        row[columns.name] = self.name.clone();
        row[columns.birthdate] = self.birthdate.clone();
        row[columns.phone] = self.phone.clone();

        let optional = [
            (columns.identifier, &self.identifier),
            (columns.gender, &self.gender),
            (columns.district, &self.district),
            (columns.address, &self.address),
            (columns.category, &self.category),
        ];
        for (index, value) in optional {
            if let Some(i) = index {
                row[i] = value.clone();
            }
        }
        row.into_iter().skip(offset).collect()
    }
}

/// Fields an operator supplies when registering a member. The serial and
/// identifier are assigned from the current roster snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,
    pub birthdate: String,
    pub gender: String,
    pub district: String,
    pub address: String,
    pub phone: String,
    pub category: String,
}

impl NewMember {
    pub fn into_user(self, serial: u64, identifier: String) -> User {
        let phone = if self.phone.trim().is_empty() {
            EMPTY_PHONE.to_string()
        } else {
            self.phone.trim().to_string()
        };

        User {
            serial,
            name: self.name.trim().to_string(),
            birthdate: self.birthdate.trim().to_string(),
            gender: self.gender.trim().to_string(),
            district: self.district.trim().to_string(),
            address: self.address.trim().to_string(),
            phone,
            category: self.category.trim().to_string(),
            identifier,
        }
    }
}
