use tracing::debug;

use crate::models::user::parse_serial;
use crate::models::ColumnMap;

/// Minimum trimmed length of the name column, in characters.
const MIN_NAME_CHARS: usize = 2;

/// Minimum length of the birthdate-equivalent column.
const MIN_BIRTHDATE_CHARS: usize = 4;

/// Minimum length of the phone column. Shorter values are in-progress edits.
const MIN_PHONE_CHARS: usize = 7;

/// Lower-cased labels used for the name and serial column headers. A row whose
/// name cell is one of these is a header copied into the data range.
const HEADER_LABELS: &[&str] = &[
    "이름", "성명", "성함", "회원명", "연번", "번호", "순번", "name", "no", "no.", "serial", "id",
];

/// Why a row was skipped. Rejections are expected and only ever logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRejection {
    Serial,
    Name,
    Birthdate,
    Phone,
    HeaderRow,
}

/// Gate between raw sheet rows and everything downstream.
#[derive(Debug, Clone)]
pub struct RowValidator {
    columns: ColumnMap,
}

fn char_len(fields: &[String], index: usize) -> usize {
    fields
        .get(index)
        .map(|s| s.trim().chars().count())
        .unwrap_or(0)
}

impl RowValidator {
    pub fn new(columns: ColumnMap) -> Self {
        Self { columns }
    }

    pub fn is_genuine_row(&self, fields: &[String]) -> bool {
        match self.check(fields) {
            Ok(()) => true,
            Err(reason) => {
                debug!(?reason, first = ?fields.first(), "Skipping roster row");
                false
            }
        }
    }

    pub fn check(&self, fields: &[String]) -> Result<(), RowRejection> {
        let serial = fields.get(self.columns.serial).map(String::as_str).unwrap_or("");
        if parse_serial(serial).is_none() {
            return Err(RowRejection::Serial);
        }
        if char_len(fields, self.columns.name) < MIN_NAME_CHARS {
            return Err(RowRejection::Name);
        }
        if char_len(fields, self.columns.birthdate) < MIN_BIRTHDATE_CHARS {
            return Err(RowRejection::Birthdate);
        }
        if char_len(fields, self.columns.phone) < MIN_PHONE_CHARS {
            return Err(RowRejection::Phone);
        }

        let name = fields[self.columns.name].trim().to_lowercase();
        if HEADER_LABELS.contains(&name.as_str()) {
            return Err(RowRejection::HeaderRow);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RosterSchema;

    fn compact() -> RowValidator {
        RowValidator::new(ColumnMap {
            serial: 0,
            name: 1,
            birthdate: 2,
            phone: 3,
            identifier: None,
            gender: None,
            district: None,
            address: None,
            category: None,
        })
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_accepts_well_formed_row() {
        assert!(compact().is_genuine_row(&row(&["1", "김철수", "450101", "010-1111-2222"])));
    }

    #[test]
    fn test_rejects_each_failed_predicate() {
        let v = compact();
        assert_eq!(v.check(&row(&["0", "김철수", "450101", "010-1111-2222"])), Err(RowRejection::Serial));
        assert_eq!(v.check(&row(&["x", "김철수", "450101", "010-1111-2222"])), Err(RowRejection::Serial));
        assert_eq!(v.check(&row(&["1", "김", "450101", "010-1111-2222"])), Err(RowRejection::Name));
        assert_eq!(v.check(&row(&["1", "김철수", "45", "010-1111-2222"])), Err(RowRejection::Birthdate));
        assert_eq!(v.check(&row(&["1", "김철수", "450101", "010"])), Err(RowRejection::Phone));
    }

    #[test]
    fn test_rejects_header_label_even_when_other_fields_look_valid() {
        let v = compact();
        assert_eq!(v.check(&row(&["1", "이름", "450101", "010-1111-2222"])), Err(RowRejection::HeaderRow));
        assert_eq!(v.check(&row(&["1", "Name", "450101", "010-1111-2222"])), Err(RowRejection::HeaderRow));
    }

    #[test]
    fn test_short_rows_are_rejected_not_panicking() {
        let v = RowValidator::new(RosterSchema::Serial.columns());
        assert!(!v.is_genuine_row(&row(&["1", "김철수"])));
        assert!(!v.is_genuine_row(&row(&[""])));
    }

    #[test]
    fn test_lengths_count_characters_not_bytes() {
        // Two Hangul syllables are six bytes but two characters.
        assert!(compact().is_genuine_row(&row(&["2", "이산", "1950", "0101234567"])));
    }
}
