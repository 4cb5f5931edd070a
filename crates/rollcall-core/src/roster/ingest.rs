use tracing::{debug, info};

use crate::models::{ColumnMap, RosterSchema, User};

use super::{dedupe_and_order, parse_line, RowValidator};

/// Parse -> validate -> dedupe, configured for one roster schema.
#[derive(Debug, Clone)]
pub struct RosterPipeline {
    columns: ColumnMap,
    validator: RowValidator,
}

impl RosterPipeline {
    pub fn new(schema: &RosterSchema) -> Self {
        let columns = schema.columns();
        Self {
            validator: RowValidator::new(columns.clone()),
            columns,
        }
    }

    /// Ingest a delimited-text export body, one record per line.
    pub fn from_export(&self, body: &str) -> Vec<User> {
        self.collect(body.lines().map(parse_line))
    }

    /// Ingest rows from the structured values API.
    ///
    /// `offset` is the zero-based column the requested range starts at, so
    /// row cells are shifted right to line up with the schema's column map.
    pub fn from_values(&self, rows: Vec<Vec<String>>, offset: usize) -> Vec<User> {
        self.collect(rows.into_iter().map(|row| {
            let mut aligned = vec![String::new(); offset];
            aligned.extend(row.into_iter().map(|cell| cell.trim().to_string()));
            aligned
        }))
    }

    fn collect(&self, records: impl Iterator<Item = Vec<String>>) -> Vec<User> {
        let mut total = 0usize;
        let mut accepted = Vec::new();

        for fields in records {
            total += 1;
            if !self.validator.is_genuine_row(&fields) {
                continue;
            }
            if let Some(user) = User::from_fields(&fields, &self.columns) {
                accepted.push(user);
            }
        }

        let rejected = total - accepted.len();
        let users = dedupe_and_order(accepted);
        debug!(total, rejected, "Roster rows processed");
        info!(members = users.len(), "Roster ingested");
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewMember;

    fn compact_schema() -> RosterSchema {
        RosterSchema::Custom(ColumnMap {
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

    #[test]
    fn test_export_skips_header_blank_and_duplicate_rows() {
        let body = "연번,이름,생년월일,전화\n\
                    1,김철수,450101,010-1111-2222\n\
                    ,,, \n\
                    1,가짜중복,450101,010-9999-9999\n";

        let users = RosterPipeline::new(&compact_schema()).from_export(body);

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].serial, 1);
        assert_eq!(users[0].name, "김철수");
        assert_eq!(users[0].identifier, "1");
    }

    #[test]
    fn test_export_handles_crlf_and_quoted_address() {
        let body = "연번,성명,생년월일,성별,관할동,주소,연락처,보호유형\r\n\
                    2,이영자,1947-05-05,여,신월3동,\"양천구 신월로 1, 101호\",010-3333-4444,차상위\r\n\
                    5,박정호,1952-11-30,남,신정4동,양천구 중앙로 9,010-5555-6666,기초수급\r\n";

        let users = RosterPipeline::new(&RosterSchema::Serial).from_export(body);

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].serial, 5);
        assert_eq!(users[1].address, "양천구 신월로 1, 101호");
        assert_eq!(users[1].category, "차상위");
    }

    #[test]
    fn test_values_rows_are_offset_by_range_start() {
        // Range "Sheet1!B:E" drops column A, so every cell shifts one left.
        let schema = RosterSchema::Custom(ColumnMap {
            serial: 1,
            name: 2,
            birthdate: 3,
            phone: 4,
            identifier: None,
            gender: None,
            district: None,
            address: None,
            category: None,
        });
        let rows = vec![
            vec!["연번".into(), "이름".into(), "생년월일".into(), "전화".into()],
            vec!["4".into(), " 최순옥 ".into(), "1949".into(), "010-7777-8888".into()],
            vec![],
        ];

        let users = RosterPipeline::new(&schema).from_values(rows, 1);

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].serial, 4);
        assert_eq!(users[0].name, "최순옥");
    }

    #[test]
    fn test_appended_row_reads_back_through_offset_range() {
        // Range "Sheet1!B:E": the write drops column A, the read pads it back.
        let schema = RosterSchema::Custom(ColumnMap {
            serial: 1,
            name: 2,
            birthdate: 3,
            phone: 4,
            identifier: None,
            gender: None,
            district: None,
            address: None,
            category: None,
        });
        let added = NewMember {
            name: "최순옥".to_string(),
            birthdate: "1949-01-01".to_string(),
            phone: "010-7777-8888".to_string(),
            ..Default::default()
        }
        .into_user(4, "4".to_string());

        let written = added.to_row(&schema, 1);
        let users = RosterPipeline::new(&schema).from_values(vec![written], 1);

        assert_eq!(users, vec![added]);
    }

    #[test]
    fn test_empty_body_yields_empty_roster() {
        assert!(RosterPipeline::new(&RosterSchema::Serial).from_export("").is_empty());
    }
}
