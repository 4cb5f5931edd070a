//! Bulk registration from a header-labelled CSV file.
//!
//! Columns are located by their header text, so the file's column order
//! doesn't need to match the roster schema.

use tracing::debug;

use crate::models::NewMember;

use super::parse_line;

const BYTE_ORDER_MARK: char = '\u{feff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImportField {
    Name,
    Birthdate,
    Gender,
    District,
    Address,
    Phone,
    Category,
}

fn field_for_label(label: &str) -> Option<ImportField> {
    match label.trim().to_lowercase().as_str() {
        "성함" | "이름" | "성명" | "name" => Some(ImportField::Name),
        "생년월일" | "birthdate" | "birthday" => Some(ImportField::Birthdate),
        "성별" | "gender" => Some(ImportField::Gender),
        "관할동" | "district" => Some(ImportField::District),
        "주소" | "address" => Some(ImportField::Address),
        "연락처" | "전화번호" | "전화" | "phone" => Some(ImportField::Phone),
        "보호유형" | "category" => Some(ImportField::Category),
        _ => None,
    }
}

/// Read new members from CSV text whose first non-blank line is a header.
/// Rows without a name are skipped.
pub fn members_from_csv(text: &str) -> Vec<NewMember> {
    // Spreadsheet "CSV UTF-8" exports start with a byte order mark
    let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header: Vec<Option<ImportField>> = match lines.next() {
        Some(line) => parse_line(line).iter().map(|l| field_for_label(l)).collect(),
        None => return Vec::new(),
    };

    let mut members = Vec::new();
    for line in lines {
        let mut member = NewMember::default();
        for (field, value) in header.iter().zip(parse_line(line)) {
            let slot = match field {
                Some(ImportField::Name) => &mut member.name,
                Some(ImportField::Birthdate) => &mut member.birthdate,
                Some(ImportField::Gender) => &mut member.gender,
                Some(ImportField::District) => &mut member.district,
                Some(ImportField::Address) => &mut member.address,
                Some(ImportField::Phone) => &mut member.phone,
                Some(ImportField::Category) => &mut member.category,
                None => continue,
            };
            *slot = value;
        }

        if member.name.is_empty() {
            debug!(line, "Skipping import row without a name");
            continue;
        }
        members.push(member);
    }
    members
}
