/// Control characters removed from a line before it is tokenized.
const STRIPPED_CHARS: [char; 3] = ['\r', '\n', '\t'];

const DELIMITER: char = ',';
const QUOTE: char = '"';

/// Split one exported line into trimmed fields.
///
/// A double quote toggles quoted mode, and commas inside quotes are kept as
/// content. A doubled quote inside a quoted field is a literal quote. An
/// unbalanced quote leaves the rest of the line quoted. Never fails, and
/// always yields at least one field.
pub fn parse_line(raw_line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    let mut chars = raw_line
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .peekable();

    while let Some(c) = chars.next() {
        match c {
            QUOTE if in_quotes && chars.peek() == Some(&QUOTE) => {
                current.push(QUOTE);
                chars.next();
            }
            QUOTE => in_quotes = !in_quotes,
            DELIMITER if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_fields_are_trimmed() {
        assert_eq!(parse_line("1, 김철수 ,450101"), vec!["1", "김철수", "450101"]);
    }

    #[test]
    fn test_quoted_comma_is_content() {
        let fields = parse_line(r#"7,홍길동,"서울시 양천구, 신월동 12",010-1111-2222"#);
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[2], "서울시 양천구, 신월동 12");
    }

    #[test]
    fn test_empty_line_yields_one_empty_field() {
        assert_eq!(parse_line(""), vec![""]);
        assert_eq!(parse_line("\r\n"), vec![""]);
    }

    #[test]
    fn test_blank_separator_row() {
        assert_eq!(parse_line(",,, "), vec!["", "", "", ""]);
    }

    #[test]
    fn test_control_characters_are_stripped() {
        assert_eq!(parse_line("1,\t이름\t,x\r"), vec!["1", "이름", "x"]);
    }

    #[test]
    fn test_doubled_quote_is_literal() {
        assert_eq!(parse_line(r#"a,"say ""hi""",b"#), vec!["a", r#"say "hi""#, "b"]);
        assert_eq!(parse_line(r#"a,"",b"#), vec!["a", "", "b"]);
    }

    #[test]
    fn test_unbalanced_quote_swallows_rest_of_line() {
        assert_eq!(parse_line(r#"1,"open,still open,end"#), vec!["1", "open,still open,end"]);
    }
}
