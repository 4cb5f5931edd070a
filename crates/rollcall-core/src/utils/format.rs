/// Mask the middle digits of a phone number for display.
/// 11 digits become `010-****-5678` and 10 digits `031-***-4567`.
/// Anything else is returned unchanged.
pub fn mask_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        11 => format!("{}-****-{}", &digits[0..3], &digits[7..11]),
        10 => format!("{}-***-{}", &digits[0..3], &digits[6..10]),
        _ if phone.trim().is_empty() => "-".to_string(),
        _ => phone.to_string(),
    }
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Case-insensitive substring check
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
