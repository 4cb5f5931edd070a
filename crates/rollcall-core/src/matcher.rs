//! Resolve a scanned or typed token to a roster entry.
//!
//! Rules are tried in order and the first rule with any hit wins. Within a
//! rule, the earliest entry in roster order is returned.

use crate::models::User;

/// The rule that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Identifier,
    IdentifierIgnoreCase,
    Serial,
    PhoneContains,
}

const RULES: [MatchRule; 4] = [
    MatchRule::Identifier,
    MatchRule::IdentifierIgnoreCase,
    MatchRule::Serial,
    MatchRule::PhoneContains,
];

impl MatchRule {
    fn matches(self, token: &str, user: &User) -> bool {
        match self {
            MatchRule::Identifier => user.identifier == token,
            MatchRule::IdentifierIgnoreCase => user.identifier.to_lowercase() == token.to_lowercase(),
            MatchRule::Serial => user.serial.to_string() == token,
            MatchRule::PhoneContains => user.phone.contains(token),
        }
    }
}

/// Find the member a token refers to. Surrounding whitespace is ignored and
/// a blank token matches nobody.
pub fn match_token<'a>(token: &str, roster: &'a [User]) -> Option<&'a User> {
    match_with_rule(token, roster).map(|(_, user)| user)
}

/// Like `match_token`, also reporting which rule matched.
pub fn match_with_rule<'a>(token: &str, roster: &'a [User]) -> Option<(MatchRule, &'a User)> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    RULES.iter().find_map(|&rule| {
        roster
            .iter()
            .find(|user| rule.matches(token, user))
            .map(|user| (rule, user))
    })
}
