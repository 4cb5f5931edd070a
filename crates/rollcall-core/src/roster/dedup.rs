use std::collections::HashSet;

use tracing::debug;

use crate::models::User;

/// Drop rows whose serial was already seen, then order by serial descending.
///
/// The first occurrence in file order wins, which favours the earlier
/// registration when a serial was reused by mistake.
pub fn dedupe_and_order(rows: Vec<User>) -> Vec<User> {
    let total = rows.len();
    let mut seen = HashSet::with_capacity(total);

    let mut users: Vec<User> = rows
        .into_iter()
        .filter(|user| seen.insert(user.serial))
        .collect();

    if users.len() < total {
        debug!(dropped = total - users.len(), "Dropped duplicate serials");
    }

    users.sort_by(|a, b| b.serial.cmp(&a.serial));
    users
}
