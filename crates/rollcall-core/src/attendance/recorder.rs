use std::sync::Arc;

use tracing::{debug, info};

use super::{AttendanceStore, DateKey};

/// Result of recording a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitOutcome {
    Recorded,
    AlreadyCheckedIn,
}

/// Records once-per-day visits into a shared `AttendanceStore`.
#[derive(Debug, Clone)]
pub struct AttendanceRecorder {
    store: Arc<AttendanceStore>,
}

impl AttendanceRecorder {
    pub fn new(store: Arc<AttendanceStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<AttendanceStore> {
        &self.store
    }

    /// Mark `member_id` as present on `date`. Repeats within a day leave the
    /// day's set unchanged.
    pub fn record_visit(&self, date: DateKey, member_id: &str) -> VisitOutcome {
        if self.store.insert(date, member_id) {
            info!(date = %date, member = member_id, "Visit recorded");
            VisitOutcome::Recorded
        } else {
            debug!(date = %date, member = member_id, "Member already checked in");
            VisitOutcome::AlreadyCheckedIn
        }
    }

    pub fn record_visit_today(&self, member_id: &str) -> VisitOutcome {
        self.record_visit(DateKey::today(), member_id)
    }

    pub fn count_for_date(&self, date: DateKey) -> usize {
        self.store.count(date)
    }

    pub fn count_today(&self) -> usize {
        self.count_for_date(DateKey::today())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> DateKey {
        DateKey::parse(s).expect("valid date")
    }

    #[test]
    fn test_second_visit_same_day_does_not_count() {
        let recorder = AttendanceRecorder::new(Arc::new(AttendanceStore::in_memory()));
        let date = day("2024-06-10");

        assert_eq!(recorder.record_visit(date, "12"), VisitOutcome::Recorded);
        let after_first = recorder.count_for_date(date);
        assert_eq!(recorder.record_visit(date, "12"), VisitOutcome::AlreadyCheckedIn);
        assert_eq!(recorder.count_for_date(date), after_first);
        assert_eq!(after_first, 1);
    }

    #[test]
    fn test_same_member_on_different_days() {
        let recorder = AttendanceRecorder::new(Arc::new(AttendanceStore::in_memory()));
        assert_eq!(recorder.record_visit(day("2024-06-10"), "12"), VisitOutcome::Recorded);
        assert_eq!(recorder.record_visit(day("2024-06-11"), "12"), VisitOutcome::Recorded);
        assert_eq!(recorder.count_for_date(day("2024-06-10")), 1);
        assert_eq!(recorder.count_for_date(day("2024-06-11")), 1);
    }

    #[test]
    fn test_readers_share_the_store() {
        let store = Arc::new(AttendanceStore::in_memory());
        let recorder = AttendanceRecorder::new(Arc::clone(&store));
        let dashboard = AttendanceRecorder::new(Arc::clone(&store));

        recorder.record_visit_today("3");
        recorder.record_visit_today("4");
        assert_eq!(dashboard.count_today(), 2);
        assert_eq!(store.count(DateKey::today()), 2);
    }
}
