use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::outreach::MessageType;

/// Days after sending, with the intent of each touch.
const FOLLOW_UPS: [(i64, &str); 3] = [
    (5, "Gentle follow-up: reference the role, add value"),
    (14, "Second follow-up: brief, respectful"),
    (30, "Final check-in: keep the door open"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowUp {
    pub due: DateTime<Utc>,
    pub message_type: MessageType,
    pub note: &'static str,
}

pub fn follow_up_schedule(sent_at: DateTime<Utc>) -> Vec<FollowUp> {
    FOLLOW_UPS
        .into_iter()
        .map(|(days, note)| FollowUp {
            due: sent_at + Duration::days(days),
            message_type: MessageType::FollowUp,
            note,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_schedule_is_day_5_14_30() {
        let sent = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

        let schedule = follow_up_schedule(sent);

        let days: Vec<i64> = schedule.iter().map(|f| (f.due - sent).num_days()).collect();
        assert_eq!(days, vec![5, 14, 30]);
        assert!(schedule.iter().all(|f| f.message_type == MessageType::FollowUp));
    }
}
