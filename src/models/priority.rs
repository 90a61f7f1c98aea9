//! Priority labels and the derived urgency score.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "priority_label")]
#[serde(rename_all = "snake_case")]
pub enum PriorityLabel {
    #[sea_orm(string_value = "emergency")]
    Emergency,
    #[sea_orm(string_value = "urgent")]
    Urgent,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "low")]
    Low,
}

impl PriorityLabel {
    pub fn weight(self) -> i64 {
        match self {
            Self::Emergency => 40,
            Self::Urgent => 30,
            Self::High => 20,
            Self::Normal => 0,
            Self::Low => -20,
        }
    }
}

/// Computes the 0–100 urgency score for a work order.
///
/// `score = 50 + label_weight + min(10, age_days) + min(20, 2 * days_overdue)`,
/// clamped to `[0, 100]`. Pure and recomputed on demand; never persisted.
/// Advisory input to scheduling order only, not a transition gate.
pub fn priority_score(
    label: PriorityLabel,
    created_at: DateTime<Utc>,
    due_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> u8 {
    let mut score = 50 + label.weight();

    let age_days = (now - created_at).num_days().max(0);
    score += age_days.min(10);

    if let Some(due) = due_date {
        if due < now {
            let days_overdue = (now - due).num_days().max(0);
            score += (2 * days_overdue).min(20);
        }
    }

    score.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn urgent_one_day_old_three_days_overdue_scores_87() {
        let now = Utc::now();
        let created = now - Duration::days(1);
        let due = now - Duration::days(3);
        // 50 + 30 + 1 + 6
        assert_eq!(priority_score(PriorityLabel::Urgent, created, Some(due), now), 87);
    }

    #[test]
    fn age_bonus_caps_at_ten() {
        let now = Utc::now();
        let created = now - Duration::days(400);
        assert_eq!(priority_score(PriorityLabel::Normal, created, None, now), 60);
    }

    #[test]
    fn overdue_bonus_caps_at_twenty() {
        let now = Utc::now();
        let created = now;
        let due = now - Duration::days(90);
        assert_eq!(
            priority_score(PriorityLabel::Normal, created, Some(due), now),
            70
        );
    }

    #[test]
    fn emergency_aged_overdue_clamps_to_100() {
        let now = Utc::now();
        let created = now - Duration::days(30);
        let due = now - Duration::days(30);
        // 50 + 40 + 10 + 20 = 120 -> 100
        assert_eq!(
            priority_score(PriorityLabel::Emergency, created, Some(due), now),
            100
        );
    }

    #[test]
    fn low_priority_fresh_order_scores_30() {
        let now = Utc::now();
        assert_eq!(priority_score(PriorityLabel::Low, now, None, now), 30);
    }

    #[test]
    fn due_in_the_future_adds_nothing() {
        let now = Utc::now();
        let due = now + Duration::days(5);
        assert_eq!(
            priority_score(PriorityLabel::Normal, now, Some(due), now),
            50
        );
    }
}
