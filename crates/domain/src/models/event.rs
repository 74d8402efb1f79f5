use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use ts_rs::TS;

use super::{Identified, user::UserRef};

/// How long an event stays "in course" after it starts.
pub const DEFAULT_EVENT_WINDOW_MINUTES: i64 = 10;

pub fn default_event_window() -> TimeDelta {
    TimeDelta::minutes(DEFAULT_EVENT_WINDOW_MINUTES)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
pub enum EventType {
    #[serde(rename = "Sprint Planning")]
    #[strum(serialize = "Sprint Planning")]
    SprintPlanning,
    #[serde(rename = "Daily Scrum")]
    #[strum(serialize = "Daily Scrum")]
    DailyScrum,
    #[serde(rename = "Sprint Review")]
    #[strum(serialize = "Sprint Review")]
    SprintReview,
    #[serde(rename = "Sprint Retrospective")]
    #[strum(serialize = "Sprint Retrospective")]
    SprintRetrospective,
    #[serde(rename = "Backlog Refinement")]
    #[strum(serialize = "Backlog Refinement")]
    BacklogRefinement,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
pub enum EventStatus {
    #[serde(rename = "Pendiente")]
    #[strum(serialize = "Pendiente")]
    Pending,
    #[serde(rename = "En Curso")]
    #[strum(serialize = "En Curso")]
    InCourse,
    #[serde(rename = "Finalizado")]
    #[strum(serialize = "Finalizado")]
    Finished,
    #[serde(rename = "Cancelado")]
    #[strum(serialize = "Cancelado")]
    Cancelled,
}

impl EventStatus {
    /// Status implied by the clock alone.
    pub fn at(start: DateTime<Utc>, now: DateTime<Utc>, window: TimeDelta) -> Self {
        if now < start {
            EventStatus::Pending
        } else if now.signed_duration_since(start) < window {
            EventStatus::InCourse
        } else {
            EventStatus::Finished
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct Attendance {
    pub user: UserRef,
    #[serde(default)]
    pub present: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(rename = "fecha")]
    pub date: DateTime<Utc>,
    #[serde(alias = "sprintId")]
    pub sprint: String,
    #[serde(default, alias = "participants")]
    pub attendance: Vec<Attendance>,
    #[serde(default)]
    pub status_event: Option<EventStatus>,
}

impl Identified for Event {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Event {
    /// Cancelled events keep their status; everything else follows the clock.
    pub fn derived_status(&self, now: DateTime<Utc>, window: TimeDelta) -> EventStatus {
        match self.status_event {
            Some(EventStatus::Cancelled) => EventStatus::Cancelled,
            _ => EventStatus::at(self.date, now, window),
        }
    }

    /// The status to persist, if the stored one is stale.
    pub fn pending_transition(&self, now: DateTime<Utc>, window: TimeDelta) -> Option<EventStatus> {
        let derived = self.derived_status(now, window);
        (self.status_event != Some(derived)).then_some(derived)
    }

    pub fn attendance_of(&self, user_id: &str) -> Option<bool> {
        self.attendance
            .iter()
            .find(|a| a.user.id() == user_id)
            .map(|a| a.present)
    }

    /// Record presence for `user_id`, returning the previous value.
    pub fn set_attendance(&mut self, user_id: &str, present: bool) -> bool {
        match self.attendance.iter_mut().find(|a| a.user.id() == user_id) {
            Some(record) => std::mem::replace(&mut record.present, present),
            None => {
                self.attendance.push(Attendance {
                    user: user_id.into(),
                    present,
                });
                false
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(rename = "fecha")]
    pub date: DateTime<Utc>,
    pub sprint: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEvent {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(rename = "fecha", skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_event: Option<EventStatus>,
}

impl UpdateEvent {
    pub fn status(status: EventStatus) -> Self {
        Self {
            status_event: Some(status),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendance {
    pub user_id: String,
    pub present: bool,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn event_at(date: DateTime<Utc>, status: Option<EventStatus>) -> Event {
        Event {
            id: "e1".to_string(),
            event_type: EventType::DailyScrum,
            link: None,
            date,
            sprint: "s1".to_string(),
            attendance: vec![],
            status_event: status,
        }
    }

    #[test]
    fn test_status_follows_window() {
        let start = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let window = default_event_window();
        assert_eq!(
            EventStatus::at(start, start - TimeDelta::seconds(1), window),
            EventStatus::Pending
        );
        assert_eq!(EventStatus::at(start, start, window), EventStatus::InCourse);
        assert_eq!(
            EventStatus::at(start, start + TimeDelta::minutes(9), window),
            EventStatus::InCourse
        );
        assert_eq!(
            EventStatus::at(start, start + TimeDelta::minutes(10), window),
            EventStatus::Finished
        );
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        let start = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        assert_eq!(
            EventStatus::at(start, start + TimeDelta::days(365), TimeDelta::MAX),
            EventStatus::InCourse
        );
    }

    #[test]
    fn test_cancelled_never_transitions() {
        let start = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let event = event_at(start, Some(EventStatus::Cancelled));
        assert_eq!(
            event.pending_transition(start + TimeDelta::hours(1), default_event_window()),
            None
        );
    }

    #[test]
    fn test_pending_transition_only_when_stale() {
        let start = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let now = start + TimeDelta::minutes(5);
        let fresh = event_at(start, None);
        assert_eq!(
            fresh.pending_transition(now, default_event_window()),
            Some(EventStatus::InCourse)
        );
        let synced = event_at(start, Some(EventStatus::InCourse));
        assert_eq!(synced.pending_transition(now, default_event_window()), None);
    }

    #[test]
    fn test_set_attendance_returns_previous() {
        let mut event = event_at(Utc::now(), None);
        assert!(!event.set_attendance("u1", true));
        assert_eq!(event.attendance_of("u1"), Some(true));
        assert!(event.set_attendance("u1", false));
        assert_eq!(event.attendance_of("u1"), Some(false));
    }

    #[test]
    fn test_wire_names() {
        let event: Event = serde_json::from_value(json!({
            "_id": "e9",
            "type": "Sprint Review",
            "fecha": "2026-05-04T09:00:00Z",
            "sprint": "s1",
            "statusEvent": "En Curso",
            "participants": [{"user": "u1", "present": true}]
        }))
        .unwrap();
        assert_eq!(event.event_type, EventType::SprintReview);
        assert_eq!(event.status_event, Some(EventStatus::InCourse));
        assert_eq!(event.attendance_of("u1"), Some(true));
    }
}
