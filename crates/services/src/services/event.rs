//! Scrum ceremonies of a sprint, including the optimistic attendance toggle.

use std::{collections::HashSet, sync::Arc};

use domain::models::event::{CreateEvent, Event, EventStatus, MarkAttendance, UpdateEvent};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{
    client::KivoraClient,
    submission::{Collection, Slot, SubmitError, Submitter},
    toast::ToastService,
    validation::Validate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TogglePhase {
    /// Flipped locally, request in flight.
    Applied,
    Confirmed,
    RolledBack,
}

/// One attendance flip: `Applied -> Confirmed | RolledBack`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceToggle {
    pub event_id: String,
    pub user_id: String,
    pub previous: bool,
    pub requested: bool,
    phase: TogglePhase,
}

impl AttendanceToggle {
    /// Flip `user_id`'s presence on `event` and start tracking the change.
    pub fn apply(event: &mut Event, user_id: &str) -> Self {
        let requested = !event.attendance_of(user_id).unwrap_or(false);
        let previous = event.set_attendance(user_id, requested);
        Self {
            event_id: event.id.clone(),
            user_id: user_id.to_string(),
            previous,
            requested,
            phase: TogglePhase::Applied,
        }
    }

    pub fn phase(&self) -> TogglePhase {
        self.phase
    }

    /// Presence the UI should show for this toggle.
    pub fn displayed(&self) -> bool {
        match self.phase {
            TogglePhase::Applied | TogglePhase::Confirmed => self.requested,
            TogglePhase::RolledBack => self.previous,
        }
    }

    pub fn confirm(&mut self) {
        if self.phase == TogglePhase::Applied {
            self.phase = TogglePhase::Confirmed;
        }
    }

    /// Undo the local flip. Only an `Applied` toggle can be rolled back.
    pub fn roll_back(&mut self, event: &mut Event) {
        if self.phase != TogglePhase::Applied {
            return;
        }
        event.set_attendance(&self.user_id, self.previous);
        self.phase = TogglePhase::RolledBack;
    }
}

type ToggleKey = (String, String);

/// Marks an (event, user) pair as having a toggle in flight until dropped.
struct ToggleClaim<'a> {
    in_flight: &'a watch::Sender<HashSet<ToggleKey>>,
    key: ToggleKey,
}

impl<'a> ToggleClaim<'a> {
    fn acquire(in_flight: &'a watch::Sender<HashSet<ToggleKey>>, key: ToggleKey) -> Option<Self> {
        in_flight
            .send_if_modified(|pending| pending.insert(key.clone()))
            .then(|| Self { in_flight, key })
    }
}

impl Drop for ToggleClaim<'_> {
    fn drop(&mut self) {
        self.in_flight
            .send_if_modified(|pending| pending.remove(&self.key));
    }
}

#[derive(Debug, Clone)]
pub struct EventOrchestrator {
    client: KivoraClient,
    submitter: Submitter,
    events: Collection<Event>,
    last_toggle: Slot<AttendanceToggle>,
    in_flight: Arc<watch::Sender<HashSet<ToggleKey>>>,
}

impl EventOrchestrator {
    pub fn new(client: KivoraClient, toasts: ToastService) -> Self {
        Self {
            client,
            submitter: Submitter::new(toasts),
            events: Collection::new(),
            last_toggle: Slot::new(),
            in_flight: Arc::new(watch::channel(HashSet::new()).0),
        }
    }

    pub fn events(&self) -> &Collection<Event> {
        &self.events
    }

    /// Most recent attendance toggle and its phase.
    pub fn last_toggle(&self) -> &Slot<AttendanceToggle> {
        &self.last_toggle
    }

    /// Whether a toggle for this user on this event is still in flight.
    pub fn is_toggling(&self, event_id: &str, user_id: &str) -> bool {
        self.in_flight
            .borrow()
            .contains(&(event_id.to_string(), user_id.to_string()))
    }

    pub fn is_loading(&self) -> bool {
        self.submitter.gate().is_loading()
    }

    pub async fn load(&self, sprint_id: &str) -> Result<Vec<Event>, SubmitError> {
        let events = self.submitter.fetch(self.client.list_events(sprint_id)).await?;
        self.events.replace(events.clone());
        Ok(events)
    }

    async fn reload(&self, sprint_id: &str) {
        if let Some(events) = self
            .submitter
            .refresh("events", self.client.list_events(sprint_id))
            .await
        {
            self.events.replace(events);
        }
    }

    pub async fn create(&self, event: &CreateEvent) -> Result<Event, SubmitError> {
        event.validate()?;
        let created = self
            .submitter
            .submit("Event scheduled", self.client.create_event(event))
            .await?;
        self.reload(&event.sprint).await;
        Ok(created)
    }

    pub async fn edit(&self, event_id: &str, update: &UpdateEvent) -> Result<Event, SubmitError> {
        update.validate()?;
        let updated = self
            .submitter
            .submit("Event updated", self.client.update_event(event_id, update))
            .await?;
        self.reload(&updated.sprint).await;
        Ok(updated)
    }

    pub async fn cancel(&self, event_id: &str) -> Result<Event, SubmitError> {
        self.edit(event_id, &UpdateEvent::status(EventStatus::Cancelled))
            .await
    }

    pub async fn delete(&self, event_id: &str, sprint_id: &str) -> Result<(), SubmitError> {
        self.submitter
            .submit("Event deleted", self.client.delete_event(event_id))
            .await?;
        self.reload(sprint_id).await;
        Ok(())
    }

    /// Flip the user's attendance immediately, then persist it. A failed
    /// request restores the previous value and raises one error toast.
    /// A second toggle of the same pair is refused with `Busy` until the
    /// first one settles.
    pub async fn toggle_attendance(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<AttendanceToggle, SubmitError> {
        let Some(_claim) = ToggleClaim::acquire(
            &self.in_flight,
            (event_id.to_string(), user_id.to_string()),
        ) else {
            debug!(event = %event_id, user = %user_id, "Attendance toggle already in flight");
            return Err(SubmitError::Busy);
        };

        let mut toggle = None;
        self.events.update_one(event_id, |event| {
            toggle = Some(AttendanceToggle::apply(event, user_id));
            true
        });
        let Some(mut toggle) = toggle else {
            return Err(SubmitError::NotLoaded(format!("event {event_id}")));
        };
        self.last_toggle.set(toggle.clone());

        let request = MarkAttendance {
            user_id: user_id.to_string(),
            present: toggle.requested,
        };
        match self.client.mark_attendance(event_id, &request).await {
            Ok(_) => {
                toggle.confirm();
                debug!(event = %event_id, user = %user_id, present = toggle.requested, "Attendance confirmed");
                self.last_toggle.set(toggle.clone());
                Ok(toggle)
            }
            Err(e) => {
                self.events.update_one(event_id, |event| {
                    toggle.roll_back(event);
                    true
                });
                warn!(event = %event_id, error = %e, "Attendance update failed, rolled back");
                self.submitter.toasts().error(e.user_message());
                self.last_toggle.set(toggle);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::services::{
        api::ApiError,
        test_support::{FakeTransport, drain_toasts, error_toasts},
    };

    fn event_json(present: bool) -> serde_json::Value {
        json!({
            "_id": "e1",
            "type": "Daily Scrum",
            "fecha": "2026-03-02T14:00:00Z",
            "sprint": "s1",
            "attendance": [{"user": "u1", "present": present}]
        })
    }

    fn setup() -> (std::sync::Arc<FakeTransport>, EventOrchestrator, ToastService) {
        let fake = FakeTransport::new();
        let toasts = ToastService::new();
        let events = EventOrchestrator::new(KivoraClient::new(fake.clone()), toasts.clone());
        events
            .events()
            .replace(vec![serde_json::from_value(event_json(false)).unwrap()]);
        (fake, events, toasts)
    }

    #[test]
    fn test_toggle_state_machine() {
        let mut event: Event = serde_json::from_value(event_json(false)).unwrap();
        let mut toggle = AttendanceToggle::apply(&mut event, "u1");
        assert_eq!(toggle.phase(), TogglePhase::Applied);
        assert!(toggle.displayed());
        assert_eq!(event.attendance_of("u1"), Some(true));

        toggle.roll_back(&mut event);
        assert_eq!(toggle.phase(), TogglePhase::RolledBack);
        assert!(!toggle.displayed());
        assert_eq!(event.attendance_of("u1"), Some(false));

        toggle.confirm();
        assert_eq!(toggle.phase(), TogglePhase::RolledBack);
    }

    #[tokio::test]
    async fn test_failed_toggle_reverts_and_toasts_once() {
        let (fake, events, toasts) = setup();
        let mut rx = toasts.subscribe();
        fake.fail(
            Method::PUT,
            "event/e1/attendance",
            ApiError::Http {
                status: 500,
                message: None,
            },
        );

        let err = events.toggle_attendance("e1", "u1").await.unwrap_err();
        assert!(matches!(err, SubmitError::Api(_)));

        assert_eq!(events.events().get("e1").unwrap().attendance_of("u1"), Some(false));
        assert_eq!(
            events.last_toggle().get().unwrap().phase(),
            TogglePhase::RolledBack
        );
        assert_eq!(error_toasts(&drain_toasts(&mut rx)), 1);
    }

    #[tokio::test]
    async fn test_confirmed_toggle_keeps_flip_without_refetch() {
        let (fake, events, _) = setup();
        fake.respond(
            Method::PUT,
            "event/e1/attendance",
            json!({"event": event_json(true)}),
        );

        let toggle = events.toggle_attendance("e1", "u1").await.unwrap();
        assert_eq!(toggle.phase(), TogglePhase::Confirmed);
        assert_eq!(events.events().get("e1").unwrap().attendance_of("u1"), Some(true));
        assert_eq!(fake.count(Method::GET, "event/sprint/s1"), 0);
    }

    #[tokio::test]
    async fn test_toggle_unknown_event() {
        let (fake, events, _) = setup();
        let err = events.toggle_attendance("nope", "u1").await.unwrap_err();
        assert!(matches!(err, SubmitError::NotLoaded(_)));
        assert!(fake.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_toggle_waits_for_first() {
        let (fake, events, toasts) = setup();
        let mut rx = toasts.subscribe();
        fake.fail(Method::PUT, "event/e1/attendance", ApiError::Timeout);
        fake.set_delay(std::time::Duration::from_secs(1));

        let first = tokio::spawn({
            let events = events.clone();
            async move { events.toggle_attendance("e1", "u1").await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(events.is_toggling("e1", "u1"));
        assert_eq!(events.events().get("e1").unwrap().attendance_of("u1"), Some(true));

        let err = events.toggle_attendance("e1", "u1").await.unwrap_err();
        assert!(matches!(err, SubmitError::Busy));
        assert_eq!(fake.count(Method::PUT, "event/e1/attendance"), 1);

        assert!(first.await.unwrap().is_err());
        assert!(!events.is_toggling("e1", "u1"));
        assert_eq!(events.events().get("e1").unwrap().attendance_of("u1"), Some(false));
        assert_eq!(error_toasts(&drain_toasts(&mut rx)), 1);
    }
}
