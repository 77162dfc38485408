//! Calendar events, sections and meeting participation (`calendar.*`).
//!
//! Unlike CRM methods, calendar methods take their parameters flat: filter
//! keys and event fields sit at the top level of the request.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{json, Value};

use super::DEFAULT_LIMIT;
use crate::client::{Params, Transport};
use crate::envelope::Envelope;
use crate::error::ToolError;
use crate::normalize::{
    apply_default, apply_limit, coerce_int, insert_some, merge_aliases, merge_multi_values,
    non_empty, normalize_multi_value, parse_object, parse_object_or_none,
};
use crate::response::ResponseShape;

/// Legacy spellings accepted by `calendar.section.get`.
const SECTION_ALIASES: &[(&str, &str)] = &[
    ("TYPE", "type"),
    ("OWNER_ID", "ownerId"),
    ("owner_id", "ownerId"),
];

const NEAREST_DEFAULT_DAYS: i64 = 60;

/// Arguments of the event listing tool.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub filter: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub limit: i64,
    /// JSON list or comma-separated section IDs, merged with any `section`
    /// key of `filter`.
    pub sections: Option<String>,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            filter: None,
            date_from: None,
            date_to: None,
            limit: DEFAULT_LIMIT,
            sections: None,
        }
    }
}

/// Arguments of the upcoming-events tool. Only values that differ from the
/// remote defaults are sent.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestEventsQuery {
    pub calendar_type: String,
    pub owner_id: Option<String>,
    pub days: i64,
    pub for_current_user: bool,
    pub max_events_count: i64,
    pub detail_url: Option<String>,
}

impl Default for NearestEventsQuery {
    fn default() -> Self {
        Self {
            calendar_type: "user".to_string(),
            owner_id: None,
            days: NEAREST_DEFAULT_DAYS,
            for_current_user: true,
            max_events_count: 0,
            detail_url: None,
        }
    }
}

/// A participant's answer to a meeting invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingStatus {
    /// Accepted.
    Accepted,
    /// Declined.
    Declined,
    /// Invited, no answer yet.
    Pending,
}

impl MeetingStatus {
    pub const ALLOWED: &'static str = "Y, N, Q";

    pub fn as_str(self) -> &'static str {
        match self {
            MeetingStatus::Accepted => "Y",
            MeetingStatus::Declined => "N",
            MeetingStatus::Pending => "Q",
        }
    }
}

impl FromStr for MeetingStatus {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Y" => Ok(MeetingStatus::Accepted),
            "N" => Ok(MeetingStatus::Declined),
            "Q" => Ok(MeetingStatus::Pending),
            other => Err(ToolError::InvalidEnum {
                field: "status",
                value: other.to_string(),
                allowed: Self::ALLOWED.to_string(),
            }),
        }
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
pub struct CalendarTools {
    client: Arc<dyn Transport>,
}

impl CalendarTools {
    pub fn new(client: Arc<dyn Transport>) -> Self {
        Self { client }
    }

    pub async fn events(&self, query: &EventQuery) -> Envelope {
        Envelope::settle(self.try_events(query).await, "getting calendar events")
    }

    async fn try_events(&self, query: &EventQuery) -> Result<Envelope, ToolError> {
        let mut params =
            parse_object_or_none(query.filter.as_deref(), "filter_params")?.unwrap_or_default();

        let mut sources = Vec::new();
        if let Some(section) = params.get("section") {
            sources.push(normalize_multi_value(section));
        }
        if let Some(sections) = non_empty(query.sections.as_deref()) {
            sources.push(normalize_multi_value(&Value::String(sections.to_string())));
        }
        let sections = merge_multi_values(sources);
        if sections.is_empty() {
            // An unusable section payload is rejected by the API.
            params.remove("section");
        } else {
            params.insert("section".to_string(), Value::Array(sections));
        }

        insert_some(&mut params, "from", non_empty(query.date_from.as_deref()));
        insert_some(&mut params, "to", non_empty(query.date_to.as_deref()));

        let response = self.client.call("calendar.event.get", params).await?;
        let events = ResponseShape::classify(response).into_list();
        Ok(Envelope::list("events", apply_limit(events, query.limit)))
    }

    pub async fn create_event(&self, fields: &str) -> Envelope {
        Envelope::settle(self.try_create_event(fields).await, "creating calendar event")
    }

    async fn try_create_event(&self, fields: &str) -> Result<Envelope, ToolError> {
        let fields = parse_object(fields, "fields")?;
        let response = self.client.call("calendar.event.add", fields).await?;
        let id = ResponseShape::classify(response).created_id(&[]);
        Ok(Envelope::created("event_id", id, "Calendar event"))
    }

    pub async fn update_event(&self, event_id: &str, fields: &str) -> Envelope {
        let operation = format!("updating calendar event {}", event_id);
        Envelope::settle(self.try_update_event(event_id, fields).await, &operation)
    }

    async fn try_update_event(&self, event_id: &str, fields: &str) -> Result<Envelope, ToolError> {
        let mut params = parse_object(fields, "fields")?;
        params.insert("id".to_string(), json!(event_id));

        let response = self.client.call("calendar.event.update", params).await?;
        Ok(Envelope::outcome(ResponseShape::classify(response).is_truthy())
            .with("event_id", event_id)
            .with_message("Calendar event updated successfully", "Failed to update event"))
    }

    pub async fn delete_event(&self, event_id: &str) -> Envelope {
        let operation = format!("deleting calendar event {}", event_id);
        Envelope::settle(self.try_delete_event(event_id).await, &operation)
    }

    async fn try_delete_event(&self, event_id: &str) -> Result<Envelope, ToolError> {
        let response = self
            .client
            .call("calendar.event.delete", id_params("id", event_id))
            .await?;
        Ok(Envelope::outcome(ResponseShape::classify(response).is_truthy())
            .with("event_id", event_id)
            .with_message("Calendar event deleted successfully", "Failed to delete event"))
    }

    /// Calendar sections. Legacy key spellings are accepted, `type`
    /// defaults to `user` and `ownerId` is sent as an integer when possible.
    pub async fn calendars(&self, filter: Option<&str>) -> Envelope {
        Envelope::settle(self.try_calendars(filter).await, "getting calendar list")
    }

    async fn try_calendars(&self, filter: Option<&str>) -> Result<Envelope, ToolError> {
        let mut params = parse_object_or_none(filter, "filter_params")?.unwrap_or_default();
        merge_aliases(&mut params, SECTION_ALIASES);
        apply_default(&mut params, "type", json!("user"));
        if let Some(owner) = params.remove("ownerId") {
            params.insert("ownerId".to_string(), coerce_int(owner));
        }

        let response = self.client.call("calendar.section.get", params).await?;
        Ok(Envelope::list(
            "calendars",
            ResponseShape::classify(response).into_list(),
        ))
    }

    pub async fn event(&self, event_id: &str) -> Envelope {
        let operation = format!("getting calendar event {}", event_id);
        Envelope::settle(self.try_event(event_id).await, &operation)
    }

    async fn try_event(&self, event_id: &str) -> Result<Envelope, ToolError> {
        let response = self
            .client
            .call("calendar.event.getbyid", id_params("id", event_id))
            .await?;
        match ResponseShape::classify(response).into_record() {
            Some(event) => Ok(Envelope::record("event", event)),
            None => Err(ToolError::not_found("Event", event_id)),
        }
    }

    pub async fn nearest(&self, query: &NearestEventsQuery) -> Envelope {
        Envelope::settle(
            self.try_nearest(query).await,
            "getting nearest calendar events",
        )
    }

    async fn try_nearest(&self, query: &NearestEventsQuery) -> Result<Envelope, ToolError> {
        let mut params = Params::new();

        insert_some(&mut params, "type", non_empty(Some(query.calendar_type.as_str())));
        if let Some(owner) = non_empty(query.owner_id.as_deref()) {
            let owner = coerce_int(json!(owner));
            if !owner.is_i64() {
                return Err(ToolError::InvalidArgument {
                    argument: "owner_id",
                    reason: format!("expected an integer, got {}", owner),
                });
            }
            params.insert("ownerId".to_string(), owner);
        }
        if query.days != NEAREST_DEFAULT_DAYS {
            params.insert("days".to_string(), json!(query.days));
        }
        if !query.for_current_user {
            params.insert("forCurrentUser".to_string(), json!(false));
        }
        if query.max_events_count > 0 {
            params.insert("maxEventsCount".to_string(), json!(query.max_events_count));
        }
        insert_some(&mut params, "detailUrl", non_empty(query.detail_url.as_deref()));

        let response = self.client.call("calendar.event.get.nearest", params).await?;
        Ok(Envelope::list(
            "events",
            ResponseShape::classify(response).into_list(),
        ))
    }

    pub async fn meeting_status(&self, event_id: &str) -> Envelope {
        let operation = format!("getting meeting status for event {}", event_id);
        Envelope::settle(self.try_meeting_status(event_id).await, &operation)
    }

    async fn try_meeting_status(&self, event_id: &str) -> Result<Envelope, ToolError> {
        let response = self
            .client
            .call("calendar.meeting.status.get", id_params("eventId", event_id))
            .await?;
        Ok(match ResponseShape::classify(response).into_value() {
            Some(status) => Envelope::ok()
                .with("event_id", event_id)
                .with("status", status),
            None => Envelope::failure(format!(
                "Could not get meeting status for event {}",
                event_id
            )),
        })
    }

    /// Set the current user's participation. `status` must be `Y`, `N` or
    /// `Q`; anything else is rejected before the API is called.
    pub async fn set_meeting_status(&self, event_id: &str, status: &str) -> Envelope {
        let operation = format!("setting meeting status for event {}", event_id);
        Envelope::settle(
            self.try_set_meeting_status(event_id, status).await,
            &operation,
        )
    }

    async fn try_set_meeting_status(
        &self,
        event_id: &str,
        status: &str,
    ) -> Result<Envelope, ToolError> {
        let status: MeetingStatus = status.parse()?;
        let mut params = id_params("eventId", event_id);
        params.insert("status".to_string(), json!(status.as_str()));

        let response = self.client.call("calendar.meeting.status.set", params).await?;
        Ok(Envelope::outcome(ResponseShape::classify(response).is_truthy())
            .with("event_id", event_id)
            .with("status", status.as_str())
            .with_message(
                "Meeting status updated successfully",
                "Failed to update meeting status",
            ))
    }
}

fn id_params(key: &str, id: &str) -> Params {
    let mut params = Params::new();
    params.insert(key.to_string(), json!(id));
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meeting_status_accepts_closed_set() {
        assert_eq!("Y".parse::<MeetingStatus>().unwrap(), MeetingStatus::Accepted);
        assert_eq!("N".parse::<MeetingStatus>().unwrap(), MeetingStatus::Declined);
        assert_eq!("Q".parse::<MeetingStatus>().unwrap(), MeetingStatus::Pending);
    }

    #[test]
    fn meeting_status_error_cites_value_and_allowed_set() {
        let err = "y".parse::<MeetingStatus>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid status 'y'. Must be one of: Y, N, Q");
    }
}
