use serde::{Deserialize, Serialize};

/// Domain events that represent state changes in the system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// A session lookup finished; `user_id` is None when nobody is signed in
    SessionResolved { user_id: Option<String> },

    /// A group row was created
    GroupCreated { group_id: String, name: String },

    /// Join rows were inserted for a new group
    MembersAdded { group_id: String, count: usize },

    /// The group exists but inserting its join rows failed
    MembersFailed { group_id: String, reason: String },
}

impl DomainEvent {
    /// Get the group ID associated with this event, if any
    pub fn group_id(&self) -> Option<&str> {
        match self {
            Self::SessionResolved { .. } => None,
            Self::GroupCreated { group_id, .. } => Some(group_id),
            Self::MembersAdded { group_id, .. } => Some(group_id),
            Self::MembersFailed { group_id, .. } => Some(group_id),
        }
    }

    /// Get the event type name for routing and logs
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::SessionResolved { .. } => "session_resolved",
            Self::GroupCreated { .. } => "group_created",
            Self::MembersAdded { .. } => "members_added",
            Self::MembersFailed { .. } => "members_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let event = DomainEvent::MembersAdded {
            group_id: "g1".into(),
            count: 3,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MembersAdded");
        assert_eq!(json["count"], 3);
        assert_eq!(event.event_name(), "members_added");
        assert_eq!(event.group_id(), Some("g1"));
    }
}
