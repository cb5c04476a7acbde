use serde::{Deserialize, Serialize};

/// Severity levels for activity logs.
/// Controls retention policies and log filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Auth and access-control changes: never auto-deleted
    Critical,
    #[default]
    Important,
    /// Aggressively trimmed
    Noise,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
            Severity::Noise => "noise",
        }
    }
}

/// Trait for entities that can be logged in the activity log.
pub trait Loggable: Serialize + Send + Sync {
    /// Prefix of event names, e.g. "user" in "user.registered"
    fn entity_type() -> &'static str;

    /// Primary key of the entity the event is about, if it has one
    fn subject_id(&self) -> Option<i64>;

    fn severity(&self) -> Severity {
        Severity::Important
    }

    /// Override severity based on action (e.g., "deleted" -> Critical)
    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "deleted" | "revoked" => Severity::Critical,
            _ => self.severity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Widget {
        id: i64,
    }

    impl Loggable for Widget {
        fn entity_type() -> &'static str {
            "widget"
        }

        fn subject_id(&self) -> Option<i64> {
            Some(self.id)
        }
    }

    #[test]
    fn destructive_actions_are_critical() {
        let widget = Widget { id: 1 };
        assert_eq!(widget.severity_for_action("created"), Severity::Important);
        assert_eq!(widget.severity_for_action("deleted"), Severity::Critical);
        assert_eq!(widget.severity_for_action("revoked"), Severity::Critical);
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Severity::Critical).unwrap(), "critical");
        assert_eq!(Severity::Noise.as_str(), "noise");
    }
}
