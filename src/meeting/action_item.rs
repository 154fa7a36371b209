//! Action items extracted from a meeting.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Owner recorded when nobody was assigned.
pub const UNASSIGNED: &str = "UNASSIGNED";

/// Due date recorded when none was mentioned.
pub const DUE_DATE_TBD: &str = "TBD";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Case-insensitive parse. Anything unrecognised is `Medium`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "h" | "urgent" | "critical" => Self::High,
            "low" | "l" => Self::Low,
            _ => Self::Medium,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single follow-up task. Identity is its position in the owning context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub description: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_due_date")]
    pub due_date: String,
    #[serde(default)]
    pub priority: Priority,
}

fn default_owner() -> String {
    UNASSIGNED.to_string()
}

fn default_due_date() -> String {
    DUE_DATE_TBD.to_string()
}

impl ActionItem {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            owner: default_owner(),
            due_date: default_due_date(),
            priority: Priority::default(),
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = due_date.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Owner with `UNASSIGNED` substituted for a blank value.
    pub fn effective_owner(&self) -> &str {
        let owner = self.owner.trim();
        if owner.is_empty() {
            UNASSIGNED
        } else {
            owner
        }
    }

    pub fn has_owner(&self) -> bool {
        self.effective_owner() != UNASSIGNED
    }

    /// Decode an item from loosely structured generation output.
    ///
    /// Objects take `description` (or `task`/`action`/`title`), `owner`,
    /// `due_date` (or `due`/`deadline`) and `priority`; missing, null or
    /// non-string fields fall back to their defaults. A bare string becomes
    /// the description. Anything else yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| Self::new(text))
            }
            Value::Object(map) => {
                let field = |keys: &[&str]| {
                    keys.iter()
                        .filter_map(|key| map.get(*key))
                        .find_map(|v| v.as_str())
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                };

                let mut item = Self::new(
                    field(&["description", "task", "action", "title"]).unwrap_or_default(),
                );
                if let Some(owner) = field(&["owner", "assignee"]) {
                    item.owner = owner;
                }
                if let Some(due) = field(&["due_date", "due", "deadline"]) {
                    item.due_date = due;
                }
                if let Some(priority) = field(&["priority"]) {
                    item.priority = Priority::parse_lenient(&priority);
                }
                Some(item)
            }
            _ => None,
        }
    }
}
