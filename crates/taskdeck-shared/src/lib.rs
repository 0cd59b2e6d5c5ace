use std::fmt;
use std::str::FromStr;

use serde::{
  Deserialize,
  Serialize
};

pub type TaskId = u64;

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
  #[default]
  Pending,
  InProgress,
  Completed
}

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
  Hash,
  Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
  Low,
  #[default]
  Medium,
  High
}

/// A task as the backend returns it.
///
/// `id` is `None` only for a draft that has never been persisted.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskDto {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub id:          Option<TaskId>,
  pub title:       String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub due_date:    Option<String>,
  #[serde(default)]
  pub priority:    TaskPriority,
  #[serde(default)]
  pub status:      TaskStatus,
  #[serde(default)]
  pub starred:     bool
}

/// Body of a create or update request. `id` is left out on create and
/// carried on update, where the whole record is sent.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct TaskPayload {
  #[serde(
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub id:          Option<TaskId>,
  pub title:       String,
  pub description: String,
  pub due_date:    Option<String>,
  pub priority:    TaskPriority,
  pub status:      TaskStatus,
  pub starred:     bool
}

impl TaskDto {
  pub fn to_payload(
    &self
  ) -> TaskPayload {
    TaskPayload {
      id:          self.id,
      title:       self.title.clone(),
      description: self
        .description
        .clone(),
      due_date:    self.due_date.clone(),
      priority:    self.priority,
      status:      self.status,
      starred:     self.starred
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
  pub kind:  &'static str,
  pub value: String
}

impl fmt::Display for ParseEnumError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "unknown {}: {}",
      self.kind, self.value
    )
  }
}

impl std::error::Error
  for ParseEnumError
{
}

fn normalize_token(raw: &str) -> String {
  raw
    .trim()
    .to_ascii_uppercase()
    .replace(['-', ' '], "_")
}

impl TaskStatus {
  pub const ALL: [TaskStatus; 3] = [
    TaskStatus::Pending,
    TaskStatus::InProgress,
    TaskStatus::Completed
  ];

  pub fn as_wire(self) -> &'static str {
    match self {
      | TaskStatus::Pending => "PENDING",
      | TaskStatus::InProgress => {
        "IN_PROGRESS"
      }
      | TaskStatus::Completed => {
        "COMPLETED"
      }
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | TaskStatus::Pending => "Pending",
      | TaskStatus::InProgress => {
        "In Progress"
      }
      | TaskStatus::Completed => {
        "Completed"
      }
    }
  }

  /// Card text: the wire token with `_` shown as a space.
  pub fn badge(self) -> String {
    self.as_wire().replace('_', " ")
  }
}

impl TaskPriority {
  pub const ALL: [TaskPriority; 3] = [
    TaskPriority::Low,
    TaskPriority::Medium,
    TaskPriority::High
  ];

  pub fn as_wire(self) -> &'static str {
    match self {
      | TaskPriority::Low => "LOW",
      | TaskPriority::Medium => "MEDIUM",
      | TaskPriority::High => "HIGH"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | TaskPriority::Low => "Low",
      | TaskPriority::Medium => "Medium",
      | TaskPriority::High => "High"
    }
  }
}

impl FromStr for TaskStatus {
  type Err = ParseEnumError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let token = normalize_token(s);
    TaskStatus::ALL
      .into_iter()
      .find(|status| {
        status.as_wire() == token
      })
      .ok_or_else(|| ParseEnumError {
        kind:  "status",
        value: s.to_string()
      })
  }
}

impl FromStr for TaskPriority {
  type Err = ParseEnumError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let token = normalize_token(s);
    TaskPriority::ALL
      .into_iter()
      .find(|priority| {
        priority.as_wire() == token
      })
      .ok_or_else(|| ParseEnumError {
        kind:  "priority",
        value: s.to_string()
      })
  }
}

impl fmt::Display for TaskStatus {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_wire())
  }
}

impl fmt::Display for TaskPriority {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_wire())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn backend_task_deserializes_with_defaults()
   {
    let raw = r#"{
      "id": 7,
      "title": "Ship release",
      "due_date": null,
      "priority": "HIGH",
      "status": "IN_PROGRESS",
      "created_at": "2026-01-01T00:00:00Z"
    }"#;
    let task: TaskDto =
      serde_json::from_str(raw)
        .expect("parse task");

    assert_eq!(task.id, Some(7));
    assert_eq!(task.description, "");
    assert_eq!(task.due_date, None);
    assert_eq!(
      task.priority,
      TaskPriority::High
    );
    assert_eq!(
      task.status,
      TaskStatus::InProgress
    );
    assert!(!task.starred);
  }

  #[test]
  fn payload_keeps_explicit_null_due_date()
   {
    let payload = TaskPayload {
      id:          None,
      title:       "Write report"
        .to_string(),
      description: String::new(),
      due_date:    None,
      priority:    TaskPriority::Medium,
      status:      TaskStatus::Pending,
      starred:     false
    };
    let value =
      serde_json::to_value(&payload)
        .expect("serialize payload");

    assert!(value["due_date"].is_null());
    assert!(
      value
        .as_object()
        .expect("object")
        .contains_key("due_date")
    );
    assert_eq!(value["status"], "PENDING");
    assert!(value.get("id").is_none());
  }

  #[test]
  fn stored_task_payload_carries_id() {
    let task = TaskDto {
      id:          Some(7),
      title:       "Ship release"
        .to_string(),
      description: String::new(),
      due_date:    None,
      priority:    TaskPriority::High,
      status:      TaskStatus::Pending,
      starred:     true
    };
    let value = serde_json::to_value(
      task.to_payload()
    )
    .expect("serialize payload");

    assert_eq!(value["id"], 7);
    assert_eq!(value["starred"], true);
  }

  #[test]
  fn enum_tokens_parse_loosely() {
    assert_eq!(
      "in progress".parse::<TaskStatus>(),
      Ok(TaskStatus::InProgress)
    );
    assert_eq!(
      "in-progress".parse::<TaskStatus>(),
      Ok(TaskStatus::InProgress)
    );
    assert_eq!(
      "high".parse::<TaskPriority>(),
      Ok(TaskPriority::High)
    );
    assert!(
      "urgent"
        .parse::<TaskPriority>()
        .is_err()
    );
    assert_eq!(
      TaskStatus::InProgress.badge(),
      "IN PROGRESS"
    );
  }
}
