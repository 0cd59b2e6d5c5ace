use std::fmt;
use std::str::FromStr;

use taskdeck_shared::{
  ParseEnumError,
  TaskDto,
  TaskPriority,
  TaskStatus
};
use tracing::trace;

/// Status criterion. `All` is the identity predicate.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default,
)]
pub enum StatusFilter {
  #[default]
  All,
  Only(TaskStatus)
}

/// Priority criterion. `All` is the identity predicate.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default,
)]
pub enum PriorityFilter {
  #[default]
  All,
  Only(TaskPriority)
}

impl StatusFilter {
  fn admits(
    self,
    status: TaskStatus
  ) -> bool {
    match self {
      | StatusFilter::All => true,
      | StatusFilter::Only(wanted) => {
        wanted == status
      }
    }
  }
}

impl PriorityFilter {
  fn admits(
    self,
    priority: TaskPriority
  ) -> bool {
    match self {
      | PriorityFilter::All => true,
      | PriorityFilter::Only(wanted) => {
        wanted == priority
      }
    }
  }
}

impl FromStr for StatusFilter {
  type Err = ParseEnumError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all")
    {
      return Ok(StatusFilter::All);
    }
    s.parse().map(StatusFilter::Only)
  }
}

impl FromStr for PriorityFilter {
  type Err = ParseEnumError;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all")
    {
      return Ok(PriorityFilter::All);
    }
    s.parse().map(PriorityFilter::Only)
  }
}

impl fmt::Display for StatusFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | StatusFilter::All => {
        f.write_str("ALL")
      }
      | StatusFilter::Only(status) => {
        write!(f, "{status}")
      }
    }
  }
}

impl fmt::Display for PriorityFilter {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    match self {
      | PriorityFilter::All => {
        f.write_str("ALL")
      }
      | PriorityFilter::Only(priority) => {
        write!(f, "{priority}")
      }
    }
  }
}

/// The four dashboard criteria, ANDed together.
#[derive(
  Debug, Clone, PartialEq, Eq, Default,
)]
pub struct TaskFilter {
  pub status:       StatusFilter,
  pub priority:     PriorityFilter,
  pub starred_only: bool,
  pub search:       String
}

impl TaskFilter {
  pub fn is_identity(&self) -> bool {
    self.status == StatusFilter::All
      && self.priority
        == PriorityFilter::All
      && !self.starred_only
      && self.search.is_empty()
  }

  pub fn matches(
    &self,
    task: &TaskDto
  ) -> bool {
    let status_match =
      self.status.admits(task.status);
    let priority_match = self
      .priority
      .admits(task.priority);
    let starred_match =
      !self.starred_only || task.starred;
    let search_match =
      title_contains(&task.title, &self.search);

    status_match
      && priority_match
      && starred_match
      && search_match
  }

  /// Borrowing view over `tasks`; the collection itself is never touched.
  #[tracing::instrument(skip(self, tasks), fields(total = tasks.len()))]
  pub fn apply<'a>(
    &self,
    tasks: &'a [TaskDto]
  ) -> Vec<&'a TaskDto> {
    let visible: Vec<&TaskDto> = tasks
      .iter()
      .filter(|task| self.matches(task))
      .collect();
    trace!(
      visible = visible.len(),
      "filtered task collection"
    );
    visible
  }
}

fn title_contains(
  title: &str,
  query: &str
) -> bool {
  if query.is_empty() {
    return true;
  }
  title
    .to_lowercase()
    .contains(&query.to_lowercase())
}

#[cfg(test)]
mod tests {
  use taskdeck_shared::{
    TaskDto,
    TaskPriority,
    TaskStatus
  };

  use super::{
    PriorityFilter,
    StatusFilter,
    TaskFilter
  };

  fn task(
    id: u64,
    title: &str,
    status: TaskStatus,
    priority: TaskPriority,
    starred: bool
  ) -> TaskDto {
    TaskDto {
      id: Some(id),
      title: title.to_string(),
      description: String::new(),
      due_date: None,
      priority,
      status,
      starred
    }
  }

  fn sample() -> Vec<TaskDto> {
    vec![
      task(
        1,
        "Buy milk",
        TaskStatus::Pending,
        TaskPriority::Low,
        false
      ),
      task(
        2,
        "Ship release",
        TaskStatus::Completed,
        TaskPriority::High,
        true
      ),
      task(
        3,
        "Plan Sprint",
        TaskStatus::InProgress,
        TaskPriority::Medium,
        true
      ),
      task(
        4,
        "Archive mail",
        TaskStatus::Completed,
        TaskPriority::Low,
        false
      ),
    ]
  }

  fn ids(tasks: &[&TaskDto]) -> Vec<u64> {
    tasks
      .iter()
      .filter_map(|task| task.id)
      .collect()
  }

  #[test]
  fn starred_only_keeps_starred_tasks() {
    let tasks = sample();
    let filter = TaskFilter {
      starred_only: true,
      ..TaskFilter::default()
    };

    assert_eq!(
      ids(&filter.apply(&tasks[..2])),
      vec![2]
    );
  }

  #[test]
  fn status_and_search_compose() {
    let tasks = sample();
    let filter = TaskFilter {
      status: StatusFilter::Only(
        TaskStatus::Completed
      ),
      search: "A".to_string(),
      ..TaskFilter::default()
    };

    // Both completed tasks contain an "a" in the title.
    assert_eq!(
      ids(&filter.apply(&tasks)),
      vec![2, 4]
    );

    let narrower = TaskFilter {
      search: "MAIL".to_string(),
      ..filter
    };
    assert_eq!(
      ids(&narrower.apply(&tasks)),
      vec![4]
    );
  }

  #[test]
  fn all_criteria_are_the_identity() {
    let tasks = sample();
    let filter = TaskFilter::default();

    assert!(filter.is_identity());
    assert_eq!(
      ids(&filter.apply(&tasks)),
      vec![1, 2, 3, 4]
    );
  }

  #[test]
  fn every_combination_equals_conjunction()
   {
    let tasks = sample();
    let statuses = [
      StatusFilter::All,
      StatusFilter::Only(
        TaskStatus::Pending
      ),
      StatusFilter::Only(
        TaskStatus::InProgress
      ),
      StatusFilter::Only(
        TaskStatus::Completed
      )
    ];
    let priorities = [
      PriorityFilter::All,
      PriorityFilter::Only(
        TaskPriority::Low
      ),
      PriorityFilter::Only(
        TaskPriority::Medium
      ),
      PriorityFilter::Only(
        TaskPriority::High
      )
    ];

    for status in statuses {
      for priority in priorities {
        for starred_only in [false, true] {
          for search in ["", "a", "SPRINT"] {
            let filter = TaskFilter {
              status,
              priority,
              starred_only,
              search: search.to_string()
            };
            let expected: Vec<u64> = tasks
              .iter()
              .filter(|t| {
                (status == StatusFilter::All
                  || status
                    == StatusFilter::Only(
                      t.status
                    ))
                  && (priority
                    == PriorityFilter::All
                    || priority
                      == PriorityFilter::Only(
                        t.priority
                      ))
                  && (!starred_only
                    || t.starred)
                  && t
                    .title
                    .to_lowercase()
                    .contains(
                      &search.to_lowercase()
                    )
              })
              .filter_map(|t| t.id)
              .collect();

            assert_eq!(
              ids(&filter.apply(&tasks)),
              expected,
              "{filter:?}"
            );
          }
        }
      }
    }
  }

  #[test]
  fn filter_tokens_parse() {
    assert_eq!(
      "ALL".parse::<StatusFilter>(),
      Ok(StatusFilter::All)
    );
    assert_eq!(
      "completed".parse::<StatusFilter>(),
      Ok(StatusFilter::Only(
        TaskStatus::Completed
      ))
    );
    assert_eq!(
      "all".parse::<PriorityFilter>(),
      Ok(PriorityFilter::All)
    );
    assert!(
      "soon"
        .parse::<PriorityFilter>()
        .is_err()
    );
  }
}
