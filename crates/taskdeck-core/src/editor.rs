use taskdeck_shared::{TaskDto, TaskId, TaskPayload, TaskPriority, TaskStatus};
use tracing::{debug, info, instrument, warn};

use crate::api::TaskApi;

pub const TITLE_REQUIRED_MESSAGE: &str = "Title is required.";

/// What the editor was opened for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorTarget {
    Create,
    Edit(TaskDto),
}

impl EditorTarget {
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            EditorTarget::Create => None,
            EditorTarget::Edit(task) => task.id,
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            EditorTarget::Create => "New Task",
            EditorTarget::Edit(_) => "Edit Task",
        }
    }

    fn same_identity(&self, other: &EditorTarget) -> bool {
        match (self, other) {
            (EditorTarget::Create, EditorTarget::Create) => true,
            (EditorTarget::Edit(a), EditorTarget::Edit(b)) => a.id == b.id,
            _ => false,
        }
    }
}

/// Form state. `due_date` holds the raw input; `""` means no date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub id: Option<TaskId>,
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub starred: bool,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self {
            id: None,
            title: String::new(),
            description: String::new(),
            due_date: String::new(),
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            starred: false,
        }
    }
}

impl TaskForm {
    pub fn from_task(task: &TaskDto) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date.clone().unwrap_or_default(),
            priority: task.priority,
            status: task.status,
            starred: task.starred,
        }
    }

    pub fn for_target(target: &EditorTarget) -> Self {
        match target {
            EditorTarget::Create => Self::default(),
            EditorTarget::Edit(task) => Self::from_task(task),
        }
    }

    /// Outgoing body. An empty due date is sent as `null`, never as `""`.
    /// The id rides along only when editing a stored task.
    pub fn to_payload(&self) -> TaskPayload {
        let due_date = if self.due_date.is_empty() {
            None
        } else {
            Some(self.due_date.clone())
        };

        TaskPayload {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            due_date,
            priority: self.priority,
            status: self.status,
            starred: self.starred,
        }
    }

    pub fn apply(&mut self, field: FormField) {
        match field {
            FormField::Title(value) => self.title = value,
            FormField::Description(value) => self.description = value,
            FormField::DueDate(value) => self.due_date = value,
            FormField::Priority(value) => self.priority = value,
            FormField::Status(value) => self.status = value,
            FormField::Starred(value) => self.starred = value,
        }
    }
}

/// A single-field edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormField {
    Title(String),
    Description(String),
    DueDate(String),
    Priority(TaskPriority),
    Status(TaskStatus),
    Starred(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenEditor {
    pub target: EditorTarget,
    pub form: TaskForm,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditorState {
    #[default]
    Closed,
    Open(OpenEditor),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Persisted; the editor is closed.
    Saved(TaskDto),
    /// Not persisted; the message is shown inline and the editor stays open.
    Rejected(String),
    NotOpen,
}

#[derive(Debug, Clone, Default)]
pub struct TaskEditor {
    state: EditorState,
}

impl TaskEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, EditorState::Open(_))
    }

    pub fn session(&self) -> Option<&OpenEditor> {
        match &self.state {
            EditorState::Open(open) => Some(open),
            EditorState::Closed => None,
        }
    }

    pub fn form(&self) -> Option<&TaskForm> {
        self.session().map(|open| &open.form)
    }

    pub fn error(&self) -> Option<&str> {
        self.session().and_then(|open| open.error.as_deref())
    }

    /// Opens on `target`. From closed, or on a different target, the form is
    /// reset and any error cleared; reopening the same target keeps the form.
    #[instrument(skip(self, target), fields(task_id = ?target.task_id()))]
    pub fn open(&mut self, target: EditorTarget) {
        if let EditorState::Open(open) = &self.state
            && open.target.same_identity(&target)
        {
            debug!("editor already open on this target");
            return;
        }

        let form = TaskForm::for_target(&target);
        debug!(heading = target.heading(), "opening editor");
        self.state = EditorState::Open(OpenEditor {
            target,
            form,
            error: None,
        });
    }

    pub fn update(&mut self, field: FormField) -> bool {
        match &mut self.state {
            EditorState::Open(open) => {
                open.form.apply(field);
                true
            }
            EditorState::Closed => false,
        }
    }

    pub fn cancel(&mut self) {
        if self.is_open() {
            debug!("editor cancelled");
        }
        self.state = EditorState::Closed;
    }

    /// Submits the form: update when it carries an id, create otherwise.
    #[instrument(skip(self, api))]
    pub async fn save<A>(&mut self, api: &A) -> SaveOutcome
    where
        A: TaskApi + ?Sized,
    {
        let EditorState::Open(open) = &mut self.state else {
            return SaveOutcome::NotOpen;
        };

        if open.form.title.is_empty() {
            open.error = Some(TITLE_REQUIRED_MESSAGE.to_string());
            return SaveOutcome::Rejected(TITLE_REQUIRED_MESSAGE.to_string());
        }

        let payload = open.form.to_payload();
        let result = match open.form.id {
            Some(id) => api.update_task(id, &payload).await,
            None => api.create_task(&payload).await,
        };

        match result {
            Ok(saved) => {
                info!(id = ?saved.id, "task saved");
                self.state = EditorState::Closed;
                SaveOutcome::Saved(saved)
            }
            Err(err) => {
                warn!(error = %err, "failed to save task");
                let message = err.save_message();
                open.error = Some(message.clone());
                SaveOutcome::Rejected(message)
            }
        }
    }
}
