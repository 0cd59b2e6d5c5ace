use anyhow::anyhow;
use taskdeck_shared::{TaskDto, TaskId};
use tracing::{debug, error, info, instrument, warn};

use crate::api::{ApiError, ApiResult, TaskApi};
use crate::editor::{EditorTarget, FormField, SaveOutcome, TaskEditor};
use crate::filter::{PriorityFilter, StatusFilter, TaskFilter};
use crate::session::{SessionStorage, clear_tokens};

pub const DELETE_PROMPT: &str = "Are you sure?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
        }
    }
}

pub trait Navigator {
    fn navigate(&mut self, route: Route);
}

/// Interactive yes/no gate in front of destructive actions.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Sequence number of a load. Only the most recently issued one may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibleTasks<'a> {
    Loading,
    Ready(Vec<&'a TaskDto>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Cancelled,
    Deleted,
}

pub struct TaskListController<A> {
    api: A,
    tasks: Vec<TaskDto>,
    filter: TaskFilter,
    editor: TaskEditor,
    loading: bool,
    issued: u64,
}

impl<A> TaskListController<A>
where
    A: TaskApi,
{
    /// Starts in the loading state; nothing is shown until the first load.
    pub fn new(api: A) -> Self {
        Self {
            api,
            tasks: Vec::new(),
            filter: TaskFilter::default(),
            editor: TaskEditor::new(),
            loading: true,
            issued: 0,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn tasks(&self) -> &[TaskDto] {
        &self.tasks
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn editor(&self) -> &TaskEditor {
        &self.editor
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.filter.status = status;
    }

    pub fn set_priority_filter(&mut self, priority: PriorityFilter) {
        self.filter.priority = priority;
    }

    pub fn set_starred_only(&mut self, starred_only: bool) {
        self.filter.starred_only = starred_only;
    }

    pub fn toggle_starred_only(&mut self) {
        self.filter.starred_only = !self.filter.starred_only;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filter.search = search.into();
    }

    /// Derived on every call from the full collection and current filters.
    pub fn visible(&self) -> VisibleTasks<'_> {
        if self.loading {
            return VisibleTasks::Loading;
        }
        VisibleTasks::Ready(self.filter.apply(&self.tasks))
    }

    pub fn find(&self, id: TaskId) -> Option<&TaskDto> {
        self.tasks.iter().find(|task| task.id == Some(id))
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        self.loading = true;
        debug!(ticket = self.issued, "load started");
        LoadTicket(self.issued)
    }

    /// Applies `result` if `ticket` is the latest load. Returns whether it did.
    ///
    /// A failure is logged and leaves the collection as it was.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: ApiResult<Vec<TaskDto>>) -> bool {
        if ticket.0 != self.issued {
            debug!(
                ticket = ticket.0,
                latest = self.issued,
                "discarding stale load result"
            );
            return false;
        }

        self.loading = false;
        match result {
            Ok(tasks) => {
                info!(count = tasks.len(), "tasks loaded");
                self.tasks = tasks;
            }
            Err(err) => {
                error!(error = %err, kept = self.tasks.len(), "failed to fetch tasks");
            }
        }
        true
    }

    #[instrument(skip(self))]
    pub async fn load(&mut self) {
        let ticket = self.begin_load();
        let result = self.api.list_tasks().await;
        self.finish_load(ticket, result);
    }

    /// Deletes after an affirmative confirmation, then reloads.
    ///
    /// A failed delete is returned as is; no reload happens in that case.
    #[instrument(skip(self, confirm))]
    pub async fn delete<C>(&mut self, id: TaskId, confirm: &mut C) -> ApiResult<DeleteOutcome>
    where
        C: Confirm + ?Sized,
    {
        if !confirm.confirm(DELETE_PROMPT) {
            debug!("delete not confirmed");
            return Ok(DeleteOutcome::Cancelled);
        }

        if let Err(err) = self.api.delete_task(id).await {
            error!(error = %err, "failed to delete task");
            return Err(err);
        }

        info!("task deleted");
        self.load().await;
        Ok(DeleteOutcome::Deleted)
    }

    pub fn open_create(&mut self) {
        self.editor.open(EditorTarget::Create);
    }

    pub fn open_edit(&mut self, task: TaskDto) {
        self.editor.open(EditorTarget::Edit(task));
    }

    pub fn open_edit_by_id(&mut self, id: TaskId) -> anyhow::Result<()> {
        let task = self
            .find(id)
            .cloned()
            .ok_or_else(|| anyhow!("task {id} is not in the loaded collection"))?;
        self.open_edit(task);
        Ok(())
    }

    pub fn update_field(&mut self, field: FormField) -> bool {
        self.editor.update(field)
    }

    pub fn cancel_editor(&mut self) {
        self.editor.cancel();
    }

    /// Saves the open editor; a successful save triggers a reload.
    #[instrument(skip(self))]
    pub async fn save_editor(&mut self) -> SaveOutcome {
        let outcome = self.editor.save(&self.api).await;
        if let SaveOutcome::Saved(_) = &outcome {
            self.load().await;
        }
        outcome
    }

    /// Flips `starred` by replacing the whole record, then reloads.
    #[instrument(skip(self))]
    pub async fn toggle_star(&mut self, id: TaskId) -> anyhow::Result<TaskDto> {
        let mut task = self
            .find(id)
            .cloned()
            .ok_or_else(|| anyhow!("task {id} is not in the loaded collection"))?;
        task.starred = !task.starred;

        let updated = self
            .api
            .update_task(id, &task.to_payload())
            .await
            .map_err(|err: ApiError| {
                warn!(error = %err, "failed to toggle star");
                anyhow::Error::new(err).context(format!("failed to update task {id}"))
            })?;

        self.load().await;
        Ok(updated)
    }
}

/// Drops local credentials and routes to the login screen. No API call, and
/// the route change happens even when clearing storage fails.
#[instrument(skip_all)]
pub fn logout<S, N>(storage: &mut S, navigator: &mut N)
where
    S: SessionStorage + ?Sized,
    N: Navigator + ?Sized,
{
    if let Err(err) = clear_tokens(storage) {
        error!(error = %err, "failed to clear session tokens");
    }
    navigator.navigate(Route::Login);
}
