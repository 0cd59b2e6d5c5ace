use std::io::{self, BufRead, Write};

use anyhow::{Context, anyhow, bail};
use taskdeck_shared::TaskId;
use tracing::{debug, info, instrument, warn};

use crate::api::TaskApi;
use crate::cli::{AddArgs, Command, EditArgs, ListArgs, LoginArgs};
use crate::config::Config;
use crate::controller::{DeleteOutcome, Navigator, Route, TaskListController, logout};
use crate::editor::{FormField, SaveOutcome};
use crate::filter::TaskFilter;
use crate::render::Renderer;
use crate::session::{SessionStorage, store_tokens};

/// Prints where the user has to go next instead of switching screens.
#[derive(Debug, Default)]
pub struct TerminalNavigator {
    pub last: Option<Route>,
}

impl Navigator for TerminalNavigator {
    fn navigate(&mut self, route: Route) {
        debug!(route = route.path(), "navigating");
        self.last = Some(route);
        if route == Route::Login {
            println!(
                "Logged out. Sign in again ({}): taskdeck login --access-token <T> --refresh-token <T>",
                route.path()
            );
        }
    }
}

#[instrument(skip_all)]
pub async fn dispatch<A, S>(
    controller: &mut TaskListController<A>,
    session: &mut S,
    cfg: &Config,
    renderer: &Renderer,
    command: Command,
) -> anyhow::Result<()>
where
    A: TaskApi,
    S: SessionStorage + ?Sized,
{
    match command {
        Command::List(args) => list(controller, renderer, args).await,
        Command::Add(args) => add(controller, renderer, args).await,
        Command::Edit(args) => edit(controller, renderer, args).await,
        Command::Delete(args) => {
            let skip_prompt = args.yes || !cfg.confirm_enabled();
            delete(controller, args.id, skip_prompt).await
        }
        Command::Star(args) => {
            controller.load().await;
            let updated = controller.toggle_star(args.id).await?;
            info!(id = args.id, starred = updated.starred, "star toggled");
            renderer.print_task_info(&updated)
        }
        local @ (Command::Login(_) | Command::Logout) => {
            dispatch_local(session, local).map(drop)
        }
    }
}

/// Runs commands that only touch the session store and hands every other
/// command back untouched. Needs no API client, renderer or runtime.
#[instrument(skip_all)]
pub fn dispatch_local<S>(session: &mut S, command: Command) -> anyhow::Result<Option<Command>>
where
    S: SessionStorage + ?Sized,
{
    match command {
        Command::Login(args) => login(session, args).map(|()| None),
        Command::Logout => {
            let mut navigator = TerminalNavigator::default();
            logout(session, &mut navigator);
            Ok(None)
        }
        other => Ok(Some(other)),
    }
}

async fn list<A: TaskApi>(
    controller: &mut TaskListController<A>,
    renderer: &Renderer,
    args: ListArgs,
) -> anyhow::Result<()> {
    controller.set_filter(TaskFilter {
        status: args.status,
        priority: args.priority,
        starred_only: args.starred,
        search: args.search,
    });
    controller.load().await;
    renderer.print_visible(&controller.visible())
}

async fn add<A: TaskApi>(
    controller: &mut TaskListController<A>,
    renderer: &Renderer,
    args: AddArgs,
) -> anyhow::Result<()> {
    controller.open_create();
    for field in add_fields(args) {
        controller.update_field(field);
    }
    finish_save(controller, renderer).await
}

async fn edit<A: TaskApi>(
    controller: &mut TaskListController<A>,
    renderer: &Renderer,
    args: EditArgs,
) -> anyhow::Result<()> {
    controller.load().await;
    controller.open_edit_by_id(args.id)?;
    for field in edit_fields(args) {
        controller.update_field(field);
    }
    finish_save(controller, renderer).await
}

async fn finish_save<A: TaskApi>(
    controller: &mut TaskListController<A>,
    renderer: &Renderer,
) -> anyhow::Result<()> {
    let heading = controller
        .editor()
        .session()
        .map(|open| open.target.heading())
        .unwrap_or("Task");

    match controller.save_editor().await {
        SaveOutcome::Saved(task) => {
            println!("Saved task {}.", display_id(task.id));
            renderer.print_task_info(&task)
        }
        SaveOutcome::Rejected(message) => bail!("{heading}: {message}"),
        SaveOutcome::NotOpen => Err(anyhow!("editor was not open")),
    }
}

async fn delete<A: TaskApi>(
    controller: &mut TaskListController<A>,
    id: TaskId,
    skip_prompt: bool,
) -> anyhow::Result<()> {
    controller.load().await;

    let result = if skip_prompt {
        let mut confirm = |_: &str| true;
        controller.delete(id, &mut confirm).await
    } else {
        let mut confirm = |prompt: &str| prompt_yes_no(prompt);
        controller.delete(id, &mut confirm).await
    };
    let outcome = result.with_context(|| format!("failed to delete task {id}"))?;

    match outcome {
        DeleteOutcome::Deleted => println!("Deleted task {id}."),
        DeleteOutcome::Cancelled => println!("Task {id} kept."),
    }
    Ok(())
}

fn login<S: SessionStorage + ?Sized>(session: &mut S, args: LoginArgs) -> anyhow::Result<()> {
    if args.access_token.trim().is_empty() {
        bail!("access token cannot be empty");
    }
    store_tokens(session, args.access_token.trim(), args.refresh_token.trim())?;
    println!("Session tokens stored.");
    Ok(())
}

pub fn add_fields(args: AddArgs) -> Vec<FormField> {
    let mut fields = vec![FormField::Title(args.title)];
    if let Some(description) = args.description {
        fields.push(FormField::Description(description));
    }
    if let Some(due) = args.due {
        fields.push(FormField::DueDate(due));
    }
    if let Some(priority) = args.priority {
        fields.push(FormField::Priority(priority));
    }
    if let Some(status) = args.status {
        fields.push(FormField::Status(status));
    }
    if args.starred {
        fields.push(FormField::Starred(true));
    }
    fields
}

pub fn edit_fields(args: EditArgs) -> Vec<FormField> {
    let mut fields = Vec::new();
    if let Some(title) = args.title {
        fields.push(FormField::Title(title));
    }
    if let Some(description) = args.description {
        fields.push(FormField::Description(description));
    }
    if args.clear_due {
        fields.push(FormField::DueDate(String::new()));
    } else if let Some(due) = args.due {
        fields.push(FormField::DueDate(due));
    }
    if let Some(priority) = args.priority {
        fields.push(FormField::Priority(priority));
    }
    if let Some(status) = args.status {
        fields.push(FormField::Status(status));
    }
    if let Some(starred) = args.starred {
        fields.push(FormField::Starred(starred));
    }
    fields
}

fn prompt_yes_no(prompt: &str) -> bool {
    let mut stderr = io::stderr().lock();
    if write!(stderr, "{prompt} [y/N] ")
        .and_then(|_| stderr.flush())
        .is_err()
    {
        return false;
    }

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(err) => {
            warn!(error = %err, "failed reading confirmation");
            false
        }
    }
}

fn display_id(id: Option<TaskId>) -> String {
    id.map(|value| value.to_string())
        .unwrap_or_else(|| "-".to_string())
}
