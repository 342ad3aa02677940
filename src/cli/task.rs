//! Task commands shared by one-shot invocations and the shell.

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::output::{emit_success, HistoryDepth, HumanOutput, OutputOptions};
use crate::session::{Outcome, Persistence, Session};
use crate::store::Mutation;
use crate::task::{parse_custom_fields, NewTask, Task, TaskPatch, TaskPriority, TaskStatus};
use crate::view::{
    parse_priority_filter, parse_status_filter, project_board, project_list, BoardColumn,
    FilterConfig, SortConfig, SortDirection, SortField, ViewMode,
};

const SHORT_ID_LEN: usize = 8;

#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// Create a task
    Add(AddArgs),

    /// Edit fields of a task
    Update(UpdateArgs),

    /// Delete one or more tasks
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Move a task to another priority
    Priority(PriorityArgs),

    /// Set the manual order of a priority group on the board
    Reorder(ReorderArgs),

    /// Apply the same status/priority change to several tasks
    Batch(BatchArgs),

    /// List tasks (filtered and sorted)
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show tasks grouped by priority
    #[command(alias = "kanban")]
    Board(BoardArgs),

    /// Show one task
    Show(ShowArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task title
    pub title: String,

    #[arg(short, long, default_value = "")]
    pub description: String,

    /// not-started, in-progress, completed
    #[arg(short, long)]
    pub status: Option<String>,

    /// none, low, medium, high, urgent
    #[arg(short, long)]
    pub priority: Option<String>,

    /// Custom field as key=value (repeatable)
    #[arg(long = "field")]
    pub fields: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Task id or unique prefix
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    #[arg(short, long)]
    pub status: Option<String>,

    #[arg(short, long)]
    pub priority: Option<String>,

    /// Set a custom field as key=value (repeatable)
    #[arg(long = "field")]
    pub fields: Vec<String>,

    /// Remove a custom field (repeatable)
    #[arg(long = "unset")]
    pub unset: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PriorityArgs {
    pub id: String,
    pub priority: String,
}

#[derive(Args, Debug, Clone)]
pub struct ReorderArgs {
    /// Priority group to reorder
    pub priority: String,

    /// Ids in their new order
    #[arg(required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    #[arg(required = true)]
    pub ids: Vec<String>,

    #[arg(short, long)]
    pub status: Option<String>,

    #[arg(short, long)]
    pub priority: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Status filter or "all"
    #[arg(short, long)]
    pub status: Option<String>,

    /// Priority filter or "all"
    #[arg(short, long)]
    pub priority: Option<String>,

    /// Case-insensitive title search
    #[arg(long)]
    pub search: Option<String>,

    /// title, status, priority, created-at, updated-at
    #[arg(long)]
    pub sort: Option<String>,

    /// asc or desc
    #[arg(long)]
    pub direction: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct BoardArgs {
    #[arg(short, long)]
    pub status: Option<String>,

    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    pub id: String,
}

/// View settings a command starts from: config defaults for one-shot
/// commands, the live settings inside the shell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub mode: ViewMode,
    pub sort: SortConfig,
    pub filter: FilterConfig,
}

#[derive(Serialize)]
struct MutationReport<'a> {
    mutation: &'a str,
    touched: &'a [String],
    recorded: bool,
}

#[derive(Serialize)]
struct ListOutput<'a> {
    count: usize,
    sort: SortConfig,
    filter: &'a FilterConfig,
    tasks: Vec<&'a Task>,
}

#[derive(Serialize)]
struct BoardOutput<'a> {
    count: usize,
    filter: &'a FilterConfig,
    columns: Vec<BoardColumn<'a>>,
}

pub fn run<P: Persistence>(
    session: &mut Session<P>,
    command: TaskCommand,
    view: &ViewState,
    output: OutputOptions,
) -> Result<()> {
    match command {
        TaskCommand::Add(args) => run_add(session, args, output),
        TaskCommand::Update(args) => run_update(session, args, output),
        TaskCommand::Delete(args) => run_delete(session, args, output),
        TaskCommand::Priority(args) => run_priority(session, args, output),
        TaskCommand::Reorder(args) => run_reorder(session, args, output),
        TaskCommand::Batch(args) => run_batch(session, args, output),
        TaskCommand::List(args) => run_list(session, args, view, output),
        TaskCommand::Board(args) => run_board(session, args, view, output),
        TaskCommand::Show(args) => run_show(session, args, output),
    }
}

fn run_add<P: Persistence>(session: &mut Session<P>, args: AddArgs, output: OutputOptions) -> Result<()> {
    let mut fields = NewTask::new(args.title).with_description(args.description);
    if let Some(status) = args.status.as_deref() {
        fields = fields.with_status(status.parse()?);
    }
    if let Some(priority) = args.priority.as_deref() {
        fields = fields.with_priority(priority.parse()?);
    }
    fields.custom_fields = parse_custom_fields(&args.fields)?;

    let outcome = session.dispatch(Mutation::Create(fields))?;
    let task = touched_task(session, &outcome)?;

    let mut human = HumanOutput::new("Task created");
    push_task_summary(&mut human, task);
    human.hint(format!("taskdeck update {} --status in-progress", short_id(&task.id)));
    human.history(HistoryDepth::from(session.history()));
    emit_success(output, "add", task, &human)
}

fn run_update<P: Persistence>(
    session: &mut Session<P>,
    args: UpdateArgs,
    output: OutputOptions,
) -> Result<()> {
    let id = session.store().resolve_id(&args.id)?;
    let mut patch = TaskPatch {
        title: args.title,
        description: args.description,
        status: args.status.as_deref().map(str::parse::<TaskStatus>).transpose()?,
        priority: args.priority.as_deref().map(str::parse::<TaskPriority>).transpose()?,
        custom_fields: None,
    };
    if !args.fields.is_empty() || !args.unset.is_empty() {
        let mut fields = session
            .store()
            .get(&id)
            .map(|task| task.custom_fields.clone())
            .unwrap_or_default();
        for key in &args.unset {
            fields.remove(key.trim());
        }
        fields.extend(parse_custom_fields(&args.fields)?);
        patch.custom_fields = Some(fields);
    }
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to update; pass --title, --description, --status, --priority, --field or --unset"
                .to_string(),
        ));
    }

    let outcome = session.dispatch(Mutation::Update { id, patch })?;
    let task = touched_task(session, &outcome)?;

    let mut human = HumanOutput::new("Task updated");
    push_task_summary(&mut human, task);
    human.history(HistoryDepth::from(session.history()));
    emit_success(output, "update", task, &human)
}

fn run_delete<P: Persistence>(
    session: &mut Session<P>,
    args: DeleteArgs,
    output: OutputOptions,
) -> Result<()> {
    let mut ids = resolve_ids(session, &args.ids)?;
    let mutation = if ids.len() == 1 {
        Mutation::Delete(ids.remove(0))
    } else {
        Mutation::DeleteBatch(ids)
    };
    let outcome = session.dispatch(mutation)?;

    let mut human = HumanOutput::new(format!("Deleted {} task(s)", outcome.touched.len()));
    for id in &outcome.touched {
        human.line(id.clone());
    }
    emit_report(session, "delete", &outcome, human, output)
}

fn run_priority<P: Persistence>(
    session: &mut Session<P>,
    args: PriorityArgs,
    output: OutputOptions,
) -> Result<()> {
    let id = session.store().resolve_id(&args.id)?;
    let priority: TaskPriority = args.priority.parse()?;
    let outcome = session.dispatch(Mutation::ReassignPriority { id, priority })?;
    let task = touched_task(session, &outcome)?;

    let mut human = HumanOutput::new(format!("Moved to {priority}"));
    push_task_summary(&mut human, task);
    human.history(HistoryDepth::from(session.history()));
    emit_success(output, "priority", task, &human)
}

fn run_reorder<P: Persistence>(
    session: &mut Session<P>,
    args: ReorderArgs,
    output: OutputOptions,
) -> Result<()> {
    let priority: TaskPriority = args.priority.parse()?;
    let ids = resolve_ids(session, &args.ids)?;
    let outcome = session.dispatch(Mutation::Reorder {
        priority,
        ids: ids.clone(),
    })?;

    let mut human = HumanOutput::new(format!("Reordered {priority}"));
    for (index, id) in ids.iter().enumerate() {
        if outcome.touched.contains(id) {
            human.line(format!("{index}: {}", short_id(id)));
        } else {
            human.warn(format!("{} is not in the {priority} group; left as is", short_id(id)));
        }
    }
    emit_report(session, "reorder", &outcome, human, output)
}

fn run_batch<P: Persistence>(
    session: &mut Session<P>,
    args: BatchArgs,
    output: OutputOptions,
) -> Result<()> {
    let patch = TaskPatch {
        status: args.status.as_deref().map(str::parse::<TaskStatus>).transpose()?,
        priority: args.priority.as_deref().map(str::parse::<TaskPriority>).transpose()?,
        ..TaskPatch::default()
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "batch needs --status and/or --priority".to_string(),
        ));
    }
    let ids = resolve_ids(session, &args.ids)?;
    let outcome = session.dispatch(Mutation::BatchUpdate { ids, patch })?;

    let mut human = HumanOutput::new(format!("Updated {} task(s)", outcome.touched.len()));
    for id in &outcome.touched {
        human.line(id.clone());
    }
    emit_report(session, "batch", &outcome, human, output)
}

fn run_list<P: Persistence>(
    session: &Session<P>,
    args: ListArgs,
    view: &ViewState,
    output: OutputOptions,
) -> Result<()> {
    let filter = list_filter(&view.filter, &args)?;
    let mut sort = view.sort;
    if let Some(field) = args.sort.as_deref() {
        sort.field = field.parse::<SortField>()?;
    }
    if let Some(direction) = args.direction.as_deref() {
        sort.direction = direction.parse::<SortDirection>()?;
    }

    let tasks = project_list(session.items(), &filter, sort);
    let mut human = HumanOutput::new(format!("Tasks ({})", tasks.len()));
    human.field("Sort", sort.to_string());
    if !filter.is_empty() {
        human.field("Filter", describe_filter(&filter));
    }
    for task in &tasks {
        human.line(task_line(task));
    }
    if session.items().is_empty() {
        human.hint("taskdeck add \"<title>\"");
    }

    let data = ListOutput {
        count: tasks.len(),
        sort,
        filter: &filter,
        tasks,
    };
    emit_success(output, "list", &data, &human)
}

fn run_board<P: Persistence>(
    session: &Session<P>,
    args: BoardArgs,
    view: &ViewState,
    output: OutputOptions,
) -> Result<()> {
    let mut filter = view.filter.clone();
    if let Some(status) = args.status.as_deref() {
        filter.status = parse_status_filter(status)?;
    }
    if let Some(search) = args.search {
        filter.search_term = search;
    }

    let columns = project_board(session.items(), &filter);
    let count: usize = columns.iter().map(|column| column.tasks.len()).sum();
    let mut human = HumanOutput::new(format!("Board ({count})"));
    for column in &columns {
        human.field(column.priority.as_str(), column.tasks.len().to_string());
        for task in &column.tasks {
            human.line(format!("[{}] {}", column.priority, task_line(task)));
        }
    }

    let data = BoardOutput {
        count,
        filter: &filter,
        columns,
    };
    emit_success(output, "board", &data, &human)
}

fn run_show<P: Persistence>(session: &Session<P>, args: ShowArgs, output: OutputOptions) -> Result<()> {
    let id = session.store().resolve_id(&args.id)?;
    let task = session
        .store()
        .get(&id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))?;

    let mut human = HumanOutput::new(format!("Task {}", task.id));
    push_task_summary(&mut human, task);
    human.field("Created", task.created_at.to_rfc3339());
    human.field("Updated", task.updated_at.to_rfc3339());
    if let Some(position) = task.position {
        human.field("Position", position.to_string());
    }
    if !task.description.is_empty() {
        human.line(task.description.clone());
    }
    for (key, value) in &task.custom_fields {
        human.line(format!("{key} = {value}"));
    }
    emit_success(output, "show", task, &human)
}

fn list_filter(base: &FilterConfig, args: &ListArgs) -> Result<FilterConfig> {
    let mut filter = base.clone();
    if let Some(status) = args.status.as_deref() {
        filter.status = parse_status_filter(status)?;
    }
    if let Some(priority) = args.priority.as_deref() {
        filter.priority = parse_priority_filter(priority)?;
    }
    if let Some(search) = args.search.as_ref() {
        filter.search_term = search.clone();
    }
    Ok(filter)
}

fn resolve_ids<P: Persistence>(session: &Session<P>, inputs: &[String]) -> Result<Vec<String>> {
    inputs
        .iter()
        .map(|input| session.store().resolve_id(input))
        .collect()
}

fn touched_task<'a, P: Persistence>(session: &'a Session<P>, outcome: &Outcome) -> Result<&'a Task> {
    let id = outcome
        .touched
        .first()
        .ok_or_else(|| Error::TaskNotFound(outcome.mutation.to_string()))?;
    session
        .store()
        .get(id)
        .ok_or_else(|| Error::TaskNotFound(id.clone()))
}

fn emit_report<P: Persistence>(
    session: &Session<P>,
    command: &str,
    outcome: &Outcome,
    mut human: HumanOutput,
    output: OutputOptions,
) -> Result<()> {
    if outcome.touched.is_empty() {
        human.warn("no tasks matched");
    }
    let report = MutationReport {
        mutation: outcome.mutation,
        touched: &outcome.touched,
        recorded: outcome.recorded,
    };
    human.history(HistoryDepth::from(session.history()));
    emit_success(output, command, &report, &human)
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.field("ID", task.id.clone());
    human.field("Title", task.title.clone());
    human.field("Status", task.status.as_str());
    human.field("Priority", task.priority.as_str());
}

pub(crate) fn describe_filter(filter: &FilterConfig) -> String {
    let status = filter.status.map(|status| status.as_str()).unwrap_or("all");
    let priority = filter
        .priority
        .map(|priority| priority.as_str())
        .unwrap_or("all");
    let mut text = format!("status={status} priority={priority}");
    if !filter.search_term.is_empty() {
        text.push_str(&format!(" search={:?}", filter.search_term));
    }
    text
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

pub(crate) fn task_line(task: &Task) -> String {
    format!(
        "{}  {:<11}  {:<6}  {}",
        short_id(&task.id),
        task.status.as_str(),
        task.priority.as_str(),
        task.title
    )
}
