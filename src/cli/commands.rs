use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::task::TaskId;

#[derive(Parser)]
#[command(name = "td", about = concat!("taskdeck v", env!("CARGO_PKG_VERSION"), " - remote tasks, local order"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding settings.toml and the local overlays
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the remote base URL from settings.toml
    #[arg(long = "base-url", global = true)]
    pub base_url: Option<String>,
}

/// One line typed into `td shell`
#[derive(Parser)]
#[command(name = "td", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List tasks (default)
    List(ListArgs),
    /// Add a task to the top of the list
    Add(AddArgs),
    /// Change a task's text
    Edit(EditArgs),
    /// Flip a task between done and not done
    Toggle(TaskIdArg),
    /// Mark a task done
    Done(TaskIdArg),
    /// Mark a task not done
    Undone(TaskIdArg),
    /// Delete a task
    Rm(TaskIdArg),
    /// Move a task to another task's position
    Mv(MvArgs),
    /// Set or clear a task's category
    Assign(AssignArgs),
    /// Manage categories
    Categories(CategoriesCmd),
    /// Fetch tasks from the remote again
    Reload,
    /// Interactive session that keeps tasks in memory between commands
    Shell,
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args, Default)]
pub struct ListArgs {
    /// Filter by status (all, active, completed)
    #[arg(long)]
    pub status: Option<String>,
    /// Case-insensitive text search
    #[arg(long)]
    pub search: Option<String>,
    /// Only tasks in this category (id or name)
    #[arg(long)]
    pub category: Option<String>,
    /// Sort order (default, name, status, date)
    #[arg(long)]
    pub sort: Option<String>,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task text
    pub text: String,
    /// Category id or name
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    pub id: TaskId,
    /// New text
    pub text: String,
}

#[derive(Args)]
pub struct TaskIdArg {
    pub id: TaskId,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task to move
    pub id: TaskId,
    /// Task whose position it takes
    pub over: TaskId,
}

#[derive(Args)]
pub struct AssignArgs {
    pub id: TaskId,
    /// Category id or name (omit to clear)
    pub category: Option<String>,
}

// ---------------------------------------------------------------------------
// Category args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct CategoriesCmd {
    #[command(subcommand)]
    pub action: Option<CategoryAction>,
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// List categories (default)
    List,
    /// Create a category
    Add(CategoryAddArgs),
    /// Rename or recolor a category
    Edit(CategoryEditArgs),
    /// Delete a category (tasks keep their reference)
    Rm(CategoryRefArg),
}

#[derive(Args)]
pub struct CategoryAddArgs {
    pub name: String,
    /// Palette color name (e.g. teal) or any color value
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args)]
pub struct CategoryEditArgs {
    /// Category id or name
    pub category: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args)]
pub struct CategoryRefArg {
    /// Category id or name
    pub category: String,
}
