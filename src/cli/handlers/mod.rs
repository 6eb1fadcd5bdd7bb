use std::error::Error;
use std::time::Duration;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::cli::shell;
use crate::io::config_io;
use crate::io::gateway::{HttpGateway, TaskGateway};
use crate::io::slot_store::{FileStore, SlotStore};
use crate::model::category::{CATEGORY_COLORS, color_by_name};
use crate::model::config::Settings;
use crate::model::task::{TaskId, TaskPatch};
use crate::model::view::ViewSpec;
use crate::ops::categories::CategoryRegistry;
use crate::ops::engine::TaskEngine;

pub type CmdResult = Result<(), Box<dyn Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(config_io::default_data_dir);
    let mut settings = config_io::read_settings(&data_dir)?;
    if let Some(base_url) = cli.base_url {
        settings.remote.base_url = base_url;
    }

    let gateway = HttpGateway::new(
        &settings.remote.base_url,
        settings.remote.user_id,
        settings.remote.timeout_secs.map(Duration::from_secs),
    )?;
    let store = FileStore::new(&data_dir);
    let mut session = Session::new(gateway, store, &settings, cli.json);

    match cli.command {
        Some(Commands::Shell) => shell::run(&mut session),
        Some(cmd) => session.run(cmd),
        None => session.run(Commands::List(ListArgs::default())),
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An engine and category registry sharing one store. Tasks are fetched on
/// the first command that needs them and kept for the session's lifetime.
pub struct Session<G, S> {
    pub engine: TaskEngine<G, S>,
    pub categories: CategoryRegistry<S>,
    loaded: bool,
    json: bool,
}

impl<G: TaskGateway, S: SlotStore + Clone> Session<G, S> {
    pub fn new(gateway: G, store: S, settings: &Settings, json: bool) -> Self {
        Session {
            categories: CategoryRegistry::open(store.clone()),
            engine: TaskEngine::from_settings(gateway, store, settings),
            loaded: false,
            json,
        }
    }

    pub fn run(&mut self, cmd: Commands) -> CmdResult {
        match cmd {
            // Read commands
            Commands::List(args) => self.cmd_list(args),

            // Write commands
            Commands::Add(args) => self.cmd_add(args),
            Commands::Edit(args) => self.cmd_edit(args),
            Commands::Toggle(args) => self.with_task(args.id, |engine| engine.toggle(args.id)),
            Commands::Done(args) => self.with_task(args.id, |engine| {
                engine.update(args.id, TaskPatch::completed(true))
            }),
            Commands::Undone(args) => self.with_task(args.id, |engine| {
                engine.update(args.id, TaskPatch::completed(false))
            }),
            Commands::Rm(args) => self.with_task(args.id, |engine| engine.delete(args.id)),
            Commands::Mv(args) => self.cmd_mv(args),
            Commands::Assign(args) => self.cmd_assign(args),

            // Categories don't need the task list
            Commands::Categories(args) => self.cmd_categories(args),

            Commands::Reload => {
                self.loaded = false;
                self.ensure_loaded()?;
                if !self.json {
                    println!("loaded {} tasks", self.engine.tasks().len());
                }
                Ok(())
            }
            Commands::Shell => Err("already in a shell".into()),
        }
    }

    /// Load tasks if this session hasn't yet; a failed load is retried next time
    pub fn ensure_loaded(&mut self) -> CmdResult {
        if self.loaded {
            return Ok(());
        }
        self.engine.load();
        if let Some(err) = self.engine.error() {
            return Err(format!("could not load tasks: {}", err).into());
        }
        self.loaded = true;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn require_task(&self, id: TaskId) -> CmdResult {
        if self.engine.task(id).is_none() {
            return Err(format!("task not found: {}", id).into());
        }
        Ok(())
    }

    /// Load, check the task exists, then run an engine operation on it
    fn with_task<F, E>(&mut self, id: TaskId, op: F) -> CmdResult
    where
        F: FnOnce(&mut TaskEngine<G, S>) -> Result<(), E>,
        E: Error + 'static,
    {
        self.ensure_loaded()?;
        self.require_task(id)?;
        op(&mut self.engine)?;
        Ok(())
    }

    /// Category id for a user-supplied id or name
    fn resolve_category(&self, id_or_name: &str) -> Result<String, Box<dyn Error>> {
        self.categories
            .resolve(id_or_name)
            .map(|c| c.id.clone())
            .ok_or_else(|| format!("category not found: {}", id_or_name).into())
    }

    fn view_from_args(&self, args: &ListArgs) -> Result<ViewSpec, Box<dyn Error>> {
        let mut view = ViewSpec::default();
        if let Some(ref status) = args.status {
            view.status = parse_status_filter(status)?;
        }
        if let Some(ref sort) = args.sort {
            view.sort = parse_sort_mode(sort)?;
        }
        if let Some(ref search) = args.search {
            view.search = search.clone();
        }
        if let Some(ref category) = args.category {
            view.category_id = Some(self.resolve_category(category)?);
        }
        Ok(view)
    }

    // -----------------------------------------------------------------------
    // Task commands
    // -----------------------------------------------------------------------

    fn cmd_list(&mut self, args: ListArgs) -> CmdResult {
        let view = self.view_from_args(&args)?;
        self.ensure_loaded()?;
        self.engine.set_view(view);

        let visible = self.engine.visible();
        if self.json {
            let tasks: Vec<TaskJson> = visible
                .iter()
                .map(|t| {
                    let category = self.categories.get(t.category_id.as_deref());
                    task_to_json(t, category, !self.engine.is_remote(t))
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        } else if visible.is_empty() {
            println!("no tasks");
        } else {
            for task in visible {
                let category = self.categories.get(task.category_id.as_deref());
                println!("{}", format_task_line(task, category));
            }
        }
        Ok(())
    }

    fn cmd_add(&mut self, args: AddArgs) -> CmdResult {
        let category_id = args
            .category
            .as_deref()
            .map(|c| self.resolve_category(c))
            .transpose()?;
        self.ensure_loaded()?;

        let id = self
            .engine
            .create(&args.text, category_id.as_deref())?
            .ok_or("task text is empty")?;
        if self.json {
            println!("{}", serde_json::to_string(&CreatedJson { id })?);
        } else {
            println!("{}", id);
        }
        Ok(())
    }

    fn cmd_edit(&mut self, args: EditArgs) -> CmdResult {
        if args.text.trim().is_empty() {
            return Err("task text is empty".into());
        }
        self.with_task(args.id, |engine| {
            engine.update(args.id, TaskPatch::text(args.text))
        })
    }

    fn cmd_mv(&mut self, args: MvArgs) -> CmdResult {
        self.ensure_loaded()?;
        self.require_task(args.id)?;
        self.require_task(args.over)?;
        self.engine.reorder(args.id, args.over);
        Ok(())
    }

    fn cmd_assign(&mut self, args: AssignArgs) -> CmdResult {
        let category_id = args
            .category
            .as_deref()
            .map(|c| self.resolve_category(c))
            .transpose()?;
        self.ensure_loaded()?;
        self.require_task(args.id)?;
        self.engine
            .assign_category(args.id, category_id.as_deref());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Category commands
    // -----------------------------------------------------------------------

    fn cmd_categories(&mut self, args: CategoriesCmd) -> CmdResult {
        match args.action.unwrap_or(CategoryAction::List) {
            CategoryAction::List => {
                if self.json {
                    let all: Vec<CategoryJson> =
                        self.categories.all().iter().map(category_to_json).collect();
                    println!("{}", serde_json::to_string_pretty(&all)?);
                } else {
                    for category in self.categories.all() {
                        println!("{}", format_category_line(category));
                    }
                }
                Ok(())
            }
            CategoryAction::Add(a) => {
                let color = resolve_color(a.color.as_deref());
                let category = self
                    .categories
                    .add(&a.name, &color)?
                    .ok_or("category name is empty")?;
                if self.json {
                    println!("{}", serde_json::to_string(&category_to_json(&category))?);
                } else {
                    println!("{}", category.id);
                }
                Ok(())
            }
            CategoryAction::Edit(a) => {
                let current = self
                    .categories
                    .resolve(&a.category)
                    .cloned()
                    .ok_or_else(|| format!("category not found: {}", a.category))?;
                let name = a.name.unwrap_or(current.name);
                let color = match a.color {
                    Some(ref c) => resolve_color(Some(c)),
                    None => current.color,
                };
                if !self.categories.update(&current.id, &name, &color)? {
                    return Err("category name is empty".into());
                }
                Ok(())
            }
            CategoryAction::Rm(a) => {
                let id = self.resolve_category(&a.category)?;
                self.categories.delete(&id)?;
                Ok(())
            }
        }
    }
}

/// Palette names map to their value; anything else is used verbatim
fn resolve_color(color: Option<&str>) -> String {
    match color {
        Some(c) => color_by_name(c).map(str::to_string).unwrap_or_else(|| c.to_string()),
        None => CATEGORY_COLORS[0].value.to_string(),
    }
}
