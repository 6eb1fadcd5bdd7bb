use serde::Serialize;

use crate::model::category::{Category, palette_name};
use crate::model::task::{Task, TaskId};
use crate::model::view::{SortMode, StatusFilter};
use crate::util::unicode::pad_to_width;

/// Width of the name column in category listings
const CATEGORY_NAME_CELLS: usize = 16;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub owner_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    /// Resolved category name; absent when unassigned or dangling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub local: bool,
}

#[derive(Serialize)]
pub struct CategoryJson {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Serialize)]
pub struct CreatedJson {
    pub id: TaskId,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(task: &Task, category: Option<&Category>, local: bool) -> TaskJson {
    TaskJson {
        id: task.id,
        text: task.text.clone(),
        completed: task.completed,
        owner_id: task.owner_id,
        category_id: task.category_id.clone(),
        category: category.map(|c| c.name.clone()),
        created_at: task.created_at.clone(),
        local,
    }
}

pub fn category_to_json(category: &Category) -> CategoryJson {
    CategoryJson {
        id: category.id.clone(),
        name: category.name.clone(),
        color: category.color.clone(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// One-line summary: `[x]   12  text (Category)`
pub fn format_task_line(task: &Task, category: Option<&Category>) -> String {
    let check = if task.completed { 'x' } else { ' ' };
    let category_str = category
        .map(|c| format!(" ({})", c.name))
        .unwrap_or_default();
    format!("[{}] {:>4}  {}{}", check, task.id, task.text, category_str)
}

/// `Name            #rrggbb  id`, with the palette name when the color has one
pub fn format_category_line(category: &Category) -> String {
    let color = match palette_name(&category.color) {
        Some(name) => format!("{} {}", category.color, name),
        None => category.color.clone(),
    };
    format!(
        "{}  {}  {}",
        pad_to_width(&category.name, CATEGORY_NAME_CELLS),
        color,
        category.id
    )
}

/// Parse a status filter string
pub fn parse_status_filter(s: &str) -> Result<StatusFilter, String> {
    match s {
        "all" => Ok(StatusFilter::All),
        "active" => Ok(StatusFilter::Active),
        "completed" | "done" => Ok(StatusFilter::Completed),
        _ => Err(format!(
            "unknown status '{}' (expected: all, active, completed)",
            s
        )),
    }
}

/// Parse a sort mode string
pub fn parse_sort_mode(s: &str) -> Result<SortMode, String> {
    match s {
        "default" => Ok(SortMode::Default),
        "name" => Ok(SortMode::Name),
        "status" => Ok(SortMode::Status),
        "date" => Ok(SortMode::Date),
        _ => Err(format!(
            "unknown sort '{}' (expected: default, name, status, date)",
            s
        )),
    }
}
