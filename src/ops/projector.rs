use std::cmp::Ordering;

use crate::model::task::Task;
use crate::model::view::{SortMode, StatusFilter, ViewSpec};

/// Derive the visible sequence from the authoritative collection.
///
/// Filters are conjunctive (status, search, category). Sorting is stable, so
/// tasks that compare equal keep their authoritative order. Neither input is
/// modified.
pub fn project<'a>(tasks: &'a [Task], view: &ViewSpec) -> Vec<&'a Task> {
    let needle = view.search.to_lowercase();
    let mut visible: Vec<&Task> = tasks
        .iter()
        .filter(|task| passes(task, view, &needle))
        .collect();

    match view.sort {
        SortMode::Default => {}
        SortMode::Name => visible.sort_by(|a, b| compare_text(&a.text, &b.text)),
        SortMode::Status => visible.sort_by_key(|task| task.completed),
        SortMode::Date => visible.sort_by(|a, b| created_key(b).cmp(created_key(a))),
    }
    visible
}

fn passes(task: &Task, view: &ViewSpec, needle: &str) -> bool {
    match view.status {
        StatusFilter::Active if task.completed => return false,
        StatusFilter::Completed if !task.completed => return false,
        _ => {}
    }
    if !needle.is_empty() && !task.text.to_lowercase().contains(needle) {
        return false;
    }
    if let Some(ref category_id) = view.category_id
        && task.category_id.as_ref() != Some(category_id)
    {
        return false;
    }
    true
}

/// Case-folded first so "apple" and "Banana" order naturally; raw text breaks ties.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Plain string comparison on the timestamp; a missing stamp sorts as "".
fn created_key(task: &Task) -> &str {
    task.created_at.as_deref().unwrap_or("")
}
