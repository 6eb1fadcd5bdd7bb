/// Completion-status filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

/// Ordering applied after filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Keep authoritative order
    #[default]
    Default,
    /// Ascending by text
    Name,
    /// Incomplete before complete
    Status,
    /// Newest `created_at` first (string comparison)
    Date,
}

/// Filter/sort specification consumed by the projector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewSpec {
    pub status: StatusFilter,
    /// Case-insensitive substring; empty matches everything
    pub search: String,
    pub category_id: Option<String>,
    pub sort: SortMode,
}
