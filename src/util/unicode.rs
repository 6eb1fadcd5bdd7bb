use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const ELLIPSIS: char = '\u{2026}';

/// Terminal cells taken by `s`
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cut `s` down to `max_cells`, ending in `…` when anything was dropped.
/// Wide graphemes are never split.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells == 0 {
        return String::new();
    }

    let budget = max_cells - 1;
    let mut width = 0;
    let mut result = String::new();
    for grapheme in s.graphemes(true) {
        let w = display_width(grapheme);
        if width + w > budget {
            break;
        }
        width += w;
        result.push_str(grapheme);
    }
    result.push(ELLIPSIS);
    result
}

/// Fit `s` into exactly `cells` columns: truncated if too wide, space-padded otherwise.
/// Used for the name column of category listings.
pub fn pad_to_width(s: &str, cells: usize) -> String {
    let fitted = truncate_to_width(s, cells);
    let pad = cells.saturating_sub(display_width(&fitted));
    format!("{}{}", fitted, " ".repeat(pad))
}
