use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Formats a price in millions, e.g. `£7.5m`.
pub fn format_money(value: f64) -> String {
    if value < 0.0 {
        format!("-£{:.1}m", value.abs())
    } else {
        format!("£{value:.1}m")
    }
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |v| Cell::new(format_fn(v)).set_alignment(CellAlignment::Right),
    )
}

/// Right-aligned money cell, red when negative.
pub fn money_cell(value: f64) -> Cell {
    let cell = Cell::new(format_money(value)).set_alignment(CellAlignment::Right);
    if value < 0.0 { cell.fg(Color::Red) } else { cell }
}

/// Points gain with color coding.
pub fn gain_cell(gain: f64) -> Cell {
    let text = format!("{gain:+.1}");
    let color = if gain >= 0.0 { Color::Green } else { Color::Red };
    Cell::new(text)
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

/// Fixture with its difficulty rating, colored from easy (green) to hard
/// (red).
pub fn fixture_cell(fixture: Option<&str>, fdr: Option<u8>) -> Cell {
    let text = match (fixture, fdr) {
        (Some(f), Some(d)) => format!("{f} [{d}]"),
        (Some(f), None) => f.to_string(),
        (None, Some(d)) => format!("[{d}]"),
        (None, None) => "N/A".to_string(),
    };
    let color = match fdr {
        Some(1 | 2) => Color::Green,
        Some(3) => Color::Grey,
        Some(_) => Color::Red,
        None => Color::DarkGrey,
    };
    Cell::new(text).fg(color)
}

/// Creates a new `indicatif::ProgressBar` for a task reporting 0-100.
pub fn new_task_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}%")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(7.5), "£7.5m");
        assert_eq!(format_money(0.0), "£0.0m");
        assert_eq!(format_money(-1.3), "-£1.3m");
    }
}
