use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Stylize};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::BTreeMap;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

use crate::catalog_db::CatalogCounts;
use crate::pipeline::{BatchCounts, FailureReason};

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_styles() -> Styles {
    let heading = Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Green)));
    let literal = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
    let bad = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Red)));

    Styles::styled()
        .usage(heading)
        .header(heading)
        .literal(literal)
        .valid(literal)
        .invalid(bad)
        .error(bad)
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Color Palette
// ═══════════════════════════════════════════════════════════════════════════════

pub mod colors {
    use crossterm::style::Color;

    pub const GREEN: Color = Color::Rgb {
        r: 30,
        g: 215,
        b: 96,
    };
    pub const CYAN: Color = Color::Rgb {
        r: 0,
        g: 220,
        b: 220,
    };
    pub const ORANGE: Color = Color::Rgb {
        r: 255,
        g: 165,
        b: 0,
    };
    pub const RED: Color = Color::Rgb {
        r: 255,
        g: 85,
        b: 85,
    };
    pub const DIM: Color = Color::Rgb {
        r: 128,
        g: 128,
        b: 128,
    };
    pub const WHITE: Color = Color::Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
}

pub mod box_chars {
    pub const HORIZONTAL: &str = "─";
    pub const VERTICAL: &str = "│";
    pub const TOP_LEFT: &str = "╭";
    pub const TOP_RIGHT: &str = "╮";
    pub const BOTTOM_LEFT: &str = "╰";
    pub const BOTTOM_RIGHT: &str = "╯";
    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";
    pub const BULLET: &str = "●";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

// ═══════════════════════════════════════════════════════════════════════════════
// Status Indicators
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        box_chars::CHECK.with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    eprintln!(
        " {} {}",
        box_chars::CROSS_MARK.with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

pub fn print_warning(message: &str) {
    println!(
        " {} {}",
        "⚠".with(colors::ORANGE).bold(),
        message.with(colors::ORANGE)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Section Headers
// ═══════════════════════════════════════════════════════════════════════════════

const SECTION_WIDTH: usize = 60;

pub fn print_section_header(title: &str) {
    let title_len = title.width();
    let padding = SECTION_WIDTH.saturating_sub(title_len + 4) / 2;
    let rest = SECTION_WIDTH.saturating_sub(title_len + 4 + padding);

    println!();
    println!(
        "{}{} {} {}{}",
        box_chars::TOP_LEFT.with(colors::GREEN),
        box_chars::HORIZONTAL.repeat(padding).with(colors::GREEN),
        title.with(colors::GREEN).bold().attribute(Attribute::Italic),
        box_chars::HORIZONTAL.repeat(rest).with(colors::GREEN),
        box_chars::TOP_RIGHT.with(colors::GREEN)
    );
}

pub fn print_section_footer() {
    println!(
        "{}{}{}",
        box_chars::BOTTOM_LEFT.with(colors::GREEN),
        box_chars::HORIZONTAL.repeat(SECTION_WIDTH).with(colors::GREEN),
        box_chars::BOTTOM_RIGHT.with(colors::GREEN)
    );
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::BULLET.with(colors::GREEN),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Table Display
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: Vec<&str>) -> Self {
        let col_widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
        TableBuilder {
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
            col_widths,
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, cell) in row.iter().enumerate() {
            if i < self.col_widths.len() {
                self.col_widths[i] = self.col_widths[i].max(cell.width());
            }
        }
        self.rows.push(row);
    }

    fn border(&self, left: &str, junction: &str, right: &str) -> String {
        let segments: Vec<String> = self
            .col_widths
            .iter()
            .map(|width| box_chars::HORIZONTAL.repeat(width + 2))
            .collect();
        format!("{}{}{}", left, segments.join(junction), right)
    }

    fn line(&self, cells: &[String]) -> String {
        let mut line = box_chars::VERTICAL.to_string();
        for (i, width) in self.col_widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let padding = width.saturating_sub(cell.width());
            line.push_str(&format!(" {}{} {}", cell, " ".repeat(padding), box_chars::VERTICAL));
        }
        line
    }

    /// Render the table as plain lines, without colors.
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![
            self.border(box_chars::TOP_LEFT, box_chars::T_TOP, box_chars::TOP_RIGHT),
            self.line(&self.headers),
            self.border(box_chars::T_LEFT, box_chars::CROSS, box_chars::T_RIGHT),
        ];
        lines.extend(self.rows.iter().map(|row| self.line(row)));
        lines.push(self.border(
            box_chars::BOTTOM_LEFT,
            box_chars::T_BOTTOM,
            box_chars::BOTTOM_RIGHT,
        ));
        lines
    }

    pub fn print(&self) {
        for (i, line) in self.render().into_iter().enumerate() {
            if i == 1 {
                println!("{}", line.with(colors::CYAN).bold());
            } else {
                println!("{}", line.with(colors::CYAN));
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Batch Output
// ═══════════════════════════════════════════════════════════════════════════════

/// Progress bar fed by the executor observer.
pub fn batch_progress_bar(len: usize, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {prefix} [{bar:30.green/white}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> "),
    );
    pb.set_prefix(label.to_string());
    pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(12));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

pub fn failure_table(breakdown: &BTreeMap<FailureReason, usize>) -> TableBuilder {
    let mut table = TableBuilder::new(vec!["Reason", "Count"]);
    for (reason, count) in breakdown {
        table.add_row(vec![reason.to_string(), count.to_string()]);
    }
    table
}

/// Print the per-outcome counters of a batch and, if anything failed, the
/// failure breakdown.
pub fn print_batch_summary(
    label: &str,
    counts: BatchCounts,
    breakdown: &BTreeMap<FailureReason, usize>,
) {
    print_section_header(&format!("{} Summary", label));
    print_key_value("Succeeded", &counts.success.to_string());
    print_key_value("Failed", &counts.failed.to_string());
    print_key_value("Skipped", &counts.skipped.to_string());
    if !breakdown.is_empty() {
        println!();
        failure_table(breakdown).print();
    }
    print_section_footer();
}

pub fn print_catalog_counts(counts: CatalogCounts) {
    print_section_header("Catalog");
    print_key_value("Artists", &counts.artists.to_string());
    print_key_value("Playlists", &counts.playlists.to_string());
    print_key_value("Songs", &counts.songs.to_string());
    print_section_footer();
}
