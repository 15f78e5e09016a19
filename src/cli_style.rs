//! Terminal styling for the help screen and the run summary.

use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Stylize};
use unicode_width::UnicodeWidthStr;

pub fn get_styles() -> Styles {
    let heading = Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
    let good = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Green)));
    let bad = Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Red)));

    Styles::styled()
        .usage(heading)
        .header(heading)
        .literal(good)
        .valid(good)
        .invalid(bad)
        .error(bad)
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

pub mod colors {
    use crossterm::style::Color;

    pub const CYAN: Color = Color::Rgb {
        r: 0,
        g: 255,
        b: 255,
    };
    pub const GREEN: Color = Color::Rgb {
        r: 0,
        g: 255,
        b: 136,
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
    pub const PURPLE: Color = Color::Rgb {
        r: 180,
        g: 100,
        b: 255,
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

mod box_chars {
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

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        box_chars::CHECK.with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    println!(
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

pub fn print_section_header(title: &str) {
    let width: usize = 60;
    let title_len = title.width();
    let left = width.saturating_sub(title_len + 4) / 2;
    let right = width.saturating_sub(title_len + 4 + left);

    println!();
    println!(
        "{}{} {} {}{}",
        box_chars::TOP_LEFT.with(colors::CYAN),
        box_chars::HORIZONTAL.repeat(left).with(colors::CYAN),
        title.with(colors::CYAN).bold().attribute(Attribute::Italic),
        box_chars::HORIZONTAL.repeat(right).with(colors::CYAN),
        box_chars::TOP_RIGHT.with(colors::CYAN)
    );
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::BULLET.with(colors::PURPLE),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

/// Box-drawn table, columns sized to their widest cell.
pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: Vec<&str>) -> Self {
        let col_widths = headers.iter().map(|h| h.width()).collect();
        TableBuilder {
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
            col_widths,
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (width, cell) in self.col_widths.iter_mut().zip(&row) {
            *width = (*width).max(cell.width());
        }
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn print(&self) {
        self.print_border(box_chars::TOP_LEFT, box_chars::T_TOP, box_chars::TOP_RIGHT);
        self.print_row(&self.headers, true);
        self.print_border(box_chars::T_LEFT, box_chars::CROSS, box_chars::T_RIGHT);
        for row in &self.rows {
            self.print_row(row, false);
        }
        self.print_border(
            box_chars::BOTTOM_LEFT,
            box_chars::T_BOTTOM,
            box_chars::BOTTOM_RIGHT,
        );
    }

    fn print_border(&self, left: &str, junction: &str, right: &str) {
        let segments: Vec<String> = self
            .col_widths
            .iter()
            .map(|w| box_chars::HORIZONTAL.repeat(w + 2))
            .collect();
        println!(
            "{}",
            format!("{}{}{}", left, segments.join(junction), right).with(colors::CYAN)
        );
    }

    fn print_row(&self, cells: &[String], header: bool) {
        print!("{}", box_chars::VERTICAL.with(colors::CYAN));
        for (i, width) in self.col_widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let padding = " ".repeat(width.saturating_sub(cell.width()));
            if header {
                print!(" {}{} ", cell.with(colors::CYAN).bold(), padding);
            } else {
                print!(" {}{} ", cell.with(colors::WHITE), padding);
            }
            print!("{}", box_chars::VERTICAL.with(colors::CYAN));
        }
        println!();
    }
}
