/*!
format.rs

Human output helpers for `abt` (stderr narration, help and listings).

  - StyleOptions::detect() -> StyleOptions   (NO_COLOR, terminal detection, COLUMNS)
  - color(role, text, &StyleOptions) -> String
  - banner(command, ari, &StyleOptions) -> String
  - table(rows, &StyleOptions) -> String    (aligned columns, last column truncated)
  - truncate_ellipsis(s, max_chars) -> String

Machine readable stdout lines (`scheme:path # description`) never go through these helpers.
*/

use std::borrow::Cow;
use std::io::IsTerminal;

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub term_width: usize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    /// Colour only when stderr is a terminal and NO_COLOR is unset.
    pub fn detect() -> Self {
        let use_color = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
        let term_width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);
        Self {
            use_color,
            term_width,
        }
    }

    pub fn plain() -> Self {
        Self {
            use_color: false,
            term_width: 100,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Accent,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",
        Role::Accent => "38;5;213",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

/// Separator written before each scoped command on a terminal.
pub fn banner(command: &str, ari: &str, style: &StyleOptions) -> String {
    color(
        Role::Primary,
        format!("===== {} {} =====", command.to_uppercase(), ari),
        style,
    )
}

/// Aligned columns. Every column but the last is padded to its widest cell; the last one is
/// truncated to the terminal width. The first column is highlighted.
pub fn table(rows: &[Vec<String>], style: &StyleOptions) -> String {
    let Some(cols) = rows.iter().map(Vec::len).max() else {
        return String::new();
    };
    let mut widths = vec![0usize; cols];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let mut out = String::new();
    for row in rows {
        let mut line = String::new();
        let mut used = 0;
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                line.push_str("  ");
                used += 2;
            }
            if i + 1 == row.len() {
                let room = style.term_width.saturating_sub(used).max(10);
                line.push_str(&truncate_ellipsis(cell, room));
            } else {
                let pad = widths[i] - display_width(cell);
                if i == 0 {
                    line.push_str(&color(Role::Accent, cell, style));
                } else {
                    line.push_str(cell);
                }
                line.push_str(&" ".repeat(pad));
                used += widths[i];
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    if display_width(s) <= max_chars {
        return s.to_string();
    }
    if max_chars == 1 {
        return "…".into();
    }
    let mut out: String = s.chars().take(max_chars - 1).collect();
    out.push('…');
    out
}

fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // skip parameters up to and including the final letter
            for d in chars.by_ref() {
                if d.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        buf.push(c);
    }
    Cow::Owned(buf)
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}
