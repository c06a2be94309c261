//! Terminal rendering of markdown output.
//!
//! Rich mode styles markdown with termimad and colors step status lines by
//! their icon; plain mode prints the markdown unchanged.

use anyhow::Result;
use termimad::{crossterm::style::Color, MadSkin};

pub struct TerminalRenderer {
    rich_enabled: bool,
    skin: MadSkin,
}

impl TerminalRenderer {
    pub fn new(rich_enabled: bool) -> Self {
        let mut skin = MadSkin::default();
        skin.set_headers_fg(Color::Blue);
        skin.bold.set_fg(Color::Yellow);
        skin.italic.set_fg(Color::Magenta);
        skin.code_block.set_bg(Color::AnsiValue(238));
        skin.inline_code.set_bg(Color::AnsiValue(238));

        Self { rich_enabled, skin }
    }

    pub fn render(&self, markdown: &str) -> Result<()> {
        if !self.rich_enabled {
            print!("{markdown}");
            return Ok(());
        }

        for line in markdown.lines() {
            match status_color(line) {
                Some(color) => println!("{color}{line}\x1b[0m"),
                None => {
                    // termimad drops the hashes of headers; keep them visible.
                    if line.starts_with('#') {
                        println!("\x1b[34m{line}\x1b[0m");
                    } else {
                        self.skin.print_inline(line);
                        println!();
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}

/// ANSI color for lines that report a step or operation status.
fn status_color(line: &str) -> Option<&'static str> {
    let line = line.trim_start_matches(['#', ' ']);
    if line.starts_with('✓') || line.starts_with("Success:") {
        Some("\x1b[32m")
    } else if line.starts_with('✗') || line.starts_with("Error:") {
        Some("\x1b[31m")
    } else if line.starts_with('➤') {
        Some("\x1b[33m")
    } else {
        None
    }
}
