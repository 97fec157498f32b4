// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Listing file generation.
//!
//! The listing echoes the source 132 columns wide in 66-line pages. A
//! two-line header repeats at the top of each page and at most one
//! error message is appended beneath the offending source line.

use std::io::{self, Write};

use super::error::Diagnostic;

pub const PAGE_WIDTH: usize = 132;
pub const PAGE_LENGTH: u32 = 66;

/// Writer for listing file output.
pub struct ListingWriter<W: Write> {
    out: W,
    title: String,
    subtitle: String,
    page_line: u32,
    page_no: u32,
}

impl<W: Write> ListingWriter<W> {
    pub fn new(out: W, title: &str, subtitle: &str) -> Self {
        Self {
            out,
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            page_line: 0,
            page_no: 0,
        }
    }

    fn page_header(&mut self) -> io::Result<()> {
        self.page_no += 1;
        if self.page_no > 1 {
            writeln!(self.out, "\u{c}")?;
        }
        let page = format!("Page {:>4}", self.page_no);
        let title_width = PAGE_WIDTH.saturating_sub(page.len());
        writeln!(
            self.out,
            "{:<width$}{}",
            clip(&self.title, title_width),
            page,
            width = title_width
        )?;
        writeln!(self.out, "{}", clip(&self.subtitle, PAGE_WIDTH))?;
        writeln!(self.out)?;
        self.page_line = 3;
        Ok(())
    }

    fn emit(&mut self, text: &str) -> io::Result<()> {
        if self.page_line == 0 || self.page_line >= PAGE_LENGTH {
            self.page_header()?;
        }
        writeln!(self.out, "{}", clip(text, PAGE_WIDTH))?;
        self.page_line += 1;
        Ok(())
    }

    /// Echo one source line with its line number.
    pub fn source_line(&mut self, line_no: u32, text: &str) -> io::Result<()> {
        let text = text.trim_end_matches(['\n', '\r']);
        self.emit(&format!("{line_no:>6}  {text}"))
    }

    /// Append an error message beneath the line it belongs to.
    pub fn error(&mut self, diag: &Diagnostic) -> io::Result<()> {
        for line in diag.format().lines() {
            self.emit(&format!("        {line}"))?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

fn clip(text: &str, width: usize) -> &str {
    match text.char_indices().nth(width) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
