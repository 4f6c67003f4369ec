//! Line-oriented console sink.

use std::any::Any;
use std::io::{self, Write};

use crate::error::{Error, Result};

use super::{Renderers, Sink, MID_ALIGN};

const DEFAULT_INDENT_SIZE: usize = 2;

/// Writes each narration line on its own line, indented by nesting depth.
///
/// The aligned variant renders `label<>content` lines as a right-aligned
/// label column followed by the content, so step keywords line up:
///
/// ```text
///        so that we increase the customer base
///             as web user
///          given customer register
/// ```
pub struct ConsoleSink {
    out: Box<dyn Write + Send>,
    indent_size: usize,
    indent_level: i32,
    report_level: i32,
    label_width: Option<usize>,
    renderers: Renderers,
}

impl ConsoleSink {
    /// Plain console sink writing to stdout.
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    /// Aligned console sink writing to stdout.
    pub fn aligned(label_width: usize) -> Self {
        Self::new().with_label_width(label_width)
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            indent_size: DEFAULT_INDENT_SIZE,
            indent_level: -1,
            report_level: i32::MAX,
            label_width: None,
            renderers: Renderers::default(),
        }
    }

    /// Align `label<>content` lines on a label column of this width.
    pub fn with_label_width(mut self, label_width: usize) -> Self {
        self.label_width = Some(label_width);
        self
    }

    pub fn with_indent_size(mut self, indent_size: usize) -> Self {
        self.indent_size = indent_size;
        self
    }

    /// Suppress lines nested deeper than `report_level`.
    pub fn with_report_level(mut self, report_level: u32) -> Self {
        self.report_level = i32::try_from(report_level).unwrap_or(i32::MAX);
        self
    }

    pub fn with_renderers(mut self, renderers: Renderers) -> Self {
        self.renderers = renderers;
        self
    }

    fn format_line(&self, content: &str) -> String {
        let line = match self.label_width {
            Some(width) => align(content, width),
            None => content.to_string(),
        };
        let indent = usize::try_from(self.indent_level.max(0)).unwrap_or(0) * self.indent_size;
        format!("{}{}", " ".repeat(indent), line)
    }

    fn emit(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line).map_err(Error::Io)
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Split at the marker: label right-aligned to `width`, then the content.
/// Lines without a marker start after the label column.
fn align(content: &str, width: usize) -> String {
    match content.split_once(MID_ALIGN) {
        Some((label, rest)) => {
            let padding = width.saturating_sub(label.chars().count());
            format!("{}{} {}", " ".repeat(padding), label, rest)
        }
        None => format!("{}{}", " ".repeat(width + 1), content),
    }
}

impl Sink for ConsoleSink {
    /// Plain and aligned consoles are separate kinds and can run side by side.
    fn kind(&self) -> &'static str {
        if self.label_width.is_some() {
            "console::aligned"
        } else {
            "console"
        }
    }

    fn section_start(&mut self) -> Result<()> {
        self.steps_start()
    }

    fn section_end(&mut self) -> Result<()> {
        self.steps_stop()
    }

    fn steps_start(&mut self) -> Result<()> {
        self.indent_level += 1;
        Ok(())
    }

    fn steps_stop(&mut self) -> Result<()> {
        self.indent_level -= 1;
        Ok(())
    }

    fn write_line(&mut self, content: &str) -> Result<()> {
        if self.report_level < self.indent_level {
            return Ok(());
        }
        let line = self.format_line(content);
        self.emit(&line)
    }

    fn write_object(&mut self, object: &dyn Any) -> Result<()> {
        match self.renderers.render(object) {
            Some(line) => self.write_line(&line),
            None => Ok(()),
        }
    }

    fn write_output_locations(&mut self, locations: &[String]) -> Result<()> {
        for location in locations {
            self.write_line(&format!("(also logged at: {})", location))?;
        }
        Ok(())
    }

    fn dispose(&mut self) -> Result<()> {
        self.out.flush().map_err(Error::Io)
    }

    fn supports_alignment(&self) -> bool {
        self.label_width.is_some()
    }
}
