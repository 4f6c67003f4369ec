//! HTML document sink.
//!
//! Sections render as `<details>` elements whose first line is the
//! `<summary>`; runs of steps render in a table so screenshots can sit in a
//! cell next to the lines they illustrate.

use std::any::Any;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::{
    starting_phrase, Emphasis, ExpandableSections, Image, ImageAttachment, Renderers, Sink,
};

/// Stylesheet file shared by every document in a directory.
pub const DEFAULT_STYLESHEET: &str = "storyteller.css";

const IMAGE_DIR: &str = "images";
const EMPHASIS_TAG: &str = "strong";
const STEPS_OPEN: &str = "<table><tr><td class='steps'>";
const STEPS_CLOSE: &str = "</td></tr></table>";

const STYLESHEET: &[&str] = &[
    "body { font-family: sans-serif; }",
    "summary::-webkit-details-marker { display: none }",
    "details details { margin-left: 1em; }",
    "details div { margin-left: 1em; }",
    "img { border: 1px solid #021a40; }",
    "img { max-width: 20%; }",
    "img:hover { max-width: 80%; }",
    "table { border-collapse: collapse; }",
    "td { vertical-align: top; }",
    ".steps { width: 33% }",
    ".image { width: 66% }",
];

/// Writes one HTML document per story.
pub struct DocumentSink {
    path: PathBuf,
    file: File,
    emphasise: Vec<String>,
    expand: Vec<String>,
    /// The next line opens the innermost section.
    section_pending: bool,
    /// Per open section: whether its `<details>` was written.
    sections: Vec<bool>,
    /// Per open steps run: whether its table was written.
    steps: Vec<bool>,
    lines_since_image: usize,
    deferred_image: Option<Image>,
    renderers: Renderers,
    disposed: bool,
}

impl DocumentSink {
    /// Create the document at `path`, its directory, and the shared
    /// stylesheet (only if the directory has none yet).
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        Self::create_with_stylesheet(path, DEFAULT_STYLESHEET)
    }

    pub fn create_with_stylesheet(path: impl Into<PathBuf>, stylesheet: &str) -> Result<Self> {
        let path = path.into();
        let directory = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        fs::create_dir_all(&directory).map_err(|e| Error::io_write(&directory, e))?;
        ensure_stylesheet(&directory.join(stylesheet))?;

        let file = File::create(&path).map_err(|e| Error::io_write(&path, e))?;
        let mut sink = Self {
            path,
            file,
            emphasise: Vec::new(),
            expand: Vec::new(),
            section_pending: false,
            sections: Vec::new(),
            steps: Vec::new(),
            lines_since_image: 0,
            deferred_image: None,
            renderers: Renderers::default(),
            disposed: false,
        };
        sink.write_html(&[
            "<!DOCTYPE html>",
            "<html>",
            "<head>",
            "<meta charset='utf-8'>",
            &format!("<link rel='stylesheet' type='text/css' href='{}'>", escape(stylesheet)),
            "</head>",
            "<body>",
        ])?;
        debug!(path = %sink.path.display(), "Document sink created");
        Ok(sink)
    }

    pub fn with_renderers(mut self, renderers: Renderers) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_html(&mut self, lines: &[&str]) -> Result<()> {
        for line in lines {
            writeln!(self.file, "{}", line).map_err(|e| Error::io_write(&self.path, e))?;
        }
        Ok(())
    }

    fn emphasised(&self, content: &str) -> String {
        match starting_phrase(content, &self.emphasise) {
            Some(phrase) => {
                let (head, rest) = content.split_at(phrase.len());
                format!("<{0}>{1}</{0}>{2}", EMPHASIS_TAG, escape(head), escape(rest))
            }
            None => escape(content),
        }
    }

    /// Flush the deferred image if lines were written since the last one.
    fn flush_deferred_image(&mut self) -> Result<()> {
        if self.lines_since_image > 0 {
            if let Some(image) = self.deferred_image.take() {
                self.attach_image(Some(&image), None)?;
            }
            self.lines_since_image = 0;
        }
        Ok(())
    }

    fn save_image(&mut self, image: &Image) -> Result<String> {
        let directory = self.path.parent().unwrap_or(Path::new(".")).join(IMAGE_DIR);
        fs::create_dir_all(&directory).map_err(|e| Error::io_write(&directory, e))?;
        let name = format!("{}.png", Uuid::new_v4());
        let path = directory.join(&name);
        fs::write(&path, image.bytes()).map_err(|e| Error::io_write(&path, e))?;
        Ok(name)
    }
}

/// Write the stylesheet unless another document already did.
fn ensure_stylesheet(path: &Path) -> Result<()> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => {
            for rule in STYLESHEET {
                writeln!(file, "{}", rule).map_err(|e| Error::io_write(path, e))?;
            }
            debug!(path = %path.display(), "Stylesheet written");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(Error::io_write(path, e)),
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

impl Sink for DocumentSink {
    fn section_start(&mut self) -> Result<()> {
        self.section_pending = true;
        self.sections.push(false);
        Ok(())
    }

    fn section_end(&mut self) -> Result<()> {
        self.flush_deferred_image()?;
        self.section_pending = false;
        if self.sections.pop() == Some(true) {
            self.write_html(&["</details>"])?;
        }
        Ok(())
    }

    fn steps_start(&mut self) -> Result<()> {
        self.lines_since_image = 0;
        if self.section_pending {
            self.steps.push(false);
        } else {
            self.write_html(&[STEPS_OPEN])?;
            self.steps.push(true);
        }
        Ok(())
    }

    fn steps_stop(&mut self) -> Result<()> {
        if self.steps.pop() == Some(true) {
            self.flush_deferred_image()?;
            self.write_html(&[STEPS_CLOSE])?;
        }
        Ok(())
    }

    fn write_line(&mut self, content: &str) -> Result<()> {
        let body = self.emphasised(content);
        if self.section_pending {
            self.section_pending = false;
            let details = if starting_phrase(content, &self.expand).is_some() {
                "<details open>"
            } else {
                "<details>"
            };
            let summary = format!("<summary>{}</summary>", body);
            self.write_html(&[details, &summary])?;
            if let Some(opened) = self.sections.last_mut() {
                *opened = true;
            }
            // steps that started before the heading open right after it
            let deferred = self.steps.iter().filter(|written| !**written).count();
            for _ in 0..deferred {
                self.write_html(&[STEPS_OPEN])?;
            }
            self.steps.iter_mut().for_each(|written| *written = true);
        } else {
            self.write_html(&[&format!("<div>{}</div>", body)])?;
        }
        self.lines_since_image += 1;
        Ok(())
    }

    fn write_object(&mut self, object: &dyn Any) -> Result<()> {
        match self.renderers.render(object) {
            Some(line) => self.write_line(&line),
            None => Ok(()),
        }
    }

    fn output_locations(&self) -> Vec<String> {
        vec![self.path.display().to_string()]
    }

    fn write_output_locations(&mut self, locations: &[String]) -> Result<()> {
        for location in locations {
            let line = format!("<div><small>Output: {}</small></div>", escape(location));
            self.write_html(&[&line])?;
        }
        Ok(())
    }

    fn dispose(&mut self) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;
        self.write_html(&["</body>", "</html>"])?;
        self.file.flush().map_err(|e| Error::io_write(&self.path, e))
    }

    fn emphasis(&mut self) -> Option<&mut dyn Emphasis> {
        Some(self)
    }

    fn expandable_sections(&mut self) -> Option<&mut dyn ExpandableSections> {
        Some(self)
    }

    fn images(&mut self) -> Option<&mut dyn ImageAttachment> {
        Some(self)
    }
}

impl Emphasis for DocumentSink {
    fn set_start_texts_to_emphasise(&mut self, texts: &[String]) {
        self.emphasise = texts.to_vec();
    }
}

impl ExpandableSections for DocumentSink {
    fn set_start_texts_to_have_section_open(&mut self, texts: &[String]) {
        self.expand = texts.to_vec();
    }
}

impl ImageAttachment for DocumentSink {
    fn attach_image(&mut self, image: Option<&Image>, deferred: Option<Image>) -> Result<()> {
        self.deferred_image = deferred;
        if let Some(image) = image {
            let name = self.save_image(image)?;
            let cell = format!(
                "</td><td class='image'><div><img src='{}/{}'></div></td></tr><tr><td class='steps'>",
                IMAGE_DIR, name
            );
            self.write_html(&[&cell])?;
        }
        self.lines_since_image = 0;
        Ok(())
    }
}
