pub mod error;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

pub use error::LoadError;

static INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^include::(?P<path>[^\[\]]+)\[\]\s*$").unwrap());

/// Supplies raw text for the root document and its includes.
pub trait SourceReader {
    fn read(&self, path: &Path) -> std::io::Result<String>;
}

/// Reads sources straight from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystem;

impl SourceReader for FileSystem {
    fn read(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// One file that contributed lines to a document.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

/// Where an expanded line came from: a file index into [`Document::files`]
/// and the 0-based line within that file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub file: usize,
    pub line: usize,
}

/// The include-expanded line sequence of a document and, for every line,
/// the file and line it originated from. `lines` and `origins` always have
/// the same length.
#[derive(Debug, Clone)]
pub struct Document {
    pub files: Vec<SourceFile>,
    pub lines: Vec<String>,
    pub origins: Vec<Origin>,
}

impl Document {
    /// Load `path` from disk and splice its includes.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::load_with(path, &FileSystem)
    }

    /// Load `path` through `reader` and splice its includes.
    ///
    /// Includes are resolved relative to the directory of the file containing
    /// the directive. Spliced lines are not scanned again, so an include inside
    /// an included file stays as a literal line.
    pub fn load_with(path: impl AsRef<Path>, reader: &dyn SourceReader) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = read_source(reader, path)?;

        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        let mut origins: Vec<Origin> = (0..lines.len())
            .map(|line| Origin { file: 0, line })
            .collect();
        let mut files = vec![SourceFile {
            path: path.to_path_buf(),
            text,
        }];

        let mut i = 0;
        while i < lines.len() {
            let Some(caps) = INCLUDE.captures(&lines[i]) else {
                i += 1;
                continue;
            };

            // The directive line belongs to whichever file it was written in.
            let host = &files[origins[i].file].path;
            let include_path = host
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(caps["path"].trim());
            let included = read_source(reader, &include_path)?;

            let file = files.len();
            let spliced: Vec<String> = included.lines().map(str::to_string).collect();
            let count = spliced.len();
            tracing::debug!(path = %include_path.display(), lines = count, "splicing include");

            lines.splice(i..=i, spliced);
            origins.splice(i..=i, (0..count).map(|line| Origin { file, line }));
            files.push(SourceFile {
                path: include_path,
                text: included,
            });

            i += count;
        }

        Ok(Document {
            files,
            lines,
            origins,
        })
    }

    /// Build a document from in-memory text without include processing.
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let origins = (0..lines.len())
            .map(|line| Origin { file: 0, line })
            .collect();
        Document {
            files: vec![SourceFile {
                path: path.into(),
                text,
            }],
            lines,
            origins,
        }
    }

    /// Path of the root document.
    pub fn path(&self) -> &Path {
        &self.files[0].path
    }

    /// Directory of the root document, used for module resolution and config lookup.
    pub fn base_dir(&self) -> PathBuf {
        match self.path().parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn origin(&self, line: usize) -> Option<Origin> {
        self.origins.get(line).copied()
    }

    pub fn line(&self, line: usize) -> Option<&str> {
        self.lines.get(line).map(String::as_str)
    }
}

fn read_source(reader: &dyn SourceReader, path: &Path) -> Result<String, LoadError> {
    reader.read(path).map_err(|source| LoadError::io(path, source))
}
