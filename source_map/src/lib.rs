//! Source mapping utilities for the vesper compiler pipeline.
//!
//! This library provides source file tracking and position mapping for the
//! compiler passes that report positions back to the user: file identifiers,
//! source text storage, and line/column calculation from byte offsets.
//! Backend passes carry `SourceSpan`s through the IR so that late diagnostics
//! (escape reports, liveness warnings) still point at the originating line.

use std::collections::HashMap;
use std::fmt;

/// Represents a position in source code (1-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize, byte_offset: usize) -> Self {
        Self { line, column, byte_offset }
    }
}

/// Represents a span of source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
    pub file_id: FileId,
}

impl SourceSpan {
    pub fn new(start: SourcePosition, end: SourcePosition, file_id: FileId) -> Self {
        Self { start, end, file_id }
    }

    pub fn single_position(pos: SourcePosition, file_id: FileId) -> Self {
        Self {
            start: pos,
            end: SourcePosition::new(pos.line, pos.column + 1, pos.byte_offset + 1),
            file_id,
        }
    }

    /// Span used for compiler-introduced entities with no source location.
    pub fn unknown() -> Self {
        Self::single_position(SourcePosition::new(0, 0, 0), FileId::new(0))
    }

    pub fn is_unknown(&self) -> bool {
        self.start.line == 0
    }

    /// Merge two spans (must be from the same file).
    pub fn merge(self, other: SourceSpan) -> SourceSpan {
        assert_eq!(self.file_id, other.file_id, "Cannot merge spans from different files");

        let start = if self.start.byte_offset <= other.start.byte_offset {
            self.start
        } else {
            other.start
        };

        let end = if self.end.byte_offset >= other.end.byte_offset {
            self.end
        } else {
            other.end
        };

        SourceSpan::new(start, end, self.file_id)
    }
}

/// Unique identifier for a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(usize);

impl FileId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

/// Information about a source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
    pub line_starts: Vec<usize>,
}

impl SourceFile {
    /// Create a new source file with precomputed line starts.
    pub fn new(name: String, content: String) -> Self {
        let line_starts = compute_line_starts(&content);
        Self {
            name,
            content,
            line_starts,
        }
    }

    /// Get a specific line from the source file (1-based line numbers).
    pub fn get_line(&self, line_number: usize) -> Option<&str> {
        if line_number == 0 || line_number > self.line_starts.len() {
            return None;
        }

        let start = self.line_starts[line_number - 1];
        let end = if line_number < self.line_starts.len() {
            self.line_starts[line_number]
        } else {
            self.content.len()
        };

        Some(self.content[start..end].trim_end_matches(['\n', '\r']))
    }

    /// Convert a byte offset to line and column (1-based).
    pub fn offset_to_line_col(&self, offset: usize) -> (usize, usize) {
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };

        let line_start = self.line_starts.get(line_index).copied().unwrap_or(0);
        let column = offset - line_start + 1;
        let line = line_index + 1;

        (line, column)
    }

    /// Create a SourcePosition from a byte offset.
    pub fn offset_to_position(&self, offset: usize) -> SourcePosition {
        let (line, column) = self.offset_to_line_col(offset);
        SourcePosition::new(line, column, offset)
    }
}

/// Manages source files and their content for multi-file compilation.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: HashMap<FileId, SourceFile>,
    next_id: usize,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source file and return its FileId.
    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<String>) -> FileId {
        let file_id = FileId(self.next_id);
        self.next_id += 1;
        self.files.insert(file_id, SourceFile::new(name.into(), content.into()));
        file_id
    }

    pub fn get_file(&self, file_id: FileId) -> Option<&SourceFile> {
        self.files.get(&file_id)
    }

    /// Get a specific line from a file (1-based line numbers).
    pub fn get_line(&self, file_id: FileId, line_number: usize) -> Option<&str> {
        self.get_file(file_id)?.get_line(line_number)
    }

    /// Create a SourceSpan from file, start offset, and end offset.
    pub fn span_from_offsets(&self, file_id: FileId, start: usize, end: usize) -> Option<SourceSpan> {
        let file = self.get_file(file_id)?;
        let start_pos = file.offset_to_position(start);
        let end_pos = file.offset_to_position(end);
        Some(SourceSpan::new(start_pos, end_pos, file_id))
    }

    /// Format a span as `file:line:col` for warning output.
    /// Unknown spans and unregistered files format as `<unknown>`.
    pub fn format_span(&self, span: SourceSpan) -> String {
        if span.is_unknown() {
            return "<unknown>".to_string();
        }
        match self.files.get(&span.file_id) {
            Some(file) => format!("{}:{}:{}", file.name, span.start.line, span.start.column),
            None => "<unknown>".to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn compute_line_starts(content: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in content.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}
