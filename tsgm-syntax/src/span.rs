//! Source spans and line/column mapping for diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a source file within one program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub u32);

impl FileId {
    pub const INVALID: FileId = FileId(u32::MAX);

    pub fn new(id: u32) -> Self {
        FileId(id)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file:{}", self.0)
    }
}

/// Byte offset in a source file (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ByteOffset(pub u32);

impl ByteOffset {
    pub fn new(offset: u32) -> Self {
        ByteOffset(offset)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Span in a source file (inclusive start, exclusive end)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub file_id: FileId,
    pub start: ByteOffset,
    pub end: ByteOffset,
}

impl Span {
    pub fn new(file_id: FileId, start: ByteOffset, end: ByteOffset) -> Self {
        Span { file_id, start, end }
    }

    /// Span used for synthesized nodes that have no source text
    pub fn dummy() -> Self {
        Span::new(FileId::INVALID, ByteOffset(0), ByteOffset(0))
    }

    pub fn is_dummy(self) -> bool {
        self.file_id == FileId::INVALID
    }

    /// Combine two spans into a span that covers both
    pub fn merge(self, other: Span) -> Span {
        if self.is_dummy() {
            return other;
        }
        if other.is_dummy() || other.file_id != self.file_id {
            return self;
        }
        Span {
            file_id: self.file_id,
            start: ByteOffset(self.start.0.min(other.start.0)),
            end: ByteOffset(self.end.0.max(other.end.0)),
        }
    }

    pub fn len(self) -> u32 {
        self.end.0.saturating_sub(self.start.0)
    }

    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}..{}", self.file_id, self.start.0, self.end.0)
    }
}

/// Line and column position, both 0-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.line + 1, self.column + 1)
    }
}

/// Mapping between byte offsets and line/column positions
#[derive(Debug, Clone)]
pub struct LineMap {
    line_starts: Vec<u32>,
}

impl LineMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx as u32 + 1);
            }
        }
        LineMap { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn position(&self, offset: ByteOffset) -> Position {
        match self.line_starts.binary_search(&offset.0) {
            Ok(line) => Position { line: line as u32, column: 0 },
            Err(line) => {
                let line = line.saturating_sub(1);
                let start = self.line_starts.get(line).copied().unwrap_or(0);
                Position {
                    line: line as u32,
                    column: offset.0.saturating_sub(start),
                }
            }
        }
    }

    /// Whether a line break lies between the two offsets
    pub fn spans_lines(&self, from: ByteOffset, to: ByteOffset) -> bool {
        self.position(from).line != self.position(to).line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_map() {
        let map = LineMap::new("hello\nworld\n\nfoo");
        assert_eq!(map.line_count(), 4);
        assert_eq!(map.position(ByteOffset(0)), Position { line: 0, column: 0 });
        assert_eq!(map.position(ByteOffset(7)), Position { line: 1, column: 1 });
        assert_eq!(map.position(ByteOffset(13)), Position { line: 3, column: 0 });
        assert_eq!(map.position(ByteOffset(7)).to_string(), "2,2");
    }

    #[test]
    fn test_merge_ignores_dummy() {
        let a = Span::new(FileId(0), ByteOffset(4), ByteOffset(8));
        let b = Span::new(FileId(0), ByteOffset(1), ByteOffset(5));
        assert_eq!(a.merge(b), Span::new(FileId(0), ByteOffset(1), ByteOffset(8)));
        assert_eq!(Span::dummy().merge(a), a);
        assert_eq!(a.merge(Span::dummy()), a);
    }
}
