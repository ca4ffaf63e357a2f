//! Expression source text with line bookkeeping.
//!
//! Offsets and columns are measured in code points, not bytes.

const DEFAULT_DESCRIPTION: &str = "<input>";

/// A line/column pair. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: i32,
    pub column: i32,
}

impl Location {
    /// Location used for errors that are not tied to a token.
    pub const NONE: Location = Location { line: -1, column: -1 };

    pub fn new(line: i32, column: i32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone)]
pub struct Source {
    description: String,
    chars: Vec<char>,
    /// Offset one past the end of each line, newline included.
    line_offsets: Vec<usize>,
}

impl Source {
    pub fn new(text: &str) -> Self {
        Self::with_description(text, DEFAULT_DESCRIPTION)
    }

    pub fn with_description(text: &str, description: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut line_offsets = Vec::new();
        let mut end = 0;
        for line in text.split('\n') {
            end += line.chars().count() + 1;
            line_offsets.push(end);
        }
        Self {
            description: description.to_string(),
            chars,
            line_offsets,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn line_offsets(&self) -> &[usize] {
        &self.line_offsets
    }

    /// Resolve a code point offset into a location.
    pub fn location(&self, offset: usize) -> Location {
        let mut line = 1;
        for &line_end in &self.line_offsets {
            if line_end > offset {
                break;
            }
            line += 1;
        }
        let line_start = if line == 1 {
            0
        } else {
            self.line_offsets[line - 2]
        };
        Location::new(line as i32, offset.saturating_sub(line_start) as i32)
    }

    /// Text of a 1-based line without its newline.
    pub fn snippet(&self, line: i32) -> Option<String> {
        if self.chars.is_empty() {
            return None;
        }
        let start = self.line_start(line)?;
        let text: String = match self.line_start(line + 1) {
            Some(next) => self.chars[start..next - 1].iter().collect(),
            None => self.chars[start..].iter().collect(),
        };
        Some(text)
    }

    fn line_start(&self, line: i32) -> Option<usize> {
        if line == 1 {
            return Some(0);
        }
        if line > 1 && (line as usize) <= self.line_offsets.len() {
            return Some(self.line_offsets[line as usize - 2]);
        }
        None
    }
}
