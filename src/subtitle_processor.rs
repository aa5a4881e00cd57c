use std::fmt;

// @module: ASS/SSA subtitle parsing and rendering

/// Marker that opens every dialogue event line
pub const DIALOGUE_MARKER: &str = "Dialogue:";

/// Number of comma-separated fields in front of the dialogue text
pub const DIALOGUE_FIELD_COUNT: usize = 9;

// @enum: Classification of a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Script info, styles, event format lines, comments, blank lines
    Header,
    /// A `Dialogue:` event
    Dialogue,
}

// @struct: One raw line of a subtitle file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleLine {
    // @field: Line text without the line terminator
    pub text: String,

    // @field: Whether the line was terminated by "\r\n"
    pub carriage_return: bool,

    // @field: Header or dialogue
    pub kind: LineKind,
}

impl SubtitleLine {
    /// Classify a raw line (without its '\n')
    pub fn from_raw(raw: &str) -> Self {
        let (text, carriage_return) = match raw.strip_suffix('\r') {
            Some(stripped) => (stripped, true),
            None => (raw, false),
        };

        let kind = if text.starts_with(DIALOGUE_MARKER) {
            LineKind::Dialogue
        } else {
            LineKind::Header
        };

        Self {
            text: text.to_string(),
            carriage_return,
            kind,
        }
    }

    /// Whether the line is a dialogue event
    pub fn is_dialogue(&self) -> bool {
        self.kind == LineKind::Dialogue
    }

    /// Render with the original line terminator restored (minus the '\n')
    pub fn render_with(&self, text: &str) -> String {
        if self.carriage_return {
            format!("{}\r", text)
        } else {
            text.to_string()
        }
    }
}

// @struct: A dialogue line split into its opaque fields and its text payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueLine<'a> {
    // @field: "Dialogue: Layer,Start,End,Style,Name,MarginL,MarginR,MarginV,Effect"
    pub fields: &'a str,

    // @field: Free text after the ninth comma, None when the line is truncated
    pub payload: Option<&'a str>,
}

impl<'a> DialogueLine<'a> {
    /// Split a dialogue line at its ninth comma
    pub fn parse(line: &'a str) -> Self {
        match line.match_indices(',').nth(DIALOGUE_FIELD_COUNT - 1) {
            Some((comma, _)) => Self {
                fields: &line[..comma],
                payload: Some(&line[comma + 1..]),
            },
            None => Self {
                fields: line,
                payload: None,
            },
        }
    }

    /// Rebuild the line keeping the fields and replacing the payload
    pub fn with_payload(&self, payload: &str) -> String {
        format!("{},{}", self.fields, payload)
    }
}

impl fmt::Display for DialogueLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.payload {
            Some(payload) => write!(f, "{},{}", self.fields, payload),
            None => write!(f, "{}", self.fields),
        }
    }
}

/// Ordered lines of one subtitle file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleDocument {
    /// Every line of the file in original order
    pub lines: Vec<SubtitleLine>,
}

impl SubtitleDocument {
    /// Parse raw subtitle text; content is never reordered or rewritten
    pub fn parse(text: &str) -> Self {
        let lines = text.split('\n').map(SubtitleLine::from_raw).collect();
        Self { lines }
    }

    /// Render the document back to text
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.render_with(&line.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of lines, including blank ones
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Position of the first dialogue line
    pub fn first_dialogue_index(&self) -> Option<usize> {
        self.lines.iter().position(SubtitleLine::is_dialogue)
    }

    /// Lines strictly before the first dialogue line, or the whole document
    pub fn prefix(&self) -> &[SubtitleLine] {
        match self.first_dialogue_index() {
            Some(index) => &self.lines[..index],
            None => &self.lines,
        }
    }

    /// Indices of all dialogue lines, in order
    pub fn dialogue_indices(&self) -> Vec<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| line.is_dialogue())
            .map(|(index, _)| index)
            .collect()
    }

    /// Number of dialogue lines
    pub fn dialogue_count(&self) -> usize {
        self.lines.iter().filter(|line| line.is_dialogue()).count()
    }
}
