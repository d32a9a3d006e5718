//! SSE frame assembly.
//!
//! Lines are classified by [`parse_sse_line`] and accumulated by
//! [`FrameAssembler`] until a blank line terminates the frame. Multiple
//! `data:` lines are joined with `\n`; `event:` and `id:` keep the last value
//! seen; any other field (`retry:`, comments, unknown names) is ignored.

/// A single classified line of an event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SseLine {
    /// Blank line (empty after trim) - terminates the pending frame
    Empty,
    /// `event: <name>`
    Event(String),
    /// `id: <identifier>`
    Id(String),
    /// `data: <payload chunk>`
    Data(String),
    /// Comments and unrecognized fields
    Ignored,
}

/// One assembled event-stream frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

impl Frame {
    /// Build a data-only frame.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    /// Set the event name.
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Set the event id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Strip the field name and at most one following space.
fn field_value<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    line.strip_prefix(field)
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
}

/// Classify a single line (without its terminator).
pub fn parse_sse_line(line: &str) -> SseLine {
    if line.trim().is_empty() {
        return SseLine::Empty;
    }

    if let Some(value) = field_value(line, "data:") {
        return SseLine::Data(value.to_string());
    }

    if let Some(value) = field_value(line, "event:") {
        return SseLine::Event(value.to_string());
    }

    if let Some(value) = field_value(line, "id:") {
        return SseLine::Id(value.to_string());
    }

    SseLine::Ignored
}

/// Stateful assembler that turns lines into frames.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    event: Option<String>,
    id: Option<String>,
    /// Accumulated data lines (SSE allows multiple data: lines)
    data_lines: Vec<String>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one line, returning a frame when a blank line completes one.
    pub fn consume(&mut self, line: &str) -> Option<Frame> {
        match parse_sse_line(line) {
            SseLine::Empty => self.take_pending(),
            SseLine::Data(data) => {
                self.data_lines.push(data);
                None
            }
            SseLine::Event(event) => {
                self.event = Some(event);
                None
            }
            SseLine::Id(id) => {
                self.id = Some(id);
                None
            }
            SseLine::Ignored => None,
        }
    }

    /// Flush the pending frame at end of stream, if it has any content.
    pub fn finish(&mut self) -> Option<Frame> {
        self.take_pending()
    }

    /// Whether fields have been seen since the last emitted frame.
    pub fn has_pending(&self) -> bool {
        self.event.is_some() || self.id.is_some() || !self.data_lines.is_empty()
    }

    /// Discard any partially assembled frame.
    pub fn reset(&mut self) {
        self.event = None;
        self.id = None;
        self.data_lines.clear();
    }

    fn take_pending(&mut self) -> Option<Frame> {
        if !self.has_pending() {
            return None;
        }

        let frame = Frame {
            event: self.event.take(),
            id: self.id.take(),
            data: self.data_lines.join("\n"),
        };
        self.data_lines.clear();
        Some(frame)
    }
}
