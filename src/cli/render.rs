//! Terminal rendering of stream messages.

use std::io::Write;

use crate::sse::{AgentEvent, Message};

/// How a message should appear on stdout.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Continues the current line (streamed model output)
    Inline(String),
    /// Stands on its own line
    Line(String),
}

/// Render one message for display.
pub fn render_message(message: &Message) -> Rendered {
    if let Some(text) = message.raw_text() {
        return Rendered::Line(format!("[unparsed] {}", text));
    }

    match message.decode::<AgentEvent>() {
        Ok(AgentEvent::Chunk { content }) => Rendered::Inline(content),
        Ok(AgentEvent::Start { conversation_id }) => Rendered::Line(format!(
            "[conversation {}]",
            conversation_id.as_deref().unwrap_or("-")
        )),
        Ok(AgentEvent::Update(progress)) => Rendered::Line(format!(
            "[plan {}] running={} completed={}",
            progress.plan_id.as_deref().unwrap_or("-"),
            progress.running.unwrap_or(false),
            progress.completed.unwrap_or(false),
        )),
        Ok(AgentEvent::Done(_)) => Rendered::Line("[done]".to_string()),
        Ok(AgentEvent::Error { message, .. }) => Rendered::Line(format!(
            "[error] {}",
            message.as_deref().unwrap_or("unknown error")
        )),
        // Not an agent event; show the payload as-is
        Err(_) => Rendered::Line(
            message
                .json()
                .map(|value| value.to_string())
                .unwrap_or_default(),
        ),
    }
}

/// Writes rendered messages, keeping inline text and lines apart.
pub struct Printer<W: Write> {
    out: W,
    mid_line: bool,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            mid_line: false,
        }
    }

    pub fn print(&mut self, rendered: Rendered) -> std::io::Result<()> {
        match rendered {
            Rendered::Inline(text) => {
                write!(self.out, "{}", text)?;
                self.mid_line = !text.ends_with('\n');
            }
            Rendered::Line(line) => {
                self.end_line()?;
                writeln!(self.out, "{}", line)?;
            }
        }
        self.out.flush()
    }

    /// Terminate a partially written line.
    pub fn end_line(&mut self) -> std::io::Result<()> {
        if self.mid_line {
            writeln!(self.out)?;
            self.mid_line = false;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
