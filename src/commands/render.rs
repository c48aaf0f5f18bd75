//! Terminal rendering of conversation state.
//!
//! Two renderers share one look: `write_transcript` prints a settled
//! transcript in full (replay, session export), and `ProgressPrinter`
//! follows a live run incrementally, printing only what each snapshot
//! added. Streamed answer text goes out as it arrives; tool activity and
//! status updates get their own lines.

use std::collections::HashSet;
use std::io::{self, Write};

use warroom::conversation::{
    AssistantMessage, ConversationState, Message, MessageStatus, ToolCall, ToolCallStatus,
};

// ============================================================================
// Shared line formats
// ============================================================================

fn tool_call_header(call: &ToolCall) -> String {
    format!("  [{}] {} <- {}", call.step, call.agent, call.query)
}

fn tool_call_outcome(call: &ToolCall) -> Option<String> {
    match call.status {
        ToolCallStatus::Error => Some(format!(
            "  [{}] {} failed: {}",
            call.step,
            call.agent,
            call.error.as_deref().unwrap_or("unknown error")
        )),
        ToolCallStatus::Complete => {
            let duration = call.duration.as_deref().unwrap_or("?");
            let mut line = format!("  [{}] {} finished in {}", call.step, call.agent, duration);
            if let Some(response) = &call.response {
                line.push_str(": ");
                line.push_str(response);
            }
            Some(line)
        }
        ToolCallStatus::Pending | ToolCallStatus::Running => None,
    }
}

fn outcome_line(message: &AssistantMessage) -> Option<String> {
    match message.status {
        MessageStatus::Complete => message
            .run_meta
            .as_ref()
            .map(|meta| format!("  (steps: {}, time: {})", meta.steps, meta.time)),
        MessageStatus::Error => Some(format!(
            "!! run failed: {}",
            message.error_message.as_deref().unwrap_or("unknown error")
        )),
        MessageStatus::Cancelled => Some("!! run cancelled".to_string()),
        MessageStatus::Pending | MessageStatus::Streaming => {
            Some("  (run still in progress)".to_string())
        }
    }
}

// ============================================================================
// Full transcript
// ============================================================================

/// Print a settled transcript to stdout.
pub fn print_transcript(messages: &[Message]) {
    let stdout = io::stdout();
    let _ = write_transcript(&mut stdout.lock(), messages);
}

fn write_transcript<W: Write>(out: &mut W, messages: &[Message]) -> io::Result<()> {
    for message in messages {
        match message {
            Message::User(user) => writeln!(out, "> {}", user.text)?,
            Message::Assistant(assistant) => write_assistant(out, assistant)?,
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_assistant<W: Write>(out: &mut W, message: &AssistantMessage) -> io::Result<()> {
    for call in &message.tool_calls {
        writeln!(out, "{}", tool_call_header(call))?;
        if let Some(reasoning) = &call.reasoning {
            writeln!(out, "      reasoning: {}", reasoning)?;
        }
        if let Some(sub_steps) = &call.sub_steps {
            for sub in sub_steps {
                match &sub.result {
                    Some(result) => writeln!(out, "      - {}: {}", sub.query, result)?,
                    None => writeln!(out, "      - {}", sub.query)?,
                }
            }
        }
        if let Some(line) = tool_call_outcome(call) {
            writeln!(out, "{}", line)?;
        }
    }

    if !message.content.is_empty() {
        writeln!(out, "{}", message.content)?;
    } else if !message.streaming_content.is_empty() {
        writeln!(out, "{}", message.streaming_content)?;
    }

    if let Some(line) = outcome_line(message) {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

// ============================================================================
// Live progress
// ============================================================================

/// Incremental renderer over a stream of state snapshots.
///
/// Snapshots may coalesce: between two `observe` calls any number of
/// actions can have applied. The printer tracks what it already wrote
/// per message and emits only the difference, so output is identical
/// whether snapshots arrive one action at a time or in bursts.
pub struct ProgressPrinter<W: Write> {
    out: W,
    settled_messages: usize,
    current_id: Option<String>,
    rendered_tools: usize,
    completed_tools: HashSet<String>,
    rendered_content: String,
    last_status: Option<String>,
    outcome_rendered: bool,
    line_open: bool,
}

impl<W: Write> ProgressPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            settled_messages: 0,
            current_id: None,
            rendered_tools: 0,
            completed_tools: HashSet::new(),
            rendered_content: String::new(),
            last_status: None,
            outcome_rendered: false,
            line_open: false,
        }
    }

    /// Render everything this snapshot added over the previous one.
    pub fn observe(&mut self, state: &ConversationState) -> io::Result<()> {
        for index in self.settled_messages..state.messages.len() {
            let is_last = index + 1 == state.messages.len();
            match &state.messages[index] {
                Message::User(user) => {
                    self.break_line()?;
                    writeln!(self.out, "> {}", user.text)?;
                    self.settle(index);
                }
                Message::Assistant(assistant) => {
                    self.follow_assistant(assistant)?;
                    if is_last {
                        break;
                    }
                    self.settle(index);
                }
            }
        }
        self.out.flush()
    }

    fn follow_assistant(&mut self, message: &AssistantMessage) -> io::Result<()> {
        if self.current_id.as_deref() != Some(message.id.as_str()) {
            self.reset_trackers(message.id.clone());
        }

        if message.status_message != self.last_status {
            if let Some(status) = &message.status_message {
                self.break_line()?;
                writeln!(self.out, "  .. {}", status)?;
            }
            self.last_status = message.status_message.clone();
        }

        while self.rendered_tools < message.tool_calls.len() {
            let call = &message.tool_calls[self.rendered_tools];
            self.break_line()?;
            writeln!(self.out, "{}", tool_call_header(call))?;
            self.rendered_tools += 1;
        }

        // Completions can land in any order relative to starts.
        for call in &message.tool_calls[..self.rendered_tools] {
            if call.status.is_terminal() && self.completed_tools.insert(call.id.clone()) {
                if let Some(line) = tool_call_outcome(call) {
                    self.break_line()?;
                    writeln!(self.out, "{}", line)?;
                }
            }
        }

        if message.streaming_content.len() > self.rendered_content.len()
            && message.streaming_content.starts_with(&self.rendered_content)
        {
            write!(
                self.out,
                "{}",
                &message.streaming_content[self.rendered_content.len()..]
            )?;
            self.rendered_content = message.streaming_content.clone();
            self.line_open = true;
        }

        if message.status.is_terminal() && !self.outcome_rendered {
            self.outcome_rendered = true;
            if message.status == MessageStatus::Complete && message.content != self.rendered_content
            {
                // The authoritative final text differs from the preview.
                self.break_line()?;
                if !message.content.is_empty() {
                    writeln!(self.out, "{}", message.content)?;
                }
            } else {
                self.break_line()?;
            }
            if let Some(line) = outcome_line(message) {
                writeln!(self.out, "{}", line)?;
            }
        }
        Ok(())
    }

    fn settle(&mut self, index: usize) {
        self.settled_messages = index + 1;
        self.reset_trackers_empty();
    }

    fn reset_trackers(&mut self, id: String) {
        self.reset_trackers_empty();
        self.current_id = Some(id);
    }

    fn reset_trackers_empty(&mut self) {
        self.current_id = None;
        self.rendered_tools = 0;
        self.completed_tools.clear();
        self.rendered_content.clear();
        self.last_status = None;
        self.outcome_rendered = false;
    }

    fn break_line(&mut self) -> io::Result<()> {
        if self.line_open {
            writeln!(self.out)?;
            self.line_open = false;
        }
        Ok(())
    }
}
