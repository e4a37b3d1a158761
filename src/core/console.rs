use crate::ansi::{AnsiRenderer, StyledSegment};
use crate::core::session::{Pane, SessionEvent};
use std::collections::VecDeque;

/// Output pane state (rendering-agnostic)
///
/// Each pane owns its own ANSI renderer, so a color left open in the main
/// pane does not bleed into the comms pane. Finished lines are kept in a
/// bounded scrollback; frontends consume the emitted [`SessionEvent`]s.
#[derive(Debug, Clone)]
pub struct Console {
    pane: Pane,

    renderer: AnsiRenderer,

    /// Finished lines, oldest first
    pub lines: VecDeque<Vec<StyledSegment>>,

    /// Maximum number of lines to keep in buffer
    pub max_lines: usize,

    /// Accumulator for the line being written
    pub(crate) current_line: Vec<StyledSegment>,
}

impl Console {
    pub fn new(pane: Pane, max_lines: usize) -> Self {
        Self {
            pane,
            renderer: AnsiRenderer::new(),
            lines: VecDeque::new(),
            max_lines,
            current_line: Vec::new(),
        }
    }

    /// Write text without ending the line. Each `\n` in `text` starts a new
    /// line; the pieces between are rendered with the pane's style state.
    pub fn write(&mut self, text: &str, events: &mut Vec<SessionEvent>) {
        for (i, piece) in text.split('\n').enumerate() {
            if i > 0 {
                self.finish_line();
                events.push(SessionEvent::Newline { pane: self.pane });
            }
            if piece.is_empty() {
                continue;
            }
            let segments = self.renderer.render(piece);
            if segments.is_empty() {
                continue;
            }
            self.current_line.extend(segments.iter().cloned());
            events.push(SessionEvent::Write {
                pane: self.pane,
                segments,
            });
        }
    }

    /// Write text and end the line
    pub fn writeln(&mut self, text: &str, events: &mut Vec<SessionEvent>) {
        self.write(&format!("{}\n", text), events);
    }

    /// Forget the style left open by the previous stream
    pub fn reset_style(&mut self) {
        self.renderer.reset();
    }

    /// Plain text of the finished lines, for inspection
    #[cfg(test)]
    pub fn plain_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| line.iter().map(|s| s.text.as_str()).collect())
            .collect()
    }

    fn finish_line(&mut self) {
        let line = std::mem::take(&mut self.current_line);
        self.lines.push_back(line);

        // Trim to max_lines
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ansi::Color;

    #[test]
    fn test_console_basic() {
        let mut console = Console::new(Pane::Main, 100);
        let mut events = Vec::new();
        console.writeln("Hello", &mut events);
        assert_eq!(console.plain_lines(), vec!["Hello"]);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], SessionEvent::Newline { pane: Pane::Main }));
    }

    #[test]
    fn test_write_keeps_line_open() {
        let mut console = Console::new(Pane::Main, 100);
        let mut events = Vec::new();
        console.write("*", &mut events);
        console.write("*", &mut events);
        assert!(console.lines.is_empty());
        console.writeln("", &mut events);
        assert_eq!(console.plain_lines(), vec!["**"]);
    }

    #[test]
    fn test_embedded_newlines_and_blank_lines() {
        let mut console = Console::new(Pane::Comms, 100);
        let mut events = Vec::new();
        console.writeln("one\n\nthree", &mut events);
        assert_eq!(console.plain_lines(), vec!["one", "", "three"]);
        let newlines = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Newline { pane: Pane::Comms }))
            .count();
        assert_eq!(newlines, 3);
    }

    #[test]
    fn test_style_carries_between_lines() {
        let mut console = Console::new(Pane::Main, 100);
        let mut events = Vec::new();
        console.writeln("\x1b[32mgreen", &mut events);
        console.writeln("still green", &mut events);
        assert_eq!(console.lines[1][0].style.fg, Some(Color::Green));
    }

    #[test]
    fn test_scrollback_trimmed() {
        let mut console = Console::new(Pane::Main, 2);
        let mut events = Vec::new();
        for line in ["a", "b", "c"] {
            console.writeln(line, &mut events);
        }
        assert_eq!(console.plain_lines(), vec!["b", "c"]);
    }
}
