//! Line framing for the inbound text stream.
//!
//! The transport hands us chunks cut at arbitrary points, and the server mixes
//! `\r\n`, `\n\r`, `\r\0` and bare terminators. The framer reassembles the
//! cumulative buffer into [`LineEvent`]s. Trailing text with no terminator is
//! released either immediately (prompts, spinner ticks) or when the flush
//! deadline passes.

use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Default delay before an unterminated tail is flushed
pub const DEFAULT_FLUSH_DELAY: Duration = Duration::from_millis(250);

/// Login prompts that never receive a terminator
pub const DEFAULT_PROMPTS: &[&str] = &["By what name do you wish to be known? ", "Passphrase: "];

/// Single-character frames of the server's spinner animations
pub const DEFAULT_TICK_GLYPHS: &[&str] = &[" ", "-", "=", "+", "*"];

const PROMPT_SUFFIX: &str = "> ";

/// One framed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEvent {
    pub text: String,
    /// Terminator that ended the line; empty for fast-path and timed flushes
    pub delimiter: String,
    pub is_prompt: bool,
    pub is_timer_tick: bool,
}

/// Reassembles chunked text into lines
#[derive(Debug, Clone)]
pub struct StreamFramer {
    buffer: String,
    /// Scheduled flush of `buffer`; at most one is outstanding
    pending_flush: Option<Instant>,
    flush_delay: Duration,
    prompts: Vec<String>,
    tick_glyphs: Vec<String>,
}

impl StreamFramer {
    pub fn new() -> Self {
        Self::with_settings(
            DEFAULT_FLUSH_DELAY,
            DEFAULT_PROMPTS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_TICK_GLYPHS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn with_settings(flush_delay: Duration, prompts: Vec<String>, tick_glyphs: Vec<String>) -> Self {
        Self {
            buffer: String::new(),
            pending_flush: None,
            flush_delay,
            prompts,
            tick_glyphs,
        }
    }

    /// Consume a chunk and return every line it completes.
    pub fn feed(&mut self, chunk: &str, now: Instant) -> Vec<LineEvent> {
        // New data supersedes a scheduled flush
        self.pending_flush = None;
        self.buffer.push_str(chunk);

        let (mut pairs, consumed) = split_lines(&self.buffer);
        self.buffer.drain(..consumed);

        if self.is_fast_path(&self.buffer) {
            let tail = std::mem::take(&mut self.buffer);
            pairs.push((tail, String::new()));
        }

        let events = pairs
            .into_iter()
            .map(|(text, delimiter)| self.make_event(text, delimiter))
            .collect();

        if !self.buffer.is_empty() {
            self.pending_flush = Some(now + self.flush_delay);
        }

        events
    }

    /// When the buffered tail will be flushed, if anything is buffered
    pub fn flush_deadline(&self) -> Option<Instant> {
        self.pending_flush
    }

    /// Flush the buffered tail if its deadline has passed.
    pub fn flush_due(&mut self, now: Instant) -> Option<LineEvent> {
        let deadline = self.pending_flush?;
        if now < deadline {
            return None;
        }
        self.pending_flush = None;
        if self.buffer.is_empty() {
            return None;
        }

        let text = std::mem::take(&mut self.buffer);
        debug!("Flushing after delay: {:?}", text);
        Some(LineEvent {
            text,
            delimiter: String::new(),
            is_prompt: false,
            is_timer_tick: false,
        })
    }

    /// Drop buffered text and any scheduled flush (new session)
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pending_flush = None;
    }

    /// Text received but not yet emitted
    #[cfg(test)]
    pub fn remainder(&self) -> &str {
        &self.buffer
    }

    fn is_tick(&self, text: &str) -> bool {
        self.tick_glyphs.iter().any(|glyph| glyph == text)
    }

    fn is_fast_path(&self, tail: &str) -> bool {
        if tail.is_empty() {
            return false;
        }
        self.prompts.iter().any(|prompt| prompt == tail)
            || tail.ends_with(PROMPT_SUFFIX)
            || self.is_tick(tail)
    }

    fn make_event(&self, text: String, delimiter: String) -> LineEvent {
        LineEvent {
            is_prompt: text.ends_with(PROMPT_SUFFIX),
            is_timer_tick: self.is_tick(&text),
            text,
            delimiter,
        }
    }
}

impl Default for StreamFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Length of the terminator starting at `i`, if any.
///
/// Alternatives are tried in the order `\r\n`, `\n\r`, `\r\0`, `\r`, `\n`,
/// `\0`; the first that matches wins.
fn delimiter_at(bytes: &[u8], i: usize) -> Option<usize> {
    let next = bytes.get(i + 1).copied();
    match bytes[i] {
        b'\r' => match next {
            Some(b'\n') | Some(b'\0') => Some(2),
            _ => Some(1),
        },
        b'\n' => match next {
            Some(b'\r') => Some(2),
            _ => Some(1),
        },
        b'\0' => Some(1),
        _ => None,
    }
}

/// Split `buffer` at every terminator. Returns the kept `(text, delimiter)`
/// pairs and the byte length consumed.
fn split_lines(buffer: &str) -> (Vec<(String, String)>, usize) {
    let bytes = buffer.as_bytes();
    let mut pairs = Vec::new();
    let mut start = 0;
    let mut i = 0;

    // Terminators are ASCII, so every split lands on a char boundary
    while i < bytes.len() {
        let Some(len) = delimiter_at(bytes, i) else {
            i += 1;
            continue;
        };

        let text = &buffer[start..i];
        let delimiter = &buffer[i..i + len];

        // Carriage-return noise is dropped; blank lines from real newlines stay
        if !text.trim().is_empty() || delimiter.contains('\n') {
            pairs.push((text.to_string(), delimiter.to_string()));
        }

        i += len;
        start = i;
    }

    (pairs, start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(events: &[LineEvent]) -> Vec<(&str, &str)> {
        events
            .iter()
            .map(|e| (e.text.as_str(), e.delimiter.as_str()))
            .collect()
    }

    #[test]
    fn test_mixed_delimiters() {
        let mut framer = StreamFramer::new();
        let now = Instant::now();
        let events = framer.feed("one\r\ntwo\n\rthree\r\0four\rfive\nsix\0", now);
        assert_eq!(
            texts(&events),
            vec![
                ("one", "\r\n"),
                ("two", "\n\r"),
                ("three", "\r\0"),
                ("four", "\r"),
                ("five", "\n"),
                ("six", "\0"),
            ]
        );
        assert_eq!(framer.remainder(), "");
        assert_eq!(framer.flush_deadline(), None);
    }

    #[test]
    fn test_blank_lines_kept_only_with_newline() {
        let mut framer = StreamFramer::new();
        let events = framer.feed("a\n\n  \r\n \r\r\0b\n", Instant::now());
        assert_eq!(texts(&events), vec![("a", "\n"), ("", "\n"), ("  ", "\r\n"), ("b", "\n")]);
    }

    #[test]
    fn test_tail_is_buffered_across_chunks() {
        let mut framer = StreamFramer::new();
        let now = Instant::now();
        assert!(framer.feed("You are stand", now).is_empty());
        assert_eq!(framer.remainder(), "You are stand");
        let events = framer.feed("ing here.\r\n", now);
        assert_eq!(texts(&events), vec![("You are standing here.", "\r\n")]);
        assert_eq!(framer.flush_deadline(), None);
    }

    #[test]
    fn test_prompt_fast_path() {
        let mut framer = StreamFramer::new();
        let events = framer.feed("Done.\r\nHP:Healthy SP:Full > ", Instant::now());
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].text, "HP:Healthy SP:Full > ");
        assert_eq!(events[1].delimiter, "");
        assert!(events[1].is_prompt);
        assert!(!events[0].is_prompt);
        assert_eq!(framer.flush_deadline(), None);
    }

    #[test]
    fn test_prompt_split_across_chunks() {
        let mut framer = StreamFramer::new();
        let now = Instant::now();
        assert!(framer.feed("HP:Healthy >", now).is_empty());
        assert!(framer.flush_deadline().is_some());
        let events = framer.feed(" ", now);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_prompt);
        assert_eq!(framer.flush_deadline(), None);
    }

    #[test]
    fn test_login_prompts_flush_without_prompt_flag() {
        let mut framer = StreamFramer::new();
        let events = framer.feed("By what name do you wish to be known? ", Instant::now());
        assert_eq!(events.len(), 1);
        assert!(!events[0].is_prompt);

        let events = framer.feed("Passphrase: ", Instant::now());
        assert_eq!(events[0].text, "Passphrase: ");
        assert_eq!(framer.remainder(), "");
    }

    #[test]
    fn test_tick_glyph_only_when_whole_tail() {
        let mut framer = StreamFramer::new();
        let now = Instant::now();
        let events = framer.feed("*", now);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_timer_tick);

        assert!(framer.feed("**", now).is_empty());
        assert_eq!(framer.remainder(), "**");
    }

    #[test]
    fn test_tick_flag_on_delimited_line() {
        let mut framer = StreamFramer::new();
        let events = framer.feed("-\n", Instant::now());
        assert!(events[0].is_timer_tick);
    }

    #[test]
    fn test_flush_after_delay() {
        let mut framer = StreamFramer::new();
        let t0 = Instant::now();
        assert!(framer.feed("partial", t0).is_empty());
        assert_eq!(framer.flush_deadline(), Some(t0 + DEFAULT_FLUSH_DELAY));

        assert_eq!(framer.flush_due(t0 + Duration::from_millis(249)), None);
        let event = framer
            .flush_due(t0 + DEFAULT_FLUSH_DELAY)
            .expect("flush should fire");
        assert_eq!(event.text, "partial");
        assert!(!event.is_prompt);
        assert!(!event.is_timer_tick);

        // Exactly once
        assert_eq!(framer.flush_due(t0 + Duration::from_secs(5)), None);
        assert_eq!(framer.flush_deadline(), None);
    }

    #[test]
    fn test_feed_reschedules_flush() {
        let mut framer = StreamFramer::new();
        let t0 = Instant::now();
        framer.feed("still", t0);
        let t1 = t0 + Duration::from_millis(200);
        framer.feed(" growing", t1);
        assert_eq!(framer.flush_deadline(), Some(t1 + DEFAULT_FLUSH_DELAY));
        assert_eq!(framer.flush_due(t0 + DEFAULT_FLUSH_DELAY), None);
        assert_eq!(
            framer.flush_due(t1 + DEFAULT_FLUSH_DELAY).map(|e| e.text),
            Some("still growing".to_string())
        );
    }

    #[test]
    fn test_reset_discards_state() {
        let mut framer = StreamFramer::new();
        framer.feed("stale", Instant::now());
        framer.reset();
        assert_eq!(framer.remainder(), "");
        assert_eq!(framer.flush_deadline(), None);
    }

    #[test]
    fn test_lossless_across_arbitrary_splits() {
        let input = "Welcome!\r\nThe Plains\r\nA wide field.\nObvious exits: N S\r\nHP:Full > more text";
        let reference = {
            let mut framer = StreamFramer::new();
            let mut out: String = framer
                .feed(input, Instant::now())
                .iter()
                .map(|e| format!("{}{}", e.text, e.delimiter))
                .collect();
            out.push_str(framer.remainder());
            out
        };
        assert_eq!(reference, input);

        for split in 1..input.len() {
            let mut framer = StreamFramer::new();
            let now = Instant::now();
            let mut out = String::new();
            for chunk in [&input[..split], &input[split..]] {
                for event in framer.feed(chunk, now) {
                    out.push_str(&event.text);
                    out.push_str(&event.delimiter);
                }
            }
            out.push_str(framer.remainder());
            assert_eq!(out, input, "split at {}", split);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_with_paused_clock() {
        let mut framer = StreamFramer::new();
        framer.feed("Some unterminated text", Instant::now());
        let deadline = framer.flush_deadline().expect("scheduled");
        tokio::time::sleep_until(deadline).await;
        let event = framer.flush_due(Instant::now()).expect("due");
        assert_eq!(event.text, "Some unterminated text");
    }
}
