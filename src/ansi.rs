//! ANSI SGR rendering for game output.
//!
//! The server only sends style codes when the style changes, so the renderer
//! keeps its [`StyleState`] between calls instead of re-parsing history.

use regex::Regex;

/// One of the sixteen basic ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

impl Color {
    const BASIC: [Color; 8] = [
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Yellow,
        Color::Blue,
        Color::Magenta,
        Color::Cyan,
        Color::White,
    ];

    const BRIGHT: [Color; 8] = [
        Color::BrightBlack,
        Color::BrightRed,
        Color::BrightGreen,
        Color::BrightYellow,
        Color::BrightBlue,
        Color::BrightMagenta,
        Color::BrightCyan,
        Color::BrightWhite,
    ];

    /// Foreground color for an SGR code (30-37, 90-97)
    pub fn from_fg_code(code: u32) -> Option<Self> {
        match code {
            30..=37 => Some(Self::BASIC[(code - 30) as usize]),
            90..=97 => Some(Self::BRIGHT[(code - 90) as usize]),
            _ => None,
        }
    }

    /// Background color for an SGR code (40-47, 100-107)
    pub fn from_bg_code(code: u32) -> Option<Self> {
        match code {
            40..=47 => Some(Self::BASIC[(code - 40) as usize]),
            100..=107 => Some(Self::BRIGHT[(code - 100) as usize]),
            _ => None,
        }
    }

    /// Display palette value
    pub fn hex(self) -> &'static str {
        match self {
            Self::Black => "#000",
            Self::Red => "#ff5555",
            Self::Green => "#50fa7b",
            Self::Yellow => "#f1fa8c",
            Self::Blue => "#bd93f9",
            Self::Magenta => "#ff79c6",
            Self::Cyan => "#8be9fd",
            Self::White => "#f8f8f2",
            Self::BrightBlack => "#6272a4",
            Self::BrightRed => "#ff6e6e",
            Self::BrightGreen => "#69ff94",
            Self::BrightYellow => "#ffffa5",
            Self::BrightBlue => "#d6acff",
            Self::BrightMagenta => "#ff92df",
            Self::BrightCyan => "#a4ffff",
            Self::BrightWhite => "#ffffff",
        }
    }

    /// Palette value as an RGB triple
    pub fn rgb(self) -> (u8, u8, u8) {
        let hex = self.hex().trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).unwrap_or(0);
        if hex.len() == 3 {
            // #rgb shorthand: each digit is doubled
            let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
            (expand(0), expand(1), expand(2))
        } else {
            (channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6]))
        }
    }
}

/// Persistent SGR state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleState {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
    pub underline: bool,
}

impl StyleState {
    /// Apply a single SGR code. Unknown codes are ignored.
    ///
    /// Codes are matched as written: `01` is not `1`.
    fn apply(&mut self, code: &str) {
        if code.len() > 1 && code.starts_with('0') {
            return;
        }
        let Ok(value) = code.parse::<u32>() else {
            return;
        };
        match value {
            0 => *self = StyleState::default(),
            1 => self.bold = true,
            4 => self.underline = true,
            39 => self.fg = None,
            49 => self.bg = None,
            _ => {
                if let Some(color) = Color::from_fg_code(value) {
                    self.fg = Some(color);
                } else if let Some(color) = Color::from_bg_code(value) {
                    self.bg = Some(color);
                }
            }
        }
    }
}

/// A run of text drawn with one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSegment {
    pub text: String,
    pub style: StyleState,
}

/// Converts escape-coded text into styled segments, carrying state across calls
#[derive(Debug, Clone)]
pub struct AnsiRenderer {
    state: StyleState,
    sgr: Regex,
}

impl AnsiRenderer {
    pub fn new() -> Self {
        Self {
            state: StyleState::default(),
            // Only `ESC [ digits/semicolons m`; bare `ESC [ m` stays literal
            sgr: Regex::new(r"\x1b\[([0-9;]+)m").expect("static SGR pattern"),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> StyleState {
        self.state
    }

    /// Forget any style left open by the previous stream
    pub fn reset(&mut self) {
        self.state = StyleState::default();
    }

    /// Render one chunk of text. Styles apply to the text that follows them.
    pub fn render(&mut self, text: &str) -> Vec<StyledSegment> {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in self.sgr.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > last {
                segments.push(StyledSegment {
                    text: text[last..whole.start()].to_string(),
                    style: self.state,
                });
            }

            if let Some(payload) = caps.get(1) {
                for code in payload.as_str().split(';') {
                    self.state.apply(code);
                }
            }

            last = whole.end();
        }

        if last < text.len() {
            segments.push(StyledSegment {
                text: text[last..].to_string(),
                style: self.state,
            });
        }

        segments
    }
}

impl Default for AnsiRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> StyleState {
        StyleState {
            fg: Some(Color::Red),
            ..StyleState::default()
        }
    }

    #[test]
    fn test_plain_text() {
        let mut renderer = AnsiRenderer::new();
        let segments = renderer.render("You are standing in a field.");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "You are standing in a field.");
        assert_eq!(segments[0].style, StyleState::default());
    }

    #[test]
    fn test_code_applies_to_following_text() {
        let mut renderer = AnsiRenderer::new();
        let segments = renderer.render("a\x1b[31mb\x1b[0mc");
        assert_eq!(
            segments,
            vec![
                StyledSegment { text: "a".into(), style: StyleState::default() },
                StyledSegment { text: "b".into(), style: red() },
                StyledSegment { text: "c".into(), style: StyleState::default() },
            ]
        );
    }

    #[test]
    fn test_state_persists_across_calls() {
        let whole = AnsiRenderer::new().render("\x1b[31mHi\x1b[0m there");

        let mut split = AnsiRenderer::new();
        let mut segments = split.render("\x1b[31mHi");
        segments.extend(split.render("\x1b[0m there"));

        assert_eq!(segments, whole);
        assert_eq!(segments[0], StyledSegment { text: "Hi".into(), style: red() });
        assert_eq!(segments[1].text, " there");
        assert_eq!(segments[1].style, StyleState::default());
    }

    #[test]
    fn test_color_carries_into_next_line() {
        let mut renderer = AnsiRenderer::new();
        renderer.render("\x1b[1;36m");
        let segments = renderer.render("The Plains");
        assert_eq!(segments.len(), 1);
        assert!(segments[0].style.bold);
        assert_eq!(segments[0].style.fg, Some(Color::Cyan));
    }

    #[test]
    fn test_compound_codes_and_clears() {
        let mut renderer = AnsiRenderer::new();
        renderer.render("\x1b[4;92;104m");
        let state = renderer.state();
        assert!(state.underline);
        assert_eq!(state.fg, Some(Color::BrightGreen));
        assert_eq!(state.bg, Some(Color::BrightBlue));

        renderer.render("\x1b[39m");
        assert_eq!(renderer.state().fg, None);
        assert_eq!(renderer.state().bg, Some(Color::BrightBlue));

        renderer.render("\x1b[49m");
        assert_eq!(renderer.state().bg, None);
        assert!(renderer.state().underline);
    }

    #[test]
    fn test_unknown_codes_ignored() {
        let mut renderer = AnsiRenderer::new();
        renderer.render("\x1b[31m\x1b[5;38;7m");
        assert_eq!(renderer.state(), red());
    }

    #[test]
    fn test_empty_code_is_not_a_reset() {
        let mut renderer = AnsiRenderer::new();
        renderer.render("\x1b[31;m");
        assert_eq!(renderer.state(), red());
    }

    #[test]
    fn test_zero_padded_codes_ignored() {
        let mut renderer = AnsiRenderer::new();
        renderer.render("\x1b[01m\x1b[031m");
        assert_eq!(renderer.state(), StyleState::default());

        renderer.render("\x1b[31m\x1b[00m");
        assert_eq!(renderer.state(), red());
        renderer.render("\x1b[0m");
        assert_eq!(renderer.state(), StyleState::default());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut renderer = AnsiRenderer::new();
        renderer.render("\x1b[1;31m");
        renderer.reset();
        let segments = renderer.render("plain");
        assert_eq!(segments[0].style, StyleState::default());
    }

    #[test]
    fn test_bare_escape_left_literal() {
        let mut renderer = AnsiRenderer::new();
        let segments = renderer.render("x\x1b[my");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "x\x1b[my");
    }

    #[test]
    fn test_no_empty_segments() {
        let mut renderer = AnsiRenderer::new();
        assert!(renderer.render("\x1b[31m\x1b[1m").is_empty());
        assert!(renderer.render("").is_empty());
    }

    #[test]
    fn test_palette_rgb() {
        assert_eq!(Color::Red.rgb(), (0xff, 0x55, 0x55));
        assert_eq!(Color::Black.rgb(), (0, 0, 0));
        assert_eq!(Color::BrightWhite.rgb(), (0xff, 0xff, 0xff));
    }
}
