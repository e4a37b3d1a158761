//! Line-oriented terminal frontend.
//!
//! Prints session events to a writer (stdout in the binary) with crossterm
//! styling. The comms pane shares the stream, so its lines carry a prefix,
//! and a pane switch in the middle of an open line starts a new row first.

use crate::ansi::{Color, StyleState, StyledSegment};
use crate::core::{Location, Pane, SessionEvent};
use crate::frontend::Frontend;
use anyhow::Result;
use crossterm::queue;
use crossterm::style::{Attribute, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor};
use std::io::Write;

const COMMS_PREFIX: &str = "[comms] ";

pub struct ConsoleFrontend<W: Write> {
    out: W,
    show_timestamps: bool,
    announce_location: bool,
    /// Pane whose line is currently open on the terminal
    open_pane: Option<Pane>,
}

impl<W: Write> ConsoleFrontend<W> {
    pub fn new(out: W, show_timestamps: bool, announce_location: bool) -> Self {
        Self {
            out,
            show_timestamps,
            announce_location,
            open_pane: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn start_line(&mut self, pane: Pane) -> Result<()> {
        match self.open_pane {
            Some(open) if open == pane => return Ok(()),
            Some(_) => queue!(self.out, Print("\n"))?,
            None => {}
        }
        if self.show_timestamps {
            let stamp = chrono::Local::now().format("%H:%M:%S ").to_string();
            queue!(self.out, Print(stamp))?;
        }
        if pane == Pane::Comms {
            queue!(self.out, Print(COMMS_PREFIX))?;
        }
        self.open_pane = Some(pane);
        Ok(())
    }

    fn end_line(&mut self, pane: Pane) -> Result<()> {
        if self.open_pane.is_none() {
            self.start_line(pane)?;
        }
        queue!(self.out, Print("\n"))?;
        self.open_pane = None;
        Ok(())
    }

    fn print_segment(&mut self, segment: &StyledSegment) -> Result<()> {
        let StyleState { fg, bg, bold, underline } = segment.style;
        if let Some(color) = fg {
            queue!(self.out, SetForegroundColor(to_terminal(color)))?;
        }
        if let Some(color) = bg {
            queue!(self.out, SetBackgroundColor(to_terminal(color)))?;
        }
        if bold {
            queue!(self.out, SetAttribute(Attribute::Bold))?;
        }
        if underline {
            queue!(self.out, SetAttribute(Attribute::Underlined))?;
        }
        queue!(self.out, Print(&segment.text))?;
        if segment.style != StyleState::default() {
            queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)?;
        }
        Ok(())
    }

    fn announce(&mut self, location: &Location) -> Result<()> {
        if !self.announce_location {
            return Ok(());
        }
        if self.open_pane.take().is_some() {
            queue!(self.out, Print("\n"))?;
        }
        queue!(
            self.out,
            SetForegroundColor(to_terminal(Color::BrightBlack)),
            Print(format!(
                "[map] area {} level {} room {}\n",
                location.area_id, location.level, location.room_id
            )),
            ResetColor
        )?;
        Ok(())
    }
}

impl<W: Write> Frontend for ConsoleFrontend<W> {
    fn apply(&mut self, events: &[SessionEvent]) -> Result<()> {
        for event in events {
            match event {
                SessionEvent::Write { pane, segments } => {
                    self.start_line(*pane)?;
                    for segment in segments {
                        self.print_segment(segment)?;
                    }
                }
                SessionEvent::Newline { pane } => self.end_line(*pane)?,
                SessionEvent::LocationChanged(location) => self.announce(location)?,
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.open_pane.take().is_some() {
            queue!(self.out, Print("\n"))?;
        }
        queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)?;
        self.out.flush()?;
        Ok(())
    }
}

fn to_terminal(color: Color) -> crossterm::style::Color {
    let (r, g, b) = color.rgb();
    crossterm::style::Color::Rgb { r, g, b }
}
