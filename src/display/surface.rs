//! Output surfaces a live display draws on.

use std::sync::{Arc, Mutex, PoisonError};

use console::Term;

use super::config::OutputTarget;
use crate::error::Result;
use crate::render::Frame;

/// Where frames go.
///
/// An interactive surface redraws its region in place on every
/// [`draw`](Surface::draw); a non-interactive one ignores intermediate frames
/// and only writes what it is handed at [`finish`](Surface::finish).
pub trait Surface: Send {
    /// Whether the surface can redraw in place.
    fn is_interactive(&self) -> bool;

    /// Replace the live region with `frame`.
    fn draw(&mut self, frame: &Frame) -> Result<()>;

    /// End the session: leave `frame` on screen, or erase everything when
    /// `None`.
    fn finish(&mut self, frame: Option<&Frame>) -> Result<()>;
}

/// Surface backed by a `console` terminal handle.
#[derive(Debug)]
pub struct TermSurface {
    term: Term,
    interactive: bool,
    colors: bool,
    drawn_lines: usize,
    last_frame: Option<Vec<String>>,
    cursor_hidden: bool,
}

impl TermSurface {
    /// Wrap a terminal handle, detecting whether it is a tty.
    pub fn new(term: Term) -> Self {
        let interactive = term.is_term();
        let colors = interactive && term.features().colors_supported();
        Self {
            term,
            interactive,
            colors,
            drawn_lines: 0,
            last_frame: None,
            cursor_hidden: false,
        }
    }

    /// Draw on the given stream.
    pub fn for_target(target: OutputTarget) -> Self {
        match target {
            OutputTarget::Stdout => Self::new(Term::stdout()),
            OutputTarget::Stderr => Self::new(Term::stderr()),
        }
    }

    /// Lines fitted to the current terminal size.
    fn fit(&self, frame: &Frame) -> Vec<String> {
        let (rows, columns) = self.term.size();
        let (rows, columns) = (rows as usize, columns as usize);

        let mut lines: Vec<String> = frame
            .styled_lines(self.colors)
            .iter()
            .map(|line| console::truncate_str(line, columns, "…").into_owned())
            .collect();
        // Keep the region below the screen height so it can be erased.
        lines.truncate(rows.saturating_sub(1).max(1));
        lines
    }

    fn erase(&mut self) -> Result<()> {
        if self.drawn_lines > 0 {
            self.term.clear_last_lines(self.drawn_lines)?;
            self.drawn_lines = 0;
        }
        Ok(())
    }

    fn write_lines(&mut self, lines: &[String]) -> Result<()> {
        for line in lines {
            self.term.write_line(line)?;
        }
        Ok(())
    }
}

impl Surface for TermSurface {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn draw(&mut self, frame: &Frame) -> Result<()> {
        if !self.interactive {
            return Ok(());
        }

        let lines = self.fit(frame);
        if self.last_frame.as_ref() == Some(&lines) {
            return Ok(());
        }

        if !self.cursor_hidden {
            self.term.hide_cursor()?;
            self.cursor_hidden = true;
        }
        self.erase()?;
        self.write_lines(&lines)?;
        self.drawn_lines = lines.len();
        self.last_frame = Some(lines);
        Ok(())
    }

    fn finish(&mut self, frame: Option<&Frame>) -> Result<()> {
        self.last_frame = None;

        if !self.interactive {
            if let Some(frame) = frame {
                self.write_lines(&frame.plain_lines())?;
            }
            return Ok(());
        }

        self.erase()?;
        if let Some(frame) = frame {
            let lines = self.fit(frame);
            self.write_lines(&lines)?;
            self.term.write_line("")?;
        }
        if self.cursor_hidden {
            self.term.show_cursor()?;
            self.cursor_hidden = false;
        }
        Ok(())
    }
}

impl Drop for TermSurface {
    fn drop(&mut self) {
        if self.cursor_hidden {
            let _ = self.term.show_cursor();
        }
    }
}

#[derive(Debug, Default)]
struct Captured {
    frames: Vec<Vec<String>>,
    visible: Vec<String>,
    finished: bool,
}

/// In-memory surface capturing plain frames.
///
/// Clones share the same buffer, so a test can hand one clone to the display
/// and inspect the other.
#[derive(Debug, Clone)]
pub struct BufferSurface {
    captured: Arc<Mutex<Captured>>,
    interactive: bool,
}

impl Default for BufferSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferSurface {
    /// Interactive buffer recording every distinct frame.
    pub fn new() -> Self {
        Self {
            captured: Arc::default(),
            interactive: true,
        }
    }

    /// Buffer that behaves like a pipe: only the final frame is written.
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            ..Self::new()
        }
    }

    /// Every distinct frame drawn, in order.
    pub fn frames(&self) -> Vec<Vec<String>> {
        self.lock().frames.clone()
    }

    /// What is currently on screen.
    pub fn visible(&self) -> Vec<String> {
        self.lock().visible.clone()
    }

    /// Whether the session has ended.
    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Captured> {
        self.captured.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Surface for BufferSurface {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn draw(&mut self, frame: &Frame) -> Result<()> {
        if !self.interactive {
            return Ok(());
        }
        let lines = frame.plain_lines();
        let mut captured = self.lock();
        if captured.frames.last() != Some(&lines) {
            captured.frames.push(lines.clone());
        }
        captured.visible = lines;
        captured.finished = false;
        Ok(())
    }

    fn finish(&mut self, frame: Option<&Frame>) -> Result<()> {
        let mut captured = self.lock();
        captured.visible = frame.map(Frame::plain_lines).unwrap_or_default();
        captured.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Tone, TreeItem};

    fn frame(text: &str) -> Frame {
        Frame::from_items(vec![TreeItem::text(text, Tone::Active)])
    }

    #[test]
    fn test_buffer_skips_identical_frames() {
        let mut surface = BufferSurface::new();
        let observer = surface.clone();

        surface.draw(&frame("a")).unwrap();
        surface.draw(&frame("a")).unwrap();
        surface.draw(&frame("b")).unwrap();

        assert_eq!(observer.frames(), vec![vec!["a"], vec!["b"]]);
        assert_eq!(observer.visible(), vec!["b"]);
        assert!(!observer.is_finished());
    }

    #[test]
    fn test_buffer_finish_persist_or_erase() {
        let mut surface = BufferSurface::new();
        surface.draw(&frame("running")).unwrap();
        surface.finish(Some(&frame("done"))).unwrap();
        assert_eq!(surface.visible(), vec!["done"]);
        assert!(surface.is_finished());

        let mut transient = BufferSurface::new();
        transient.draw(&frame("running")).unwrap();
        transient.finish(None).unwrap();
        assert!(transient.visible().is_empty());
    }

    #[test]
    fn test_non_interactive_buffer_only_keeps_final_frame() {
        let mut surface = BufferSurface::non_interactive();
        assert!(!surface.is_interactive());

        surface.draw(&frame("running")).unwrap();
        assert!(surface.frames().is_empty());
        assert!(surface.visible().is_empty());

        surface.finish(Some(&frame("done"))).unwrap();
        assert_eq!(surface.visible(), vec!["done"]);
    }

    #[test]
    fn test_term_surface_on_pipe_is_not_interactive() {
        // Test harness output is captured, so the handle is not a tty.
        let mut surface = TermSurface::new(Term::buffered_stdout());
        if surface.is_interactive() {
            return;
        }
        surface.draw(&frame("running")).unwrap();
        assert_eq!(surface.drawn_lines, 0);
        surface.finish(None).unwrap();
    }
}
