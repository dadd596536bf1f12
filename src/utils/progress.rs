//! Progress reporting for long column passes.
//!
//! Sinks only observe; nothing they do feeds back into conversion.

use std::io::{self, IsTerminal, Write};

use crossterm::cursor::MoveToColumn;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use crossterm::QueueableCommand;

const BAR_WIDTH: usize = 30;

/// Receives progress notifications from a conversion pass.
pub trait ProgressSink {
    /// A new pass over `total` units begins.
    fn start(&mut self, _label: &str, _total: u32) {}

    /// `done` out of `total` units are finished.
    fn notify(&mut self, done: u32, total: u32);

    /// The pass is over.
    fn finish(&mut self) {}
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn notify(&mut self, _done: u32, _total: u32) {}
}

fn percent(done: u32, total: u32) -> u32 {
    if total == 0 {
        100
    } else {
        ((u64::from(done) * 100) / u64::from(total)) as u32
    }
}

/// Prints a line every time another 10% is reached.
#[derive(Debug)]
pub struct PlainProgress<W: Write> {
    out: W,
    last: u32,
}

impl<W: Write> PlainProgress<W> {
    /// Creates a sink writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out, last: 0 }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressSink for PlainProgress<W> {
    fn start(&mut self, label: &str, total: u32) {
        self.last = 0;
        let _ = writeln!(self.out, "Processing {label} ({total} rows)...");
    }

    fn notify(&mut self, done: u32, total: u32) {
        let progress = percent(done, total);
        if progress >= self.last + 10 {
            let _ = writeln!(self.out, "   {progress}% complete ({done}/{total} rows)");
            self.last = progress;
        }
    }
}

/// Redraws a single bar line in place.
#[derive(Debug)]
pub struct TerminalProgress<W: Write> {
    out: W,
    label: String,
    drawn: Option<u32>,
}

impl<W: Write> TerminalProgress<W> {
    /// Creates a sink drawing on `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            label: String::new(),
            drawn: None,
        }
    }

    fn draw(&mut self, done: u32, total: u32) -> io::Result<()> {
        let progress = percent(done, total);
        let filled = (progress as usize * BAR_WIDTH) / 100;
        let bar = format!(
            "{} {:>3}%|{}{}| {done}/{total}",
            self.label,
            progress,
            "█".repeat(filled),
            " ".repeat(BAR_WIDTH - filled)
        );
        self.out
            .queue(MoveToColumn(0))?
            .queue(Clear(ClearType::CurrentLine))?
            .queue(Print(bar))?;
        self.out.flush()
    }
}

impl<W: Write> ProgressSink for TerminalProgress<W> {
    fn start(&mut self, label: &str, total: u32) {
        self.label = label.to_string();
        self.drawn = None;
        let _ = self.draw(0, total);
    }

    fn notify(&mut self, done: u32, total: u32) {
        // Redraw only when the visible percentage moves
        let progress = percent(done, total);
        if self.drawn != Some(progress) {
            self.drawn = Some(progress);
            let _ = self.draw(done, total);
        }
    }

    fn finish(&mut self) {
        let _ = self
            .out
            .queue(MoveToColumn(0))
            .and_then(|out| out.queue(Clear(ClearType::CurrentLine)))
            .and_then(|out| out.flush());
    }
}

/// Picks a sink drawing on stdout, away from the log lines on stderr: a
/// redrawing bar on a terminal, plain lines otherwise or when `plain` is
/// requested.
pub fn progress_sink(plain: bool) -> Box<dyn ProgressSink> {
    let stdout = io::stdout();
    let terminal = stdout.is_terminal();
    sink_for(plain, terminal, stdout)
}

fn sink_for<W: Write + 'static>(plain: bool, terminal: bool, out: W) -> Box<dyn ProgressSink> {
    if !plain && terminal {
        Box::new(TerminalProgress::new(out))
    } else {
        Box::new(PlainProgress::new(out))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn plain_progress_reports_every_tenth() {
        let mut sink = PlainProgress::new(Vec::new());
        sink.start("A", 20);
        for row in 1..=20 {
            sink.notify(row, 20);
        }
        sink.finish();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Processing A (20 rows)...");
        assert_eq!(lines[1], "   10% complete (2/20 rows)");
        assert_eq!(lines.last().copied(), Some("   100% complete (20/20 rows)"));
        assert_eq!(lines.len(), 11);
    }

    #[test]
    fn plain_progress_single_row() {
        let mut sink = PlainProgress::new(Vec::new());
        sink.start("B", 1);
        sink.notify(1, 1);
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.ends_with("   100% complete (1/1 rows)\n"));
    }

    #[test]
    fn terminal_progress_draws_bar() {
        let mut buffer = Vec::new();
        {
            let mut sink = TerminalProgress::new(&mut buffer);
            sink.start("C", 4);
            sink.notify(2, 4);
            sink.finish();
        }
        let out = String::from_utf8_lossy(&buffer);
        assert!(out.contains("C  50%|"));
        assert!(out.contains("| 2/4"));
    }

    #[test]
    fn percent_handles_zero_total() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(1, 3), 33);
    }

    #[derive(Clone, Default)]
    struct Shared(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn bar_is_cleared_before_the_next_line() {
        let out = Shared::default();
        let mut sink = sink_for(false, true, out.clone());
        sink.start("D", 2);
        sink.notify(1, 2);
        sink.notify(2, 2);
        sink.finish();

        let drawn = String::from_utf8_lossy(&out.0.borrow()).into_owned();
        assert!(drawn.contains("D 100%|"));
        // Nothing is left on the line for whatever is written next
        assert!(drawn.ends_with("\u{1b}[1G\u{1b}[2K"), "{drawn:?}");
        assert!(!drawn.contains('\n'));
    }

    #[test]
    fn plain_lines_when_not_a_terminal() {
        let out = Shared::default();
        let mut sink = sink_for(false, false, out.clone());
        sink.start("E", 1);
        sink.notify(1, 1);
        assert_eq!(
            String::from_utf8_lossy(&out.0.borrow()),
            "Processing E (1 rows)...\n   100% complete (1/1 rows)\n"
        );
    }
}
