//! Terminal spinners for deployment workflows.
//!
//! On a terminal every resource gets one line that is redrawn in place. When
//! the output is not a terminal (CI logs, pipes) each state change is printed
//! as its own line instead.

use std::collections::HashMap;
use std::io::{self, Stderr, Write};

use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use crossterm::tty::IsTty;
use omni_workflow::{ProgressDisplay, SpinnerOutcome};
use tracing::debug;

const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    Spinning,
    Done(SpinnerOutcome),
}

#[derive(Debug)]
struct SpinnerLine {
    text: String,
    state: LineState,
}

/// Spinner display writing to a terminal or plain log stream.
#[derive(Debug)]
pub struct TerminalDisplay<W: Write> {
    out: W,
    interactive: bool,
    lines: Vec<SpinnerLine>,
    index: HashMap<String, usize>,
    frame: usize,
    drawn: u16,
}

impl TerminalDisplay<Stderr> {
    /// Display on stderr, animated only if stderr is a terminal.
    #[must_use]
    pub fn stderr() -> Self {
        let stderr = io::stderr();
        let interactive = stderr.is_tty();
        Self::new(stderr, interactive)
    }
}

impl<W: Write> TerminalDisplay<W> {
    /// Creates a display over any writer.
    pub fn new(out: W, interactive: bool) -> Self {
        Self {
            out,
            interactive,
            lines: Vec::new(),
            index: HashMap::new(),
            frame: 0,
            drawn: 0,
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn redraw(&mut self) -> io::Result<()> {
        if self.drawn > 0 {
            queue!(self.out, MoveUp(self.drawn))?;
        }

        let frame = FRAMES[self.frame % FRAMES.len()];
        for line in &self.lines {
            queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
            match line.state {
                LineState::Spinning => {
                    queue!(
                        self.out,
                        SetForegroundColor(Color::Cyan),
                        Print(frame),
                        ResetColor
                    )?;
                }
                LineState::Done(outcome) => {
                    let (color, symbol) = outcome_style(outcome);
                    queue!(self.out, SetForegroundColor(color), Print(symbol), ResetColor)?;
                }
            }
            queue!(self.out, Print(" "), Print(&line.text), Print("\n"))?;
        }

        self.drawn = u16::try_from(self.lines.len()).unwrap_or(u16::MAX);
        self.out.flush()
    }

    /// Prints a line above the spinner block, then redraws the block below it.
    fn print_above(&mut self, text: &str) -> io::Result<()> {
        if self.drawn > 0 {
            queue!(self.out, MoveUp(self.drawn))?;
        }
        queue!(
            self.out,
            MoveToColumn(0),
            Clear(ClearType::FromCursorDown),
            SetForegroundColor(Color::Yellow),
            Print("!"),
            ResetColor,
            Print(" "),
            Print(text),
            Print("\n")
        )?;
        self.drawn = 0;
        self.redraw()
    }

    fn log(&mut self, symbol: &str, text: &str) -> io::Result<()> {
        writeln!(self.out, "{symbol} {text}")?;
        self.out.flush()
    }

    fn report(result: io::Result<()>) {
        if let Err(e) = result {
            debug!(error = %e, "Failed to draw progress");
        }
    }
}

const fn outcome_style(outcome: SpinnerOutcome) -> (Color, &'static str) {
    match outcome {
        SpinnerOutcome::Success => (Color::Green, "✓"),
        SpinnerOutcome::Error => (Color::Red, "✗"),
    }
}

impl<W: Write> ProgressDisplay for TerminalDisplay<W> {
    fn create(&mut self, key: &str, text: &str) {
        self.index.insert(key.to_string(), self.lines.len());
        self.lines.push(SpinnerLine {
            text: text.to_string(),
            state: LineState::Spinning,
        });

        let result = if self.interactive {
            self.redraw()
        } else {
            self.log("○", text)
        };
        Self::report(result);
    }

    fn update(&mut self, key: &str, text: &str) {
        let Some(&i) = self.index.get(key) else {
            return;
        };
        if self.lines[i].text == text {
            return;
        }
        self.lines[i].text = text.to_string();

        let result = if self.interactive {
            self.redraw()
        } else {
            self.log("◐", text)
        };
        Self::report(result);
    }

    fn resolve(&mut self, key: &str, outcome: SpinnerOutcome, text: &str) {
        let Some(&i) = self.index.get(key) else {
            return;
        };
        self.lines[i].text = text.to_string();
        self.lines[i].state = LineState::Done(outcome);

        let result = if self.interactive {
            self.redraw()
        } else {
            self.log(outcome_style(outcome).1, text)
        };
        Self::report(result);
    }

    fn tick(&mut self) {
        if !self.interactive
            || !self
                .lines
                .iter()
                .any(|line| line.state == LineState::Spinning)
        {
            return;
        }
        self.frame = self.frame.wrapping_add(1);
        Self::report(self.redraw());
    }

    fn note(&mut self, text: &str) {
        let result = if self.interactive {
            self.print_above(text)
        } else {
            self.log("!", text)
        };
        Self::report(result);
    }
}
