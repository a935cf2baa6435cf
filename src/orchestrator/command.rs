//! Commands and the sources that produce them.
//!
//! # Key map
//!
//! | key | command                              |
//! |-----|--------------------------------------|
//! | `g` | toggle grayscale                     |
//! | `n` | toggle negative                      |
//! | `b` | toggle blur                          |
//! | `s` | toggle gradient x/y + magnitude      |
//! | `q` | toggle quantize                      |
//! | `c` | toggle cartoonize (and its upstream) |
//! | `f` | report telemetry                     |
//! | upper case of a toggle key | pause/resume that feature |
//!
//! Whitespace is ignored. Any other key shuts the pipeline down.

use super::catalog::TaskKind;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::collections::VecDeque;
use std::io::BufRead;
use std::thread;
use std::time::Duration;

/// User-facing toggle target: one task or a fixed group of tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Grayscale,
    Negative,
    Blur,
    /// Gradient x, gradient y and magnitude, as one unit
    Gradient,
    Quantize,
    /// Cartoonize on top of quantize and the gradient group
    Cartoonize,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::Grayscale,
        Feature::Negative,
        Feature::Blur,
        Feature::Gradient,
        Feature::Quantize,
        Feature::Cartoonize,
    ];

    pub fn key(self) -> char {
        match self {
            Feature::Grayscale => 'g',
            Feature::Negative => 'n',
            Feature::Blur => 'b',
            Feature::Gradient => 's',
            Feature::Quantize => 'q',
            Feature::Cartoonize => 'c',
        }
    }

    pub fn from_key(key: char) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// The task whose presence means the feature is on
    pub fn primary(self) -> TaskKind {
        match self {
            Feature::Grayscale => TaskKind::Grayscale,
            Feature::Negative => TaskKind::Negative,
            Feature::Blur => TaskKind::Blur,
            Feature::Gradient => TaskKind::Magnitude,
            Feature::Quantize => TaskKind::Quantize,
            Feature::Cartoonize => TaskKind::Cartoonize,
        }
    }

    /// Tasks removed together when the feature is switched off,
    /// dependents first
    pub fn members(self) -> &'static [TaskKind] {
        match self {
            Feature::Grayscale => &[TaskKind::Grayscale],
            Feature::Negative => &[TaskKind::Negative],
            Feature::Blur => &[TaskKind::Blur],
            Feature::Gradient => &[TaskKind::Magnitude, TaskKind::GradientX, TaskKind::GradientY],
            Feature::Quantize => &[TaskKind::Quantize],
            Feature::Cartoonize => &[TaskKind::Cartoonize],
        }
    }
}

/// One discrete instruction for the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start the feature if it is off, stop it if it is on
    Toggle(Feature),
    /// Pause or resume every live task of the feature
    TogglePause(Feature),
    QueryTelemetry,
    Shutdown,
    /// Unmapped key; treated as a shutdown request
    Unknown(char),
}

impl Command {
    /// Map a key press. Whitespace maps to nothing.
    pub fn from_key(key: char) -> Option<Self> {
        if key.is_whitespace() {
            return None;
        }
        if key == 'f' {
            return Some(Command::QueryTelemetry);
        }
        if let Some(feature) = Feature::from_key(key) {
            return Some(Command::Toggle(feature));
        }
        if key.is_ascii_uppercase() {
            if let Some(feature) = Feature::from_key(key.to_ascii_lowercase()) {
                return Some(Command::TogglePause(feature));
            }
        }
        Some(Command::Unknown(key))
    }

    /// Parse every key in `keys`, skipping whitespace
    pub fn parse_keys(keys: &str) -> Vec<Self> {
        keys.chars().filter_map(Self::from_key).collect()
    }
}

/// Yields at most one command per orchestrator iteration
pub trait CommandSource {
    /// Next pending command, or `None` if nothing is waiting
    fn poll(&mut self) -> Option<Command>;
}

/// Commands typed on standard input (or any line reader).
///
/// A background thread reads lines and forwards each key. End of input
/// becomes [`Command::Shutdown`]. The reader thread is detached, since a
/// blocking read cannot be interrupted; it ends with the process.
pub struct StdinCommands {
    rx: Receiver<Command>,
    poll_timeout: Duration,
}

impl StdinCommands {
    /// Read from the process's stdin
    pub fn spawn(poll_timeout: Duration) -> std::io::Result<Self> {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()), poll_timeout)
    }

    pub fn from_reader<R>(reader: R, poll_timeout: Duration) -> std::io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = bounded(64);
        thread::Builder::new()
            .name("stdin-commands".to_string())
            .spawn(move || {
                for line in reader.lines() {
                    let Ok(line) = line else { break };
                    for command in Command::parse_keys(&line) {
                        if tx.send(command).is_err() {
                            return;
                        }
                    }
                }
                tracing::debug!("Command input closed");
            })?;
        Ok(Self { rx, poll_timeout })
    }
}

impl CommandSource for StdinCommands {
    fn poll(&mut self) -> Option<Command> {
        match self.rx.recv_timeout(self.poll_timeout) {
            Ok(command) => Some(command),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Command::Shutdown),
        }
    }
}

/// Fixed list of commands, one per poll
#[derive(Debug, Default)]
pub struct ScriptedCommands {
    queue: VecDeque<Command>,
    pace: Duration,
}

impl ScriptedCommands {
    pub fn new(commands: impl IntoIterator<Item = Command>) -> Self {
        Self {
            queue: commands.into_iter().collect(),
            pace: Duration::ZERO,
        }
    }

    pub fn from_keys(keys: &str) -> Self {
        Self::new(Command::parse_keys(keys))
    }

    /// Sleep this long on every poll, like waiting for a key
    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn push(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl CommandSource for ScriptedCommands {
    fn poll(&mut self) -> Option<Command> {
        if !self.pace.is_zero() {
            thread::sleep(self.pace);
        }
        self.queue.pop_front()
    }
}
