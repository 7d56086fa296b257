//! The collaborator interface behind `print`, `read`, `rand` and `time`.
//!
//! The VM never touches the process environment directly; it talks to an
//! [`Io`] implementation supplied by the host. [`StdIo`] wires the
//! builtins to stdin/stdout, the thread-local RNG and the system clock.
//! [`ScriptedIo`] replaces all three with scripted input, captured output
//! and a seeded RNG so runs are reproducible.

use std::collections::VecDeque;
use std::io::BufRead;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};

/// What the VM asks of its host.
pub trait Io {
    /// Writes one rendered value as a line of output.
    fn write(&mut self, line: &str);
    /// Reads one line of input, without its trailing newline.
    /// `None` means the input is exhausted.
    fn read_line(&mut self) -> Option<String>;
    /// Draws one integer uniformly from the full `i64` range.
    fn next_random(&mut self) -> i64;
    /// Seconds since the Unix epoch.
    fn now(&mut self) -> i64;
}

/// The console collaborator: stdin, stdout, `ThreadRng`, system clock.
pub struct StdIo {
    rng: ThreadRng,
}

impl StdIo {
    pub fn new() -> StdIo {
        StdIo { rng: rand::thread_rng() }
    }
}

impl Default for StdIo {
    fn default() -> Self {
        StdIo::new()
    }
}

impl Io for StdIo {
    fn write(&mut self, line: &str) {
        println!("{}", line);
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Some(line)
            }
        }
    }

    fn next_random(&mut self) -> i64 {
        self.rng.gen()
    }

    fn now(&mut self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs() as i64,
            Err(before_epoch) => -(before_epoch.duration().as_secs() as i64),
        }
    }
}

/// A fully scripted collaborator for tests and embedding: queued input
/// lines, captured output, a seeded RNG and a fixed clock.
pub struct ScriptedIo {
    input: VecDeque<String>,
    pub output: Vec<String>,
    rng: StdRng,
    pub clock: i64,
}

impl ScriptedIo {
    pub fn new() -> ScriptedIo {
        ScriptedIo::seeded(0)
    }

    pub fn seeded(seed: u64) -> ScriptedIo {
        ScriptedIo {
            input: VecDeque::new(),
            output: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            clock: 0,
        }
    }

    /// Queues lines to be returned by `read_line`, in order.
    pub fn with_input<I, S>(mut self, lines: I) -> ScriptedIo
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input.extend(lines.into_iter().map(Into::into));
        self
    }
}

impl Default for ScriptedIo {
    fn default() -> Self {
        ScriptedIo::new()
    }
}

impl Io for ScriptedIo {
    fn write(&mut self, line: &str) {
        self.output.push(line.to_string());
    }

    fn read_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }

    fn next_random(&mut self) -> i64 {
        self.rng.gen()
    }

    fn now(&mut self) -> i64 {
        self.clock
    }
}
