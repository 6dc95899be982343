//! Command events consumed by the controller's dispatch loop.

use std::fmt;

/// A parameterless command submitted to the controller.
///
/// The set is closed: the dispatch loop matches on all five variants and
/// there is no "unknown event" path. Events are `Copy` and travel through
/// the queue by value.
///
/// # Examples
///
/// ```
/// use convoy_core::Event;
///
/// let ev = Event::Restart;
/// assert_eq!(ev.name(), "restart");
/// assert_eq!(Event::ALL[ev.index()], ev);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Start (or resume) the simulation.
    Start,
    /// Pause the Model and View. Their threads stay alive.
    Stop,
    /// Reset the Model and View and run from the beginning.
    Restart,
    /// End the simulation: join all threads and leave the main loop.
    Close,
    /// Run in looping mode: the Model restarts itself on completion.
    Loop,
}

impl Event {
    /// Every event, in `index()` order.
    pub const ALL: [Event; 5] = [
        Event::Start,
        Event::Stop,
        Event::Restart,
        Event::Close,
        Event::Loop,
    ];

    /// Number of distinct events.
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index in `0..Event::COUNT`, used for per-kind counters.
    pub fn index(self) -> usize {
        match self {
            Self::Start => 0,
            Self::Stop => 1,
            Self::Restart => 2,
            Self::Close => 3,
            Self::Loop => 4,
        }
    }

    /// Lower-case name, stable across releases.
    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Close => "close",
            Self::Loop => "loop",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
