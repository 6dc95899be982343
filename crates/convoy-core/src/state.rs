//! Run-state machine for the controller.
//!
//! [`transition()`] is a pure function from `(state, event)` to the next
//! state plus the list of orchestrator [`Effect`]s that the controller must
//! apply, in order. [`RunStateMachine`] wraps it with the `alive` flag that
//! gates the main loop.
//!
//! | From | Event | To | Effects |
//! |------|-------|----|---------|
//! | Stopped | Start | Running | `EnsureStarted`, `Resume` |
//! | Running, Looping | Stop | Stopped | `Pause` (+ `SetLooping(false)` from Looping) |
//! | any open | Restart | Running | `EnsureStarted`, `Reset`, `Resume` (+ `SetLooping(false)` from Looping) |
//! | any open | Loop | Looping | `EnsureStarted`, `SetLooping(true)`, `Resume` |
//! | any open | Close | Closing | `EndThreads` |
//!
//! Every other pair is ignored: the state is unchanged and no effect is
//! produced. `Closing` ignores everything.

use std::fmt;

use smallvec::SmallVec;

use crate::event::Event;

/// Lifecycle phase of the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Workers are not started, or started and paused.
    #[default]
    Stopped,
    /// Model and View are stepping.
    Running,
    /// Like `Running`, and the Model restarts itself when it completes.
    Looping,
    /// Terminal. Threads are joined and the main loop exits.
    Closing,
}

impl RunState {
    /// Whether this state is terminal.
    pub fn is_terminal(self) -> bool {
        self == Self::Closing
    }

    /// Whether Model and View are stepping in this state.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Looping)
    }

    /// Lower-case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Looping => "looping",
            Self::Closing => "closing",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An action on the worker threads requested by a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Spawn the worker threads if they have not been spawned yet.
    EnsureStarted,
    /// Let Model and View step.
    Resume,
    /// Suspend Model and View at their next safe point.
    Pause,
    /// Reset Model and View internal state.
    Reset,
    /// Turn auto-restart-on-completion on or off in the Model.
    SetLooping(bool),
    /// Cancel and join all worker threads.
    EndThreads,
}

/// Effect list for one transition. Never longer than four.
pub type Effects = SmallVec<[Effect; 4]>;

/// Result of feeding one event to the state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// The event that was applied.
    pub event: Event,
    /// State before the event.
    pub from: RunState,
    /// State after the event.
    pub to: RunState,
    /// Effects to apply, in order. Empty when the event was ignored.
    pub effects: Effects,
}

impl Transition {
    /// Whether the event was ignored (no state change, no effects).
    pub fn is_ignored(&self) -> bool {
        self.from == self.to && self.effects.is_empty()
    }
}

/// Compute the transition for `event` in state `from`.
///
/// # Examples
///
/// ```
/// use convoy_core::state::{transition, Effect, RunState};
/// use convoy_core::Event;
///
/// let t = transition(RunState::Stopped, Event::Start);
/// assert_eq!(t.to, RunState::Running);
/// assert_eq!(t.effects.as_slice(), &[Effect::EnsureStarted, Effect::Resume]);
///
/// let t = transition(RunState::Closing, Event::Stop);
/// assert!(t.is_ignored());
/// ```
pub fn transition(from: RunState, event: Event) -> Transition {
    use Effect::*;
    use RunState::*;

    let mut effects = Effects::new();
    let to = match (from, event) {
        (Closing, _) => Closing,

        (Stopped, Event::Start) => {
            effects.extend([EnsureStarted, Resume]);
            Running
        }
        (Running | Looping, Event::Start) => from,

        (Running, Event::Stop) => {
            effects.push(Pause);
            Stopped
        }
        (Looping, Event::Stop) => {
            effects.extend([Pause, SetLooping(false)]);
            Stopped
        }
        (Stopped, Event::Stop) => Stopped,

        (_, Event::Restart) => {
            effects.push(EnsureStarted);
            if from == Looping {
                effects.push(SetLooping(false));
            }
            effects.extend([Reset, Resume]);
            Running
        }

        (Looping, Event::Loop) => Looping,
        (_, Event::Loop) => {
            effects.extend([EnsureStarted, SetLooping(true), Resume]);
            Looping
        }

        (_, Event::Close) => {
            effects.push(EndThreads);
            Closing
        }
    };

    Transition {
        event,
        from,
        to,
        effects,
    }
}

/// Current run state plus the `alive` flag gating the main loop.
///
/// Owned by the controller thread; nothing else writes it.
#[derive(Clone, Debug)]
pub struct RunStateMachine {
    state: RunState,
    alive: bool,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    /// A machine in `Stopped`, alive.
    pub fn new() -> Self {
        Self {
            state: RunState::Stopped,
            alive: true,
        }
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// `false` once `Closing` has been entered.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Apply `event` and return the resulting transition.
    pub fn apply(&mut self, event: Event) -> Transition {
        let t = transition(self.state, event);
        self.state = t.to;
        if t.to.is_terminal() {
            self.alive = false;
        }
        t
    }

    /// Enter `Closing` without an event (aborted run).
    pub fn force_close(&mut self) {
        self.state = RunState::Closing;
        self.alive = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_event() -> impl Strategy<Value = Event> {
        prop::sample::select(Event::ALL.to_vec())
    }

    #[test]
    fn start_from_stopped_runs() {
        let t = transition(RunState::Stopped, Event::Start);
        assert_eq!(t.to, RunState::Running);
        assert_eq!(t.effects.as_slice(), &[Effect::EnsureStarted, Effect::Resume]);
    }

    #[test]
    fn stop_pauses_without_ending_threads() {
        let t = transition(RunState::Running, Event::Stop);
        assert_eq!(t.to, RunState::Stopped);
        assert_eq!(t.effects.as_slice(), &[Effect::Pause]);
        assert!(!t.effects.contains(&Effect::EndThreads));
    }

    #[test]
    fn stop_from_looping_clears_looping() {
        let t = transition(RunState::Looping, Event::Stop);
        assert_eq!(t.to, RunState::Stopped);
        assert!(t.effects.contains(&Effect::SetLooping(false)));
    }

    #[test]
    fn restart_resets_from_every_open_state() {
        for from in [RunState::Stopped, RunState::Running, RunState::Looping] {
            let t = transition(from, Event::Restart);
            assert_eq!(t.to, RunState::Running);
            assert!(t.effects.contains(&Effect::Reset));
            assert_eq!(t.effects[0], Effect::EnsureStarted);
            assert_eq!(*t.effects.last().unwrap(), Effect::Resume);
        }
    }

    #[test]
    fn restart_twice_is_same_as_once() {
        let once = transition(RunState::Running, Event::Restart);
        let twice = transition(once.to, Event::Restart);
        assert_eq!(once.to, twice.to);
        assert_eq!(once.effects, twice.effects);
    }

    #[test]
    fn loop_is_idempotent() {
        let t = transition(RunState::Running, Event::Loop);
        assert_eq!(t.to, RunState::Looping);
        assert!(t.effects.contains(&Effect::SetLooping(true)));
        assert!(transition(RunState::Looping, Event::Loop).is_ignored());
    }

    #[test]
    fn ignored_pairs() {
        assert!(transition(RunState::Stopped, Event::Stop).is_ignored());
        assert!(transition(RunState::Running, Event::Start).is_ignored());
        assert!(transition(RunState::Looping, Event::Start).is_ignored());
        assert!(transition(RunState::Closing, Event::Stop).is_ignored());
    }

    #[test]
    fn machine_goes_dead_on_close() {
        let mut m = RunStateMachine::new();
        assert!(m.is_alive());
        m.apply(Event::Start);
        assert_eq!(m.state(), RunState::Running);
        let t = m.apply(Event::Close);
        assert_eq!(t.effects.as_slice(), &[Effect::EndThreads]);
        assert!(!m.is_alive());
        assert_eq!(m.state(), RunState::Closing);
    }

    #[test]
    fn force_close_is_terminal() {
        let mut m = RunStateMachine::new();
        m.force_close();
        assert!(!m.is_alive());
        assert!(m.apply(Event::Start).is_ignored());
    }

    proptest! {
        #[test]
        fn closing_is_terminal(events in prop::collection::vec(arb_event(), 0..64)) {
            let mut m = RunStateMachine::new();
            m.apply(Event::Close);
            for ev in events {
                let t = m.apply(ev);
                prop_assert!(t.is_ignored());
                prop_assert_eq!(m.state(), RunState::Closing);
            }
        }

        #[test]
        fn close_from_any_open_state_ends_threads(
            prefix in prop::collection::vec(arb_event().prop_filter("open", |e| *e != Event::Close), 0..32),
        ) {
            let mut m = RunStateMachine::new();
            for ev in prefix {
                m.apply(ev);
            }
            let t = m.apply(Event::Close);
            prop_assert_eq!(t.to, RunState::Closing);
            prop_assert_eq!(t.effects.as_slice(), &[Effect::EndThreads]);
            prop_assert!(!m.is_alive());
        }

        #[test]
        fn looping_flag_follows_state(events in prop::collection::vec(arb_event(), 0..64)) {
            // Replaying SetLooping effects must always agree with the state.
            let mut m = RunStateMachine::new();
            let mut looping = false;
            for ev in events {
                let t = m.apply(ev);
                for e in &t.effects {
                    if let Effect::SetLooping(on) = e {
                        looping = *on;
                    }
                }
                if !m.state().is_terminal() {
                    prop_assert_eq!(looping, m.state() == RunState::Looping);
                }
            }
        }

        #[test]
        fn effects_never_exceed_inline_capacity(from in 0usize..4, ev in arb_event()) {
            let from = [RunState::Stopped, RunState::Running, RunState::Looping, RunState::Closing][from];
            let t = transition(from, ev);
            prop_assert!(!t.effects.spilled());
        }
    }
}
