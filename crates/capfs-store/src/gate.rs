//! Per-file reader/writer admission gate.
//!
//! Admission never waits: a conflicting request is refused on the spot and
//! the caller reports the file as busy.

use parking_lot::Mutex;

/// Counters tracked by a gate.
///
/// Invariant: `writer` implies `readers == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateState {
    /// Sessions currently reading
    pub readers: usize,
    /// Whether a session is currently writing
    pub writer: bool,
}

impl GateState {
    /// Returns true if nobody holds the gate.
    pub fn is_idle(&self) -> bool {
        self.readers == 0 && !self.writer
    }
}

/// Admission gate guarding one file's content.
///
/// Each check-and-set happens under a single acquisition of the gate's own
/// lock, so two sessions can never both pass a check that only one of them
/// should pass.
#[derive(Debug, Default)]
pub struct Gate {
    state: Mutex<GateState>,
}

impl Gate {
    /// Creates an idle gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a reader unless a writer is active.
    pub fn try_enter_read(&self) -> bool {
        let mut state = self.state.lock();
        if state.writer {
            return false;
        }
        state.readers += 1;
        true
    }

    /// Admits a writer only if the gate is idle.
    pub fn try_enter_write(&self) -> bool {
        let mut state = self.state.lock();
        if !state.is_idle() {
            return false;
        }
        state.writer = true;
        true
    }

    /// Releases one reader admission.
    pub fn exit_read(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.readers > 0, "exit_read without a reader");
        state.readers = state.readers.saturating_sub(1);
    }

    /// Releases the writer admission.
    pub fn exit_write(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.writer, "exit_write without a writer");
        state.writer = false;
    }

    /// Returns a copy of the current counters.
    pub fn state(&self) -> GateState {
        *self.state.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_readers_share() {
        let gate = Gate::new();
        assert!(gate.try_enter_read());
        assert!(gate.try_enter_read());
        assert_eq!(gate.state().readers, 2);

        // Writer refused while readers are in.
        assert!(!gate.try_enter_write());

        gate.exit_read();
        assert!(!gate.try_enter_write());
        gate.exit_read();
        assert!(gate.try_enter_write());
    }

    #[test]
    fn test_writer_excludes_everyone() {
        let gate = Gate::new();
        assert!(gate.try_enter_write());
        assert!(!gate.try_enter_write());
        assert!(!gate.try_enter_read());

        // Failed attempts leave no trace.
        assert_eq!(
            gate.state(),
            GateState {
                readers: 0,
                writer: true
            }
        );

        gate.exit_write();
        assert!(gate.state().is_idle());
        assert!(gate.try_enter_read());
    }

    #[test]
    fn test_invariant_under_contention() {
        let gate = Arc::new(Gate::new());
        let violated = Arc::new(AtomicBool::new(false));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let gate = gate.clone();
                let violated = violated.clone();
                std::thread::spawn(move || {
                    for _ in 0..5_000 {
                        if i % 2 == 0 {
                            if gate.try_enter_write() {
                                let s = gate.state();
                                if s.readers != 0 || !s.writer {
                                    violated.store(true, Ordering::SeqCst);
                                }
                                gate.exit_write();
                            }
                        } else if gate.try_enter_read() {
                            let s = gate.state();
                            if s.writer || s.readers == 0 {
                                violated.store(true, Ordering::SeqCst);
                            }
                            gate.exit_read();
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(!violated.load(Ordering::SeqCst));
        assert!(gate.state().is_idle());
    }
}
