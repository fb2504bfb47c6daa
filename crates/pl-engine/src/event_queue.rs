//! Timed command queue on the render path.

use crate::commands::EngineCommand;

/// Commands waiting for their due frame, sorted latest-first so the next
/// due command is popped from the end.
///
/// Storage is reserved up front and never grows: a full queue hands the
/// command back instead of reallocating.
#[derive(Debug)]
pub struct EventQueue {
    events: Vec<(u64, EngineCommand)>,
}

impl EventQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { events: Vec::with_capacity(capacity.max(1)) }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.events.capacity()
    }

    /// Insert a command due at `frame`. Commands due at the same frame keep
    /// their arrival order.
    pub fn push(&mut self, frame: u64, command: EngineCommand) -> Result<(), EngineCommand> {
        if self.events.len() == self.events.capacity() {
            return Err(command);
        }
        let pos = self.events.partition_point(|(due, _)| *due > frame);
        self.events.insert(pos, (frame, command));
        Ok(())
    }

    /// Frame of the next command.
    pub fn peek_frame(&self) -> Option<u64> {
        self.events.last().map(|(due, _)| *due)
    }

    /// Pop the next command if it is due before `end` (exclusive).
    pub fn pop_before(&mut self, end: u64) -> Option<EngineCommand> {
        match self.events.last() {
            Some((due, _)) if *due < end => self.events.pop().map(|(_, command)| command),
            _ => None,
        }
    }

    /// Visit every waiting command, next due first.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut EngineCommand)) {
        for (_, command) in self.events.iter_mut().rev() {
            f(command);
        }
    }

    /// Remove every command matching `pred`, handing each to `removed`.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&EngineCommand) -> bool, mut removed: impl FnMut(EngineCommand)) {
        let mut i = self.events.len();
        while i > 0 {
            i -= 1;
            if pred(&self.events[i].1) {
                let (_, command) = self.events.remove(i);
                removed(command);
            }
        }
    }
}
