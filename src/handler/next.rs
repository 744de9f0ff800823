use super::{Handler, Handlers};
use log::warn;
use smallvec::SmallVec;
use std::sync::Arc;

/// Position of a chain inside its handler list.
///
/// Variants are ordered, so `Start < At(0) < At(1) < ... < Exhausted`.
/// A chain only ever moves forward through this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Cursor {
    /// Nothing has run yet.
    #[default]
    Start,
    /// The handler at this index is the last one dispatched.
    At(usize),
    /// Every handler has been dispatched; further continuations are no-ops.
    Exhausted,
}

impl Cursor {
    /// Moves one step forward inside a list of `len` handlers.
    pub fn advance(self, len: usize) -> Self {
        let next = match self {
            Cursor::Start => 0,
            Cursor::At(i) => i + 1,
            Cursor::Exhausted => return Cursor::Exhausted,
        };

        if next < len {
            Cursor::At(next)
        } else {
            Cursor::Exhausted
        }
    }

    pub fn index(self) -> Option<usize> {
        match self {
            Cursor::At(i) => Some(i),
            _ => None,
        }
    }

    pub fn is_exhausted(self) -> bool {
        matches!(self, Cursor::Exhausted)
    }
}

/// What happens when a handler calls `next()` more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainPolicy {
    /// Every call advances the cursor again and runs whatever is left.
    #[default]
    Reentrant,
    /// Only the first call per handler continues the chain; later calls are ignored.
    Once,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    index: usize,
    continued: bool,
}

/// Handler list plus the cursor that walks it.
///
/// The frame stack mirrors the handlers currently suspended inside `next()`,
/// which is how the caller of a continuation is identified.
pub(crate) struct Chain {
    handlers: Handlers,
    cursor: Cursor,
    policy: ChainPolicy,
    frames: SmallVec<[Frame; 8]>,
    root_continued: bool,
}

impl Default for Chain {
    fn default() -> Self {
        Self {
            handlers: Arc::from(Vec::new()),
            cursor: Cursor::Start,
            policy: ChainPolicy::default(),
            frames: SmallVec::new(),
            root_continued: false,
        }
    }
}

impl Chain {
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_started(&self) -> bool {
        self.cursor != Cursor::Start
    }

    pub fn set_handlers(&mut self, handlers: Handlers) {
        if self.is_started() {
            warn!("handler chain already running, ignoring replacement");
            return;
        }
        self.handlers = handlers;
    }

    pub fn set_policy(&mut self, policy: ChainPolicy) {
        self.policy = policy;
    }

    /// Steps the cursor for a continuation issued by the innermost running
    /// handler (or by the router when nothing runs yet). Returns the handler
    /// to dispatch, if any.
    pub fn advance(&mut self) -> Option<(usize, Arc<dyn Handler>)> {
        let already = match self.frames.last_mut() {
            Some(frame) => std::mem::replace(&mut frame.continued, true),
            None => std::mem::replace(&mut self.root_continued, true),
        };

        if already && self.policy == ChainPolicy::Once {
            warn!(
                "next() called more than once by handler {:?}, ignoring",
                self.frames.last().map(|f| f.index)
            );
            return None;
        }

        self.cursor = self.cursor.advance(self.handlers.len());
        let index = self.cursor.index()?;

        Some((index, Arc::clone(&self.handlers[index])))
    }

    pub fn enter(&mut self, index: usize) {
        self.frames.push(Frame {
            index,
            continued: false,
        });
    }

    pub fn leave(&mut self) {
        self.frames.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;

    fn noop_chain(n: usize, policy: ChainPolicy) -> Chain {
        let handlers: Vec<Arc<dyn Handler>> = (0..n)
            .map(|_| Arc::new(handler_fn(|_ctx| Box::pin(async {}))) as Arc<dyn Handler>)
            .collect();

        let mut chain = Chain::default();
        chain.set_handlers(handlers.into());
        chain.set_policy(policy);
        chain
    }

    #[test]
    fn cursor_walks_forward_and_stays_exhausted() {
        let mut cursor = Cursor::Start;
        let mut seen = Vec::new();

        for _ in 0..5 {
            let next = cursor.advance(3);
            assert!(next > cursor || next.is_exhausted());
            cursor = next;
            seen.push(cursor);
        }

        assert_eq!(
            seen,
            vec![
                Cursor::At(0),
                Cursor::At(1),
                Cursor::At(2),
                Cursor::Exhausted,
                Cursor::Exhausted
            ]
        );
    }

    #[test]
    fn empty_list_is_exhausted_immediately() {
        assert_eq!(Cursor::Start.advance(0), Cursor::Exhausted);
    }

    #[test]
    fn once_policy_rejects_second_continuation_from_same_frame() {
        let mut chain = noop_chain(3, ChainPolicy::Once);

        let (index, _) = chain.advance().unwrap();
        assert_eq!(index, 0);
        chain.enter(index);

        assert_eq!(chain.advance().map(|(i, _)| i), Some(1));
        assert!(chain.advance().is_none());
        assert_eq!(chain.cursor(), Cursor::At(1));
    }

    #[test]
    fn reentrant_policy_keeps_advancing() {
        let mut chain = noop_chain(3, ChainPolicy::Reentrant);

        let (index, _) = chain.advance().unwrap();
        chain.enter(index);

        assert_eq!(chain.advance().map(|(i, _)| i), Some(1));
        assert_eq!(chain.advance().map(|(i, _)| i), Some(2));
        assert!(chain.advance().is_none());
        assert!(chain.cursor().is_exhausted());
    }

    #[test]
    fn handlers_are_frozen_once_started() {
        let mut chain = noop_chain(2, ChainPolicy::Reentrant);
        chain.advance();

        chain.set_handlers(Arc::from(Vec::new()));
        assert_eq!(chain.len(), 2);
    }
}
