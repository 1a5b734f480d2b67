//! The live set of pooled connections and its exclusion lock

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct State<C> {
    conns: Vec<Arc<C>>,
    /// Exclusive checkouts neither returned nor dropped yet
    checked_out: usize,
    closed: bool,
}

/// Ordered collection of live connections.
///
/// Every structural access goes through one mutex held only for the
/// operation itself. The round-robin cursor is a separate atomic; the index
/// it yields is reduced modulo the length observed inside the same critical
/// section that reads the element, so it is always in range.
///
/// Exclusive checkouts are counted under the same lock, so pooled and
/// checked out are always read consistently for status reporting.
///
/// Once closed the registry refuses additions, which lets a reconciliation
/// pass or a returning caller racing with shutdown find out that its
/// connection must be closed rather than pooled.
pub(crate) struct Registry<C> {
    state: Mutex<State<C>>,
    cursor: AtomicUsize,
}

impl<C> Registry<C> {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                conns: Vec::with_capacity(capacity),
                checked_out: 0,
                closed: false,
            }),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn size(&self) -> usize {
        self.state.lock().conns.len()
    }

    /// Pooled and checked out, read together
    pub fn counts(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.conns.len(), state.checked_out)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Append to the end. Hands the connection back if the registry is closed.
    pub fn add(&self, conn: Arc<C>) -> Result<(), Arc<C>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(conn);
        }
        state.conns.push(conn);
        Ok(())
    }

    /// Remove the element at `index`, shifting the remainder left.
    pub fn remove_at(&self, index: usize) -> Option<Arc<C>> {
        let mut state = self.state.lock();
        if index < state.conns.len() {
            Some(state.conns.remove(index))
        } else {
            None
        }
    }

    /// Remove `conn` by identity. Returns false if it is no longer pooled.
    pub fn remove(&self, conn: &Arc<C>) -> bool {
        let mut state = self.state.lock();
        match state.conns.iter().position(|c| Arc::ptr_eq(c, conn)) {
            Some(index) => {
                state.conns.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> Vec<Arc<C>> {
        self.state.lock().conns.clone()
    }

    /// Round-robin read that leaves the connection in place.
    pub fn next_shared(&self) -> Option<Arc<C>> {
        let state = self.state.lock();
        let index = self.next_index(state.conns.len())?;
        Some(Arc::clone(&state.conns[index]))
    }

    /// Round-robin read that removes the connection and counts it as
    /// checked out.
    pub fn take_next(&self) -> Option<Arc<C>> {
        let mut state = self.state.lock();
        let index = self.next_index(state.conns.len())?;
        state.checked_out += 1;
        Some(state.conns.remove(index))
    }

    /// Re-append a checked out connection. Hands it back if closed.
    pub fn restore(&self, conn: Arc<C>) -> Result<(), Arc<C>> {
        let mut state = self.state.lock();
        state.checked_out = state.checked_out.saturating_sub(1);
        if state.closed {
            return Err(conn);
        }
        state.conns.push(conn);
        Ok(())
    }

    /// A checked out connection will never come back
    pub fn forget_checkout(&self) {
        let mut state = self.state.lock();
        state.checked_out = state.checked_out.saturating_sub(1);
    }

    /// Refuse further additions. Returns true only for the first call.
    pub fn mark_closed(&self) -> bool {
        let mut state = self.state.lock();
        !std::mem::replace(&mut state.closed, true)
    }

    fn next_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        // fetch_add wraps on overflow
        let n = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(n % len)
    }
}
