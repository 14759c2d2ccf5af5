//! Watchpoint engine (C9): fixed pool of named expressions, scanned for
//! value changes after every committed instruction.

use crate::error::WatchpointError;
use crate::expr;
use crate::memory::Memory;
use crate::state::State;

const POOL_SIZE: usize = 32;

struct Record {
    expr: String,
    last_value: u32,
    next: Option<u8>,
    in_use: bool,
}

/// Pool of 32 watchpoint slots split between a free list and an active
/// list, both threaded through [`Record::next`] rather than heap
/// pointers: the pool index doubles as the slot's stable id.
pub struct WatchpointPool {
    records: Vec<Record>,
    free: Option<u8>,
    active: Option<u8>,
}

/// One line of `info w` output or a `scan` change report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchpointView {
    pub id: u8,
    pub expr: String,
    pub last_value: u32,
}

/// A watchpoint whose re-evaluated value differs from `last_value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub id: u8,
    pub expr: String,
    pub old_value: u32,
    pub new_value: u32,
}

impl Default for WatchpointPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchpointPool {
    #[must_use]
    pub fn new() -> Self {
        let mut records = Vec::with_capacity(POOL_SIZE);
        for i in 0..POOL_SIZE {
            records.push(Record {
                expr: String::new(),
                last_value: 0,
                next: if i + 1 < POOL_SIZE { Some(i as u8 + 1) } else { None },
                in_use: false,
            });
        }
        Self {
            records,
            free: Some(0),
            active: None,
        }
    }

    /// Evaluate `text` once to seed `last_value`, then move a slot from
    /// free to active. Errors if the pool is exhausted or the
    /// expression itself fails to evaluate.
    pub fn add(
        &mut self,
        text: &str,
        state: &State,
        memory: &Memory,
    ) -> Result<u8, WatchpointError> {
        let id = self.free.ok_or(WatchpointError::PoolExhausted)?;
        let value = expr::evaluate(text, state, memory)?;

        self.free = self.records[id as usize].next;

        self.records[id as usize] = Record {
            expr: text.to_string(),
            last_value: value,
            next: self.active,
            in_use: true,
        };
        self.active = Some(id);
        Ok(id)
    }

    /// Unlink `id` from the active list and return it to free. Unlike
    /// an unguarded scan, an id that isn't currently active is a
    /// recoverable error naming the id, not a panic.
    pub fn delete(&mut self, id: u8) -> Result<(), WatchpointError> {
        let mut cur = self.active;
        let mut prev: Option<u8> = None;

        while let Some(c) = cur {
            if c == id && self.records[c as usize].in_use {
                let next = self.records[c as usize].next;
                match prev {
                    Some(p) => self.records[p as usize].next = next,
                    None => self.active = next,
                }
                self.records[c as usize] = Record {
                    expr: String::new(),
                    last_value: 0,
                    next: self.free,
                    in_use: false,
                };
                self.free = Some(c);
                return Ok(());
            }
            prev = cur;
            cur = self.records[c as usize].next;
        }

        Err(WatchpointError::UnknownId(id))
    }

    /// Walk the active list oldest-insert-last (head is the most
    /// recently added, mirroring how `add` pushes onto the front).
    #[must_use]
    pub fn display(&self) -> Vec<WatchpointView> {
        let mut out = Vec::new();
        let mut cur = self.active;
        while let Some(id) = cur {
            let rec = &self.records[id as usize];
            out.push(WatchpointView {
                id,
                expr: rec.expr.clone(),
                last_value: rec.last_value,
            });
            cur = rec.next;
        }
        out
    }

    /// Re-evaluate every active expression. Always refreshes
    /// `last_value`; returns the subset whose value changed.
    #[must_use]
    pub fn scan(&mut self, state: &State, memory: &Memory) -> Vec<Change> {
        let mut changes = Vec::new();
        let mut cur = self.active;
        while let Some(id) = cur {
            let idx = id as usize;
            let next = self.records[idx].next;
            if let Ok(new_value) = expr::evaluate(&self.records[idx].expr, state, memory) {
                let old_value = self.records[idx].last_value;
                if new_value != old_value {
                    changes.push(Change {
                        id,
                        expr: self.records[idx].expr.clone(),
                        old_value,
                        new_value,
                    });
                }
                self.records[idx].last_value = new_value;
            }
            cur = next;
        }
        changes
    }

    /// Active-plus-free count, for the pool-size invariant.
    #[must_use]
    pub fn len_active(&self) -> usize {
        self.display().len()
    }
}

#[cfg(test)]
mod tests {
    use super::WatchpointPool;
    use crate::memory::Memory;
    use crate::state::State;

    fn fixture() -> (State, Memory) {
        let state = State::new(0);
        let mem = Memory::new(0, 16);
        (state, mem)
    }

    #[test]
    fn add_seeds_last_value_and_scan_detects_change() {
        let (mut state, mem) = fixture();
        let mut pool = WatchpointPool::new();
        state.regs.write(1, 10);
        let id = pool.add("$x1", &state, &mem).unwrap();

        state.regs.write(1, 11);
        let changes = pool.scan(&state, &mem);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, id);
        assert_eq!(changes[0].old_value, 10);
        assert_eq!(changes[0].new_value, 11);
    }

    #[test]
    fn delete_unknown_id_is_recoverable_not_fatal() {
        let mut pool = WatchpointPool::new();
        assert!(pool.delete(5).is_err());
    }

    #[test]
    fn pool_add_delete_preserves_total_count() {
        let (state, mem) = fixture();
        let mut pool = WatchpointPool::new();
        let id = pool.add("1 + 1", &state, &mem).unwrap();
        assert_eq!(pool.len_active(), 1);
        pool.delete(id).unwrap();
        assert_eq!(pool.len_active(), 0);
    }

    #[test]
    fn bad_expression_reports_its_own_cause_not_pool_exhaustion() {
        let (state, mem) = fixture();
        let mut pool = WatchpointPool::new();
        let err = pool.add("$bogus", &state, &mem).unwrap_err();
        match err {
            super::WatchpointError::InvalidExpression(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn pool_exhaustion_is_an_error() {
        let (state, mem) = fixture();
        let mut pool = WatchpointPool::new();
        for _ in 0..32 {
            pool.add("1", &state, &mem).unwrap();
        }
        assert!(pool.add("1", &state, &mem).is_err());
    }
}
