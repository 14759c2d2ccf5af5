//! Instruction ring buffer (C6): fixed-capacity FIFO trace for post-mortem
//! dumps on abort.

/// One committed instruction's trace record.
#[derive(Debug, Clone)]
pub struct Entry {
    pub pc: u32,
    pub disasm: String,
}

/// Fixed-capacity FIFO. Enqueuing past capacity evicts the oldest entry.
pub struct RingBuffer {
    entries: Vec<Option<Entry>>,
    head: usize,
    tail: usize,
    len: usize,
}

impl RingBuffer {
    /// Suggested capacity from the design (§3): the last 16 instructions.
    pub const DEFAULT_CAPACITY: usize = 16;

    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be nonzero");
        Self {
            entries: vec![None; capacity],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, pc: u32, disasm: String) {
        let cap = self.entries.len();
        if self.len == cap {
            // Full: advancing tail would collide with head, so drop the
            // oldest entry first.
            self.head = (self.head + 1) % cap;
            self.len -= 1;
        }
        self.entries[self.tail] = Some(Entry { pc, disasm });
        self.tail = (self.tail + 1) % cap;
        self.len += 1;
    }

    /// Iterate entries oldest-first, head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        let cap = self.entries.len();
        (0..self.len).map(move |i| {
            self.entries[(self.head + i) % cap]
                .as_ref()
                .expect("slot within [head, head+len) is always occupied")
        })
    }

    /// Render the trace the way the executor dumps it on abort: one
    /// `pc:XXXXXXXX:disassembly` line per entry, oldest first.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in self.iter() {
            out.push_str(&format!("pc:{:08x}:{}\n", entry.pc, entry.disasm));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::RingBuffer;

    #[test]
    fn fifo_eviction_after_capacity_plus_one() {
        let mut rb = RingBuffer::new(3);
        for i in 0..4u32 {
            rb.push(i, format!("insn {i}"));
        }
        let pcs: Vec<u32> = rb.iter().map(|e| e.pc).collect();
        assert_eq!(pcs, vec![1, 2, 3]);
        assert_eq!(rb.len(), 3);
    }

    #[test]
    fn count_is_min_of_total_and_capacity() {
        let mut rb = RingBuffer::new(16);
        for i in 0..5u32 {
            rb.push(i, String::new());
        }
        assert_eq!(rb.len(), 5);
    }

    #[test]
    fn newest_entry_is_last_in_iteration_order() {
        let mut rb = RingBuffer::new(4);
        rb.push(1, "a".into());
        rb.push(2, "b".into());
        let last = rb.iter().last().unwrap();
        assert_eq!(last.pc, 2);
    }
}
