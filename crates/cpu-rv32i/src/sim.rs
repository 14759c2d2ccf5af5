//! Orchestration: ties C1-C9 together into one step/commit loop and owns
//! the process run state the shell (C10) and monitor (C12) observe.

use std::io::Write;

use tracing::{error, info, trace, warn};

use crate::bus::Bus;
use crate::decode::decode;
use crate::elf::SymbolMap;
use crate::error::SimError;
use crate::exec::{ExecOutcome, execute};
use crate::peer::{ArchState, Peer, diff};
use crate::ringbuf::RingBuffer;
use crate::state::State;
use crate::watchpoint::WatchpointPool;

#[cfg(feature = "ftrace")]
use crate::ftrace;

/// Process-wide run state, transitioned only by `step` and the shell's
/// `q` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Stopped,
    Ended,
    Aborted,
    Quit,
}

/// Owns every piece of process-wide state and drives one committed
/// instruction per [`Simulator::step`] call.
pub struct Simulator {
    pub bus: Bus,
    pub state: State,
    pub ring: RingBuffer,
    pub watchpoints: WatchpointPool,
    pub symbols: Option<SymbolMap>,
    pub peer: Option<Box<dyn Peer>>,
    pub run_state: RunState,
    pub halt_pc: u32,
    pub halt_code: u32,
    /// Append-only `pc:XXXXXXXX:disassembly` sink for `--log FILE`,
    /// independent of the ring buffer's bounded post-mortem window.
    pub trace_log: Option<Box<dyn Write>>,
    committed: u64,
}

impl Simulator {
    #[must_use]
    pub fn new(bus: Bus, entry_pc: u32) -> Self {
        Self {
            bus,
            state: State::new(entry_pc),
            ring: RingBuffer::new(RingBuffer::DEFAULT_CAPACITY),
            watchpoints: WatchpointPool::new(),
            symbols: None,
            peer: None,
            run_state: RunState::Running,
            halt_pc: 0,
            halt_code: 0,
            trace_log: None,
            committed: 0,
        }
    }

    #[must_use]
    pub const fn committed(&self) -> u64 {
        self.committed
    }

    fn disasm(decoded: &crate::decode::Decoded) -> String {
        format!(
            "{:?} rd=x{} rs1=x{} rs2=x{} imm={}",
            decoded.handler, decoded.rd, decoded.rs1, decoded.rs2, decoded.imm
        )
    }

    /// Step exactly one instruction if `run_state == Running`; a no-op
    /// otherwise. Fetch/decode errors are fatal and transition to
    /// `Aborted`; anything else follows the executor's commit contract.
    pub fn step(&mut self) -> Result<(), SimError> {
        if self.run_state != RunState::Running {
            return Ok(());
        }

        let pc = self.state.pc;
        let word = self.bus.read(pc, 4);
        // The fetch itself should never touch MMIO, but if the image
        // jumps into the reserved window that still raised a skip-ref
        // unit above; undo it so a stray fetch doesn't desync the peer.
        self.bus.consume_skip_ref();

        let mut decoded = match decode(&self.state, word, pc) {
            Ok(d) => d,
            Err(e) => {
                error!(pc, word, "invalid encoding; aborting");
                self.run_state = RunState::Aborted;
                self.halt_pc = pc;
                return Err(e.into());
            }
        };

        trace!(pc, word, "decoded {:?}", decoded.handler);
        let outcome = execute(&mut decoded, &mut self.state, &mut self.bus);
        self.state.pc = decoded.next_pc;
        self.committed += 1;
        let disasm = Self::disasm(&decoded);
        if let Some(log) = self.trace_log.as_mut() {
            let _ = writeln!(log, "pc:{pc:08x}:{disasm}");
        }
        self.ring.push(pc, disasm);

        #[cfg(feature = "ftrace")]
        if let Some(event) = ftrace::classify(&decoded, decoded.next_pc) {
            info!("{}", ftrace::render(event, self.symbols.as_ref()));
        }

        if let Some(peer) = self.peer.as_mut() {
            if self.bus.consume_skip_ref() {
                let mut snapshot = ArchState::from(&self.state);
                peer.regcpy(&mut snapshot, true);
            } else {
                peer.exec(1);
                let mut peer_state = ArchState::from(&self.state);
                peer.regcpy(&mut peer_state, false);
                if let Err(e) = diff(&self.state, &peer_state) {
                    error!(error = %e, "differential mismatch");
                    self.run_state = RunState::Aborted;
                    self.halt_pc = self.state.pc;
                    return Err(e.into());
                }
            }
        }

        match outcome {
            ExecOutcome::Ebreak { code } => {
                info!(pc, code, "ebreak; halting");
                self.run_state = RunState::Ended;
                self.halt_pc = pc;
                self.halt_code = code;
                return Ok(());
            }
            ExecOutcome::Continue => {}
        }

        let changes = self.watchpoints.scan(&self.state, self.bus.memory());
        if !changes.is_empty() {
            for c in &changes {
                warn!(id = c.id, old = c.old_value, new = c.new_value, "watchpoint changed");
            }
            self.run_state = RunState::Stopped;
        }

        Ok(())
    }

    /// Step until `run_state` leaves `Running`.
    pub fn run_to_halt(&mut self) -> Result<(), SimError> {
        while self.run_state == RunState::Running {
            self.step()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{RunState, Simulator};
    use crate::bus::Bus;
    use crate::memory::Memory;

    fn image(words: &[u32]) -> Memory {
        let mut mem = Memory::new(0x8000_0000, 64);
        let mut bytes = Vec::new();
        for w in words {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        mem.load_image(&bytes);
        mem
    }

    #[test]
    fn addi_chain_ends_with_ebreak_and_zero_code() {
        let mem = image(&[
            0x0050_0093, // addi x1, x0, 5
            0x0030_8113, // addi x2, x1, 3
            0x0020_81b3, // add x3, x1, x2
            0x0010_0073, // ebreak
        ]);
        let mut sim = Simulator::new(Bus::new(mem), 0x8000_0000);
        sim.run_to_halt().unwrap();

        assert_eq!(sim.run_state, RunState::Ended);
        assert_eq!(sim.halt_code, 0);
        assert_eq!(sim.state.regs.read(1), 5);
        assert_eq!(sim.state.regs.read(2), 8);
        assert_eq!(sim.state.regs.read(3), 13);
        assert_eq!(sim.committed(), 4);
    }

    #[test]
    fn invalid_encoding_aborts() {
        let mem = image(&[0x0000_007f]);
        let mut sim = Simulator::new(Bus::new(mem), 0x8000_0000);
        assert!(sim.step().is_err());
        assert_eq!(sim.run_state, RunState::Aborted);
        assert_eq!(sim.halt_pc, 0x8000_0000);
    }

    #[test]
    fn watchpoint_change_stops_the_run() {
        let mem = image(&[
            0x0050_0093, // addi x1, x0, 5
            0x0010_0073, // ebreak (not reached)
        ]);
        let mut sim = Simulator::new(Bus::new(mem), 0x8000_0000);
        sim.watchpoints.add("$x1", &sim.state, sim.bus.memory()).unwrap();
        sim.step().unwrap();
        assert_eq!(sim.run_state, RunState::Stopped);
    }

    #[derive(Clone, Default)]
    struct SharedBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn trace_log_gets_one_line_per_committed_instruction() {
        let mem = image(&[
            0x0050_0093, // addi x1, x0, 5
            0x0010_0073, // ebreak
        ]);
        let mut sim = Simulator::new(Bus::new(mem), 0x8000_0000);
        let sink = SharedBuf::default();
        sim.trace_log = Some(Box::new(sink.clone()));
        sim.run_to_halt().unwrap();

        let logged = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        assert_eq!(logged.lines().count(), 2);
        assert!(logged.lines().next().unwrap().starts_with("pc:80000000:"));
    }
}
