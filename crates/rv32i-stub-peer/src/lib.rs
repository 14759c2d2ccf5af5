//! Reference-peer implementation of the four-function ABI (§6): a
//! second, independent [`cpu_rv32i::sim::Simulator`] instance reachable
//! through C linkage, so `rv32i-monitor`'s `--diff` path and the
//! integration tests are exercisable without a hardware co-simulation
//! build. Not itself the hardware reference.

use std::sync::{Mutex, OnceLock};

use cpu_rv32i::bus::Bus;
use cpu_rv32i::memory::Memory;
use cpu_rv32i::peer::ArchState;
use cpu_rv32i::sim::Simulator;

/// Guest memory size backing the stub. Generous enough for the seed
/// scenarios and integration tests that load this library.
const STUB_MEM_SIZE: usize = 16 * 1024 * 1024;

fn instance() -> &'static Mutex<Simulator> {
    static INSTANCE: OnceLock<Mutex<Simulator>> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        let memory = Memory::new(Memory::DEFAULT_BASE, STUB_MEM_SIZE);
        Mutex::new(Simulator::new(Bus::new(memory), Memory::DEFAULT_BASE))
    })
}

fn apply_state(sim: &mut Simulator, snapshot: &ArchState) {
    for (i, &v) in snapshot.regs.iter().enumerate() {
        sim.state.regs.write(i as u8, v);
    }
    sim.state.pc = snapshot.pc;
    sim.state.csr.mstatus = snapshot.mstatus;
    sim.state.csr.mtvec = snapshot.mtvec;
    sim.state.csr.mepc = snapshot.mepc;
    sim.state.csr.mcause = snapshot.mcause;
}

/// One-time setup. `port`'s meaning is opaque on this side; the stub
/// ignores it.
///
/// # Safety
/// Must be called with a valid `port`; there is no pointer dereference
/// here, but the function is `extern "C"` and part of the peer ABI.
#[unsafe(no_mangle)]
pub extern "C" fn init(_port: i32) {
    let _ = instance();
}

/// Bulk byte transfer between `guest_addr` and `host_buf`. `to_ref != 0`
/// copies host bytes into the stub's memory; otherwise copies out.
///
/// # Safety
/// `host_buf` must be valid for `n` bytes in the direction implied by
/// `to_ref` (readable when `to_ref != 0`, writable otherwise).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn memcpy(guest_addr: u32, host_buf: *mut u8, n: usize, to_ref: i32) {
    let mut sim = instance().lock().expect("stub peer mutex poisoned");
    let memory = sim.bus.memory_mut();
    if to_ref != 0 {
        let src = unsafe { std::slice::from_raw_parts(host_buf, n) };
        for (i, &byte) in src.iter().enumerate() {
            memory.write(guest_addr + i as u32, 1, u32::from(byte));
        }
    } else {
        let dst = unsafe { std::slice::from_raw_parts_mut(host_buf, n) };
        for (i, slot) in dst.iter_mut().enumerate() {
            *slot = memory.read(guest_addr + i as u32, 1) as u8;
        }
    }
}

/// Full architectural-state transfer. `to_ref != 0` pushes `state` into
/// the stub; otherwise the stub's current state is written into `state`.
///
/// # Safety
/// `state` must point to a valid, properly aligned `ArchState`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn regcpy(state: *mut ArchState, to_ref: i32) {
    let mut sim = instance().lock().expect("stub peer mutex poisoned");
    if to_ref != 0 {
        let snapshot = unsafe { &*state };
        apply_state(&mut sim, snapshot);
    } else {
        let snapshot = ArchState::from(&sim.state);
        unsafe { *state = snapshot };
    }
}

/// Step the stub by exactly `n` instructions, ignoring fatal errors the
/// same way a hardware co-simulation peer would keep running after a
/// divergence it doesn't itself detect.
#[unsafe(no_mangle)]
pub extern "C" fn exec(n: u64) {
    let mut sim = instance().lock().expect("stub peer mutex poisoned");
    for _ in 0..n {
        if sim.step().is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{exec, init, memcpy, regcpy};
    use cpu_rv32i::peer::ArchState;

    #[test]
    fn memcpy_round_trips_bytes() {
        init(0);
        let mut input = [0xde, 0xad, 0xbe, 0xef];
        unsafe { memcpy(0x8000_0000, input.as_mut_ptr(), input.len(), 1) };
        let mut out = [0u8; 4];
        unsafe { memcpy(0x8000_0000, out.as_mut_ptr(), out.len(), 0) };
        assert_eq!(out, input);
    }

    #[test]
    fn regcpy_round_trips_registers_and_exec_steps_pc() {
        init(0);
        let mut addi = 0x0050_0093u32.to_le_bytes(); // addi x1, x0, 5
        unsafe { memcpy(0x8000_0000, addi.as_mut_ptr(), addi.len(), 1) };

        let mut state = ArchState {
            regs: [0; 32],
            pc: 0x8000_0000,
            mstatus: 0,
            mtvec: 0,
            mepc: 0,
            mcause: 0,
        };
        unsafe { regcpy(&mut state, 1) };
        exec(1);

        let mut out = state;
        unsafe { regcpy(&mut out, 0) };
        assert_eq!(out.regs[1], 5);
        assert_eq!(out.pc, 0x8000_0004);
    }
}
