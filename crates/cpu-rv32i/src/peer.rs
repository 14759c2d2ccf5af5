//! Differential driver (C11): the `Peer` trait and the lockstep/skip-ref
//! logic, decoupled from however a concrete peer is loaded.
//!
//! [`crate::sim::Simulator`] drives this against any `Peer` impl — a
//! dynamically loaded shared library in `rv32i-monitor`, or an in-process
//! stub in tests — so the lockstep logic itself never touches `libloading`.

use crate::error::DiffError;
use crate::state::State;

/// Wire-compatible snapshot of architectural state, in the exact field
/// order the peer ABI's `regcpy` struct uses: 32 registers, PC, then the
/// four CSRs in order `mstatus, mtvec, mepc, mcause`. `repr(C)` because
/// this layout crosses the FFI boundary in `regcpy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ArchState {
    pub regs: [u32; 32],
    pub pc: u32,
    pub mstatus: u32,
    pub mtvec: u32,
    pub mepc: u32,
    pub mcause: u32,
}

impl From<&State> for ArchState {
    fn from(state: &State) -> Self {
        Self {
            regs: *state.regs.as_array(),
            pc: state.pc,
            mstatus: state.csr.mstatus,
            mtvec: state.csr.mtvec,
            mepc: state.csr.mepc,
            mcause: state.csr.mcause,
        }
    }
}

/// A reference ISS reachable through the four-function peer ABI (§6):
/// `init`, `memcpy`, `regcpy`, `exec`.
pub trait Peer {
    /// One-time setup; `port`'s meaning is opaque to this side.
    fn init(&mut self, port: u16);
    /// Bulk-copy `len` bytes between `guest_addr` and `buf`. `to_ref`
    /// selects direction: `true` copies `buf` into the peer, `false`
    /// copies out of the peer into `buf`.
    fn memcpy(&mut self, guest_addr: u32, buf: &mut [u8], to_ref: bool);
    /// Full architectural-state transfer, same direction convention.
    fn regcpy(&mut self, state: &mut ArchState, to_ref: bool);
    /// Step the peer by exactly `n` instructions.
    fn exec(&mut self, n: u32);
}

/// Compare `local` against the peer's state after a non-skipped step.
/// Returns the first mismatch found, checked in register order then PC
/// then CSRs, matching how the design's side-by-side dump is built up.
pub fn diff(local: &State, peer: &ArchState) -> Result<(), DiffError> {
    let local_regs = local.regs.as_array();
    for (i, (&l, &p)) in local_regs.iter().zip(peer.regs.iter()).enumerate() {
        if l != p {
            return Err(DiffError::RegisterMismatch {
                pc: local.pc,
                reg: i as u8,
                local: l,
                peer: p,
            });
        }
    }
    if local.pc != peer.pc {
        return Err(DiffError::PcMismatch {
            local: local.pc,
            peer: peer.pc,
        });
    }
    let csrs: [(&str, u32, u32); 4] = [
        ("mstatus", local.csr.mstatus, peer.mstatus),
        ("mtvec", local.csr.mtvec, peer.mtvec),
        ("mepc", local.csr.mepc, peer.mepc),
        ("mcause", local.csr.mcause, peer.mcause),
    ];
    for (name, l, p) in csrs {
        if l != p {
            return Err(DiffError::CsrMismatch {
                pc: local.pc,
                name,
                local: l,
                peer: p,
            });
        }
    }
    Ok(())
}
