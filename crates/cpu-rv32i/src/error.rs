//! Error taxonomy for the simulator core.
//!
//! Each subsystem gets its own variant set; `SimError` is the union a
//! caller outside this crate needs to match on. Fatal vs. recoverable is
//! a property of *where* an error is handled, not of its type here: the
//! executor treats [`DecodeError`] and a full watchpoint pool as fatal,
//! while the shell treats an unknown register or watchpoint id as
//! recoverable and keeps the REPL going.

use thiserror::Error;

/// The instruction word did not match any entry in the decode table.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid encoding 0x{word:08x} at pc=0x{pc:08x}")]
pub struct DecodeError {
    pub pc: u32,
    pub word: u32,
}

/// Errors raised while tokenizing or evaluating a watch/REPL expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("unmatched input at byte {0} of expression")]
    Tokenize(usize),
    #[error("'{0}' is not a register")]
    UnknownRegister(String),
    #[error("empty expression")]
    Empty,
}

/// Errors raised by the watchpoint pool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WatchpointError {
    #[error("watchpoint pool exhausted (32 watchpoints already active)")]
    PoolExhausted,
    #[error("no watchpoint with id {0}")]
    UnknownId(u8),
    #[error("cannot add watchpoint: {0}")]
    InvalidExpression(#[from] ExprError),
}

/// Errors raised while loading symbols from an ELF image.
#[derive(Debug, Error)]
pub enum ElfError {
    #[error("malformed ELF image: {0}")]
    Parse(#[from] elf::ParseError),
    #[error("ELF image has no symbol table")]
    NoSymtab,
}

/// A differential-test comparison against the peer ISS failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiffError {
    #[error("peer register x{reg} mismatch at pc=0x{pc:08x}: local=0x{local:08x} peer=0x{peer:08x}")]
    RegisterMismatch {
        pc: u32,
        reg: u8,
        local: u32,
        peer: u32,
    },
    #[error("peer csr {name} mismatch at pc=0x{pc:08x}: local=0x{local:08x} peer=0x{peer:08x}")]
    CsrMismatch {
        pc: u32,
        name: &'static str,
        local: u32,
        peer: u32,
    },
    #[error("peer pc mismatch: local=0x{local:08x} peer=0x{peer:08x}")]
    PcMismatch { local: u32, peer: u32 },
}

/// Union of every error this crate's public API can return.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error(transparent)]
    Watchpoint(#[from] WatchpointError),
    #[error(transparent)]
    Elf(#[from] ElfError),
    #[error(transparent)]
    Diff(#[from] DiffError),
}
