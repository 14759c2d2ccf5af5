//! Differential driver (C11): a [`cpu_rv32i::peer::Peer`] backed by a
//! dynamically loaded peer-ISS shared library, decoupling the lockstep
//! logic in `sim` from how the peer is actually reached.

use cpu_rv32i::peer::{ArchState, Peer};
use libloading::{Library, Symbol};
use thiserror::Error;

type InitFn = unsafe extern "C" fn(i32);
type MemcpyFn = unsafe extern "C" fn(u32, *mut u8, usize, i32);
type RegcpyFn = unsafe extern "C" fn(*mut ArchState, i32);
type ExecFn = unsafe extern "C" fn(u64);

#[derive(Debug, Error)]
pub enum PeerLoadError {
    #[error("failed to load peer library: {0}")]
    Load(#[from] libloading::Error),
}

/// Loads the four peer-ABI symbols (§6: `init`, `memcpy`, `regcpy`,
/// `exec`) from a shared library and keeps the library alive for as
/// long as this handle lives.
pub struct DylibPeer {
    _library: Library,
    init: InitFn,
    memcpy: MemcpyFn,
    regcpy: RegcpyFn,
    exec: ExecFn,
}

impl DylibPeer {
    /// # Safety
    /// Loading an arbitrary shared library and calling into it is
    /// inherently unsafe: the caller vouches that the library at `path`
    /// exports `init`/`memcpy`/`regcpy`/`exec` with the peer ABI's exact
    /// signatures and struct layout.
    pub unsafe fn load(path: &std::path::Path) -> Result<Self, PeerLoadError> {
        unsafe {
            let library = Library::new(path)?;
            let init: Symbol<InitFn> = library.get(b"init")?;
            let memcpy: Symbol<MemcpyFn> = library.get(b"memcpy")?;
            let regcpy: Symbol<RegcpyFn> = library.get(b"regcpy")?;
            let exec: Symbol<ExecFn> = library.get(b"exec")?;

            let init = *init;
            let memcpy = *memcpy;
            let regcpy = *regcpy;
            let exec = *exec;

            Ok(Self {
                _library: library,
                init,
                memcpy,
                regcpy,
                exec,
            })
        }
    }
}

impl Peer for DylibPeer {
    fn init(&mut self, port: u16) {
        unsafe { (self.init)(i32::from(port)) }
    }

    fn memcpy(&mut self, guest_addr: u32, buf: &mut [u8], to_ref: bool) {
        unsafe { (self.memcpy)(guest_addr, buf.as_mut_ptr(), buf.len(), i32::from(to_ref)) }
    }

    fn regcpy(&mut self, state: &mut ArchState, to_ref: bool) {
        unsafe { (self.regcpy)(state, i32::from(to_ref)) }
    }

    fn exec(&mut self, n: u32) {
        unsafe { (self.exec)(u64::from(n)) }
    }
}
