//! Main loop / monitor (C12): argument parsing, image loading,
//! subsystem initialization, then handing control to the debugger
//! shell.

mod cli;
mod logging;
mod peer_dylib;
mod shell;

use std::fs;
use std::process::ExitCode;

use cpu_rv32i::bus::Bus;
use cpu_rv32i::elf::SymbolMap;
use cpu_rv32i::memory::Memory;
use cpu_rv32i::peer::{ArchState, Peer as _};
use cpu_rv32i::sim::{RunState, Simulator};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let config = cli::Config::parse();
    logging::init();
    info!(image = %config.image.display(), base = config.base, "starting rv32i-monitor");

    let mut image = match fs::read(&config.image) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(path = %config.image.display(), error = %e, "failed to read image");
            return ExitCode::FAILURE;
        }
    };

    let mut memory = Memory::new(config.base, config.mem_size);
    memory.load_image(&image);

    let mut sim = Simulator::new(Bus::new(memory), config.base);

    if let Some(log_path) = &config.log_file {
        match fs::File::create(log_path) {
            Ok(file) => sim.trace_log = Some(Box::new(file)),
            Err(e) => warn!(path = %log_path.display(), error = %e, "failed to open trace log"),
        }
    }

    if let Some(elf_path) = &config.elf {
        match fs::read(elf_path) {
            Ok(bytes) => match SymbolMap::load(&bytes) {
                Ok(symbols) => sim.symbols = Some(symbols),
                Err(e) => warn!(path = %elf_path.display(), error = %e, "failed to load ELF symbols"),
            },
            Err(e) => warn!(path = %elf_path.display(), error = %e, "failed to read ELF image"),
        }
    }

    if let Some(peer_path) = &config.peer_lib {
        // SAFETY: the operator is trusting this library to implement
        // the documented peer ABI; see `peer_dylib::DylibPeer::load`.
        match unsafe { peer_dylib::DylibPeer::load(peer_path) } {
            Ok(mut peer) => {
                peer.init(config.port);
                // Seed the peer: copy the guest image into it, then push
                // the architectural state it should start lockstepped
                // from, before any instruction is compared.
                peer.memcpy(config.base, &mut image, true);
                let mut snapshot = ArchState::from(&sim.state);
                peer.regcpy(&mut snapshot, true);
                sim.peer = Some(Box::new(peer));
            }
            Err(e) => {
                error!(path = %peer_path.display(), error = %e, "failed to load peer library");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Err(e) = shell::run(&mut sim, config.batch) {
        error!(error = %e, "shell exited with an I/O error");
        return ExitCode::FAILURE;
    }

    match sim.run_state {
        RunState::Ended if sim.halt_code == 0 => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
