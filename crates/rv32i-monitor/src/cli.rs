//! Configuration & CLI (C14): declarative flag parsing into an
//! immutable [`Config`], replacing a hand-rolled `argv` loop.

use std::path::PathBuf;

use clap::Parser;
use cpu_rv32i::memory::Memory;

/// Default memory size backing the guest image, in bytes.
const DEFAULT_MEM_SIZE: usize = 128 * 1024 * 1024;

#[derive(Debug, Parser)]
#[command(name = "rv32i-monitor", about = "RV32I instruction-set simulator and debugger")]
struct Args {
    /// Path to the raw binary image loaded at the guest base address.
    image: PathBuf,

    /// Run to completion without prompting.
    #[arg(short, long)]
    batch: bool,

    /// Redirect the raw per-instruction trace log to this file.
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Path to a peer-ISS shared library for differential testing.
    #[arg(short, long)]
    diff: Option<PathBuf>,

    /// Numeric port passed to the peer's `init`; meaning is opaque here.
    #[arg(short, long, default_value_t = 0)]
    port: u16,

    /// ELF image to load function symbols from.
    #[arg(short, long)]
    elf: Option<PathBuf>,

    /// Guest physical base address.
    #[arg(long, default_value_t = Memory::DEFAULT_BASE, value_parser = parse_hex_or_dec)]
    base: u32,

    /// Guest physical memory size in bytes.
    #[arg(long, default_value_t = DEFAULT_MEM_SIZE)]
    mem_size: usize,
}

fn parse_hex_or_dec(s: &str) -> Result<u32, std::num::ParseIntError> {
    s.strip_prefix("0x")
        .map_or_else(|| s.parse::<u32>(), |hex| u32::from_str_radix(hex, 16))
}

/// Validated, immutable configuration built once at startup and shared
/// by reference with every subsystem that needs it.
#[derive(Debug, Clone)]
pub struct Config {
    pub image: PathBuf,
    pub elf: Option<PathBuf>,
    pub peer_lib: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub port: u16,
    pub batch: bool,
    pub base: u32,
    pub mem_size: usize,
}

impl Config {
    /// Parse `std::env::args()`. Parse failures (missing positional
    /// image path, unparsable numeric flag) print usage and exit
    /// nonzero, matching clap's default behavior for `--help` and bad
    /// invocations alike.
    #[must_use]
    pub fn parse() -> Self {
        let args = Args::parse();
        Self {
            image: args.image,
            elf: args.elf,
            peer_lib: args.diff,
            log_file: args.log,
            port: args.port,
            batch: args.batch,
            base: args.base,
            mem_size: args.mem_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::Parser;

    #[test]
    fn parses_required_image_and_defaults() {
        let args = Args::parse_from(["rv32i-monitor", "image.bin"]);
        assert_eq!(args.image.to_str(), Some("image.bin"));
        assert!(!args.batch);
        assert_eq!(args.port, 0);
    }

    #[test]
    fn hex_base_address_is_accepted() {
        let args = Args::parse_from(["rv32i-monitor", "image.bin", "--base", "0x80000000"]);
        assert_eq!(args.base, 0x8000_0000);
    }

    #[test]
    fn missing_image_path_is_a_parse_error() {
        assert!(Args::try_parse_from(["rv32i-monitor"]).is_err());
    }
}
