//! ELF symbol loader (C7): function symbols for PC-to-name resolution.

use elf::ElfBytes;
use elf::abi::STT_FUNC;
use elf::endian::AnyEndian;

use crate::error::ElfError;

/// One function symbol: name, start address, byte size.
#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub name: String,
    pub value: u32,
    pub size: u32,
}

/// Immutable function-symbol table, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct SymbolMap {
    symbols: Vec<FunctionSymbol>,
}

impl SymbolMap {
    /// Parse `bytes` as a 32-bit little-endian ELF image and keep every
    /// `STT_FUNC` symbol from its symbol table (which, by the ELF
    /// convention this loader relies on, is linked to `.strtab`).
    pub fn load(bytes: &[u8]) -> Result<Self, ElfError> {
        let file = ElfBytes::<AnyEndian>::minimal_parse(bytes)?;
        let Some((symtab, strtab)) = file.symbol_table()? else {
            return Err(ElfError::NoSymtab);
        };

        let mut symbols = Vec::new();
        for sym in symtab.iter() {
            if sym.st_symtype() != STT_FUNC {
                continue;
            }
            let name = strtab.get(sym.st_name as usize)?.to_owned();
            symbols.push(FunctionSymbol {
                name,
                value: sym.st_value as u32,
                size: sym.st_size as u32,
            });
        }

        Ok(Self { symbols })
    }

    #[must_use]
    pub fn symbols(&self) -> &[FunctionSymbol] {
        &self.symbols
    }

    /// Linear scan for the function symbol whose `[value, value+size)`
    /// range contains `pc`. Acceptable because symbol counts here are
    /// small (test images, not production binaries).
    #[must_use]
    pub fn pc_to_name(&self, pc: u32) -> Option<&str> {
        self.symbols
            .iter()
            .find(|s| pc.wrapping_sub(s.value) < s.size)
            .map(|s| s.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::SymbolMap;

    #[test]
    fn empty_map_resolves_nothing() {
        let map = SymbolMap::default();
        assert_eq!(map.pc_to_name(0x1000), None);
    }

    #[test]
    fn malformed_image_is_an_error() {
        let err = SymbolMap::load(&[0u8; 4]);
        assert!(err.is_err());
    }
}
