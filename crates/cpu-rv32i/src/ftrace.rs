//! Optional call/return tracer (C5, gated by the `ftrace` feature).
//!
//! A JAL/JALR is treated as a call when its link register is `ra` or
//! `t0` and its source register is not that same register; as a return
//! when the source is `ra`/`t0` and the destination is neither. Anything
//! else involving those registers is neither and is not traced.

use crate::decode::{Decoded, Handler};
use crate::elf::SymbolMap;

const RA: u8 = 1;
const T0: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtraceEvent {
    Call { from: u32, to: u32 },
    Return { from: u32, to: u32 },
}

fn is_link_reg(r: u8) -> bool {
    r == RA || r == T0
}

/// Classify a committed jump as a call, a return, or neither. `to` is
/// the jump's resolved target (`decoded.next_pc` after execution).
#[must_use]
pub fn classify(decoded: &Decoded, to: u32) -> Option<FtraceEvent> {
    if !matches!(decoded.handler, Handler::Jal | Handler::Jalr) {
        return None;
    }
    let from = decoded.pc;
    if is_link_reg(decoded.rd) && !is_link_reg(decoded.rs1) {
        return Some(FtraceEvent::Call { from, to });
    }
    if is_link_reg(decoded.rs1) && !is_link_reg(decoded.rd) {
        return Some(FtraceEvent::Return { from, to });
    }
    None
}

/// Render one trace line the way the design's `ftrace` stream formats
/// it: `cur pc :X call Y go :NAME` for calls, `... ret Y ...` for
/// returns. `symbols` resolves the destination's enclosing function.
#[must_use]
pub fn render(event: FtraceEvent, symbols: Option<&SymbolMap>) -> String {
    let (from, to, verb) = match event {
        FtraceEvent::Call { from, to } => (from, to, "call"),
        FtraceEvent::Return { from, to } => (from, to, "ret"),
    };
    let name = symbols
        .and_then(|s| s.pc_to_name(to))
        .unwrap_or("???");
    format!("cur pc :0x{from:08x} {verb} 0x{to:08x} go :{name}")
}

#[cfg(test)]
mod tests {
    use super::{FtraceEvent, classify, render};
    use crate::decode::{Decoded, Handler};

    fn jalr(rd: u8, rs1: u8) -> Decoded {
        Decoded {
            word: 0,
            pc: 0x1000,
            fall_through: 0x1004,
            next_pc: 0x2000,
            handler: Handler::Jalr,
            rd,
            rs1,
            rs1_val: 0,
            rs2: 0,
            rs2_val: 0,
            imm: 0,
        }
    }

    #[test]
    fn call_when_link_is_destination_only() {
        let decoded = jalr(1, 2); // rd=ra, rs1=not a link reg
        assert_eq!(
            classify(&decoded, 0x2000),
            Some(FtraceEvent::Call { from: 0x1000, to: 0x2000 })
        );
    }

    #[test]
    fn return_when_link_is_source_only() {
        let decoded = jalr(3, 1); // rd=not a link reg, rs1=ra
        assert_eq!(
            classify(&decoded, 0x2000),
            Some(FtraceEvent::Return { from: 0x1000, to: 0x2000 })
        );
    }

    #[test]
    fn neither_when_both_or_neither_are_link_regs() {
        let decoded = jalr(2, 3);
        assert_eq!(classify(&decoded, 0x2000), None);
    }

    #[test]
    fn render_falls_back_to_placeholder_without_symbols() {
        let line = render(FtraceEvent::Call { from: 0x1000, to: 0x2000 }, None);
        assert_eq!(line, "cur pc :0x00001000 call 0x00002000 go :???");
    }
}
