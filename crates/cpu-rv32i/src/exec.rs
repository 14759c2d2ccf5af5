//! Executor (C5): applies a decoded instruction's handler contract.

use crate::bus::Bus;
use crate::decode::{Decoded, Handler};
use crate::state::State;

/// What happened after applying one instruction's handler.
///
/// `next_pc`/register/CSR effects are already committed into `state` by
/// the time this is returned; only the halt signal remains for the
/// caller (the [`crate::sim::Simulator`]) to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Ordinary instruction; next PC is `decoded.next_pc`.
    Continue,
    /// `ebreak`: halt with the given return code (register `a0`).
    Ebreak { code: u32 },
}

/// Register index of `a0`, the ABI return-value/argument register.
const A0: u8 = 10;

fn sign_extend_byte(v: u32) -> u32 {
    (v as u8 as i8 as i32) as u32
}

fn sign_extend_half(v: u32) -> u32 {
    (v as u16 as i16 as i32) as u32
}

/// Apply `decoded`'s handler: mutate `state` and `bus`, and set
/// `decoded.next_pc` to whatever PC should be committed next.
pub fn execute(decoded: &mut Decoded, state: &mut State, bus: &mut Bus) -> ExecOutcome {
    let pc = decoded.pc;
    let fall_through = decoded.fall_through;
    let rs1 = decoded.rs1_val;
    let rs2 = decoded.rs2_val;
    let imm = decoded.imm;
    let imm_u = imm as u32;

    match decoded.handler {
        Handler::Lui => state.regs.write(decoded.rd, imm_u),
        Handler::Auipc => state.regs.write(decoded.rd, pc.wrapping_add(imm_u)),

        Handler::Jal => {
            state.regs.write(decoded.rd, fall_through);
            decoded.next_pc = pc.wrapping_add(imm_u);
        }
        Handler::Jalr => {
            state.regs.write(decoded.rd, fall_through);
            decoded.next_pc = rs1.wrapping_add(imm_u) & !1;
        }

        Handler::Beq if rs1 == rs2 => decoded.next_pc = pc.wrapping_add(imm_u),
        Handler::Bne if rs1 != rs2 => decoded.next_pc = pc.wrapping_add(imm_u),
        Handler::Blt if (rs1 as i32) < (rs2 as i32) => decoded.next_pc = pc.wrapping_add(imm_u),
        Handler::Bge if (rs1 as i32) >= (rs2 as i32) => decoded.next_pc = pc.wrapping_add(imm_u),
        Handler::Bltu if rs1 < rs2 => decoded.next_pc = pc.wrapping_add(imm_u),
        Handler::Bgeu if rs1 >= rs2 => decoded.next_pc = pc.wrapping_add(imm_u),
        Handler::Beq
        | Handler::Bne
        | Handler::Blt
        | Handler::Bge
        | Handler::Bltu
        | Handler::Bgeu => {} // predicate false: fall through

        Handler::Lb => {
            let addr = rs1.wrapping_add(imm_u);
            let v = bus.read(addr, 1);
            state.regs.write(decoded.rd, sign_extend_byte(v));
        }
        Handler::Lh => {
            let addr = rs1.wrapping_add(imm_u);
            let v = bus.read(addr, 2);
            state.regs.write(decoded.rd, sign_extend_half(v));
        }
        Handler::Lw => {
            let addr = rs1.wrapping_add(imm_u);
            let v = bus.read(addr, 4);
            state.regs.write(decoded.rd, v);
        }
        Handler::Lbu => {
            let addr = rs1.wrapping_add(imm_u);
            let v = bus.read(addr, 1);
            state.regs.write(decoded.rd, v);
        }
        Handler::Lhu => {
            let addr = rs1.wrapping_add(imm_u);
            let v = bus.read(addr, 2);
            state.regs.write(decoded.rd, v);
        }

        Handler::Sb => bus.write(rs1.wrapping_add(imm_u), 1, rs2),
        Handler::Sh => bus.write(rs1.wrapping_add(imm_u), 2, rs2),
        Handler::Sw => bus.write(rs1.wrapping_add(imm_u), 4, rs2),

        Handler::Addi => state.regs.write(decoded.rd, rs1.wrapping_add(imm_u)),
        Handler::Slti => state
            .regs
            .write(decoded.rd, u32::from((rs1 as i32) < imm)),
        Handler::Sltiu => state.regs.write(decoded.rd, u32::from(rs1 < imm_u)),
        Handler::Xori => state.regs.write(decoded.rd, rs1 ^ imm_u),
        Handler::Ori => state.regs.write(decoded.rd, rs1 | imm_u),
        Handler::Andi => state.regs.write(decoded.rd, rs1 & imm_u),
        Handler::Slli => {
            let shamt = imm_u & 0x1f;
            state.regs.write(decoded.rd, rs1 << shamt);
        }
        Handler::Srli => {
            let shamt = imm_u & 0x1f;
            state.regs.write(decoded.rd, rs1 >> shamt);
        }
        Handler::Srai => {
            let shamt = imm_u & 0x1f;
            state.regs.write(decoded.rd, ((rs1 as i32) >> shamt) as u32);
        }

        Handler::Add => state.regs.write(decoded.rd, rs1.wrapping_add(rs2)),
        Handler::Sub => state.regs.write(decoded.rd, rs1.wrapping_sub(rs2)),
        Handler::Sll => state.regs.write(decoded.rd, rs1 << (rs2 & 0x1f)),
        Handler::Slt => state
            .regs
            .write(decoded.rd, u32::from((rs1 as i32) < (rs2 as i32))),
        Handler::Sltu => state.regs.write(decoded.rd, u32::from(rs1 < rs2)),
        Handler::Xor => state.regs.write(decoded.rd, rs1 ^ rs2),
        Handler::Srl => state.regs.write(decoded.rd, rs1 >> (rs2 & 0x1f)),
        Handler::Sra => state
            .regs
            .write(decoded.rd, ((rs1 as i32) >> (rs2 & 0x1f)) as u32),
        Handler::Or => state.regs.write(decoded.rd, rs1 | rs2),
        Handler::And => state.regs.write(decoded.rd, rs1 & rs2),

        Handler::Fence => {}

        Handler::Ecall => {
            state.csr.mepc = pc;
            decoded.next_pc = state.csr.mtvec;
        }
        Handler::Mret => decoded.next_pc = state.csr.mepc,
        Handler::Ebreak => {
            return ExecOutcome::Ebreak {
                code: state.regs.read(A0),
            };
        }
    }

    ExecOutcome::Continue
}
