//! End-to-end scenarios driving the public `Simulator` API headlessly,
//! each image assembled by hand as pre-encoded RV32I words.

use cpu_rv32i::bus::Bus;
use cpu_rv32i::expr;
use cpu_rv32i::memory::Memory;
use cpu_rv32i::sim::{RunState, Simulator};

const BASE: u32 = 0x8000_0000;

fn simulator(words: &[u32]) -> Simulator {
    let mut memory = Memory::new(BASE, 256);
    let mut bytes = Vec::new();
    for w in words {
        bytes.extend_from_slice(&w.to_le_bytes());
    }
    memory.load_image(&bytes);
    Simulator::new(Bus::new(memory), BASE)
}

#[test]
fn addi_chain() {
    let mut sim = simulator(&[
        0x0050_0093, // addi x1, x0, 5
        0x0030_8113, // addi x2, x1, 3
        0x0020_81b3, // add x3, x1, x2
        0x0010_0073, // ebreak
    ]);
    sim.run_to_halt().unwrap();

    assert_eq!(sim.run_state, RunState::Ended);
    assert_eq!(sim.halt_code, 0);
    assert_eq!(sim.state.regs.read(1), 5);
    assert_eq!(sim.state.regs.read(2), 8);
    assert_eq!(sim.state.regs.read(3), 13);
}

#[test]
fn branch_skips_one_instruction() {
    let mut sim = simulator(&[
        0x0010_0093, // addi x1, x0, 1
        0x0000_0463, // beq x0, x0, +8
        0x0020_0113, // addi x2, x0, 2  (skipped)
        0x0030_0193, // addi x3, x0, 3
        0x0010_0073, // ebreak
    ]);
    sim.run_to_halt().unwrap();

    assert_eq!(sim.state.regs.read(1), 1);
    assert_eq!(sim.state.regs.read(2), 0);
    assert_eq!(sim.state.regs.read(3), 3);
}

/// Memory base 0 here, not `BASE`: the store/load target address 0
/// directly (`rs1` is `x0`), which only lands in range against a
/// zero-based image, matching how `expr.rs`'s own unit tests address
/// memory.
#[test]
fn store_then_load_forwards_value() {
    let mut memory = Memory::new(0, 64);
    let words = [
        0x07f0_0293u32, // addi x5, x0, 0x7f
        0x0050_2023, // sw x5, 0(x0)
        0x0000_2303, // lw x6, 0(x0)
        0x0010_0073, // ebreak
    ];
    let mut bytes = Vec::new();
    for w in words {
        bytes.extend_from_slice(&w.to_le_bytes());
    }
    memory.load_image(&bytes);
    let mut sim = Simulator::new(Bus::new(memory), 0);
    sim.run_to_halt().unwrap();

    assert_eq!(sim.state.regs.read(6), 0x7f);
}

/// Memory base 0 here too, so `*0x20` dereferences an address actually
/// backed by this image instead of falling outside a `BASE`-relative map.
#[test]
fn expression_scenario() {
    let mut memory = Memory::new(0, 64);
    memory.load_image(&0x0010_0073u32.to_le_bytes()); // ebreak, never reached
    let mut sim = Simulator::new(Bus::new(memory), 0);
    sim.state.regs.write(1, 10);
    sim.state.regs.write(2, 3);
    sim.bus.memory_mut().write(0x20, 4, 0xdead_beef);

    assert_eq!(
        expr::evaluate("($x1 + $x2) * 2", &sim.state, sim.bus.memory()).unwrap(),
        26
    );
    assert_eq!(
        expr::evaluate("*0x20", &sim.state, sim.bus.memory()).unwrap(),
        0xdead_beef
    );
    assert_eq!(
        expr::evaluate("$x1 == 10 && $x2 != 0", &sim.state, sim.bus.memory()).unwrap(),
        1
    );
}

#[test]
fn watchpoint_halts_on_change() {
    let mut sim = simulator(&[
        0x02a0_0093, // addi x1, x0, 42
        0x0010_0073, // ebreak
    ]);
    sim.watchpoints.add("$x1", &sim.state, sim.bus.memory()).unwrap();

    sim.step().unwrap();

    assert_eq!(sim.run_state, RunState::Stopped);
    let views = sim.watchpoints.display();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].last_value, 42);
}
