//! Debugger shell (C10): a line-oriented REPL dispatching on a fixed
//! command table, built on `rustyline` for history and editing instead
//! of a bespoke raw-stdin reader.

use std::fs;
use std::io;

use cpu_rv32i::expr;
use cpu_rv32i::sim::{RunState, Simulator};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;

const PROMPT: &str = "(nemu) ";

/// Runs the REPL loop over `sim` until `q` or end-of-input. In batch
/// mode, skips straight to a single `c` instead of prompting.
pub fn run(sim: &mut Simulator, batch: bool) -> io::Result<()> {
    if batch {
        cmd_continue(sim);
        return Ok(());
    }

    let mut editor = DefaultEditor::new().map_err(io::Error::other)?;

    loop {
        if sim.run_state == RunState::Quit {
            break;
        }
        match editor.readline(PROMPT) {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                dispatch(sim, &line);
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => break,
            Err(e) => return Err(io::Error::other(e)),
        }
    }
    Ok(())
}

fn dispatch(sim: &mut Simulator, line: &str) {
    let line = line.trim();
    let Some((cmd, rest)) = line.split_once(char::is_whitespace) else {
        dispatch_no_args(sim, line);
        return;
    };
    let rest = rest.trim();
    match cmd {
        "help" => cmd_help(Some(rest)),
        "si" => cmd_step(sim, rest.parse().unwrap_or(1)),
        "info" => cmd_info(sim, rest),
        "x" => cmd_examine(sim, rest),
        "expr" => cmd_expr(sim, rest),
        "w" => cmd_watch(sim, rest),
        "d" => cmd_delete(sim, rest),
        "expr_test" => cmd_expr_test(sim, rest),
        _ => println!("unknown command: {cmd}"),
    }
}

fn dispatch_no_args(sim: &mut Simulator, cmd: &str) {
    match cmd {
        "help" => cmd_help(None),
        "c" => cmd_continue(sim),
        "q" => sim.run_state = RunState::Quit,
        "si" => cmd_step(sim, 1),
        "" => {}
        _ => println!("unknown command: {cmd}"),
    }
}

fn cmd_help(topic: Option<&str>) {
    const TABLE: &[(&str, &str)] = &[
        ("help", "help [cmd] - list commands, or describe one"),
        ("c", "c - step until process state leaves running"),
        ("q", "q - quit"),
        ("si", "si [n] - step exactly n instructions (default 1)"),
        ("info", "info r / info w - dump registers / active watchpoints"),
        ("x", "x N ADDR - print N words starting at hex ADDR"),
        ("expr", "expr EXPR - evaluate and print"),
        ("w", "w EXPR - add a watchpoint"),
        ("d", "d ID - delete a watchpoint"),
        ("expr_test", "expr_test FILE - batch-evaluate a test file"),
    ];
    match topic.filter(|t| !t.is_empty()) {
        Some(t) => match TABLE.iter().find(|(name, _)| *name == t) {
            Some((_, desc)) => println!("{desc}"),
            None => println!("no such command: {t}"),
        },
        None => {
            for (_, desc) in TABLE {
                println!("{desc}");
            }
        }
    }
}

fn cmd_continue(sim: &mut Simulator) {
    match sim.run_to_halt() {
        Ok(()) => report_halt(sim),
        Err(e) => println!("{e}"),
    }
}

fn cmd_step(sim: &mut Simulator, n: u32) {
    for _ in 0..n {
        if sim.run_state != RunState::Running {
            break;
        }
        if let Err(e) = sim.step() {
            println!("{e}");
            return;
        }
    }
    report_halt(sim);
}

fn report_halt(sim: &Simulator) {
    match sim.run_state {
        RunState::Running => {}
        RunState::Stopped => println!("stopped (watchpoint changed) at pc=0x{:08x}", sim.state.pc),
        RunState::Ended => info!(code = sim.halt_code, "ended"),
        RunState::Aborted => println!("aborted at pc=0x{:08x}", sim.halt_pc),
        RunState::Quit => {}
    }
}

fn cmd_info(sim: &Simulator, arg: &str) {
    match arg {
        "r" => {
            for (i, name) in cpu_rv32i::state::ABI_NAMES.iter().enumerate() {
                println!("x{i:<2} {name:<4} = 0x{:08x}", sim.state.regs.read(i as u8));
            }
            println!("pc = 0x{:08x}", sim.state.pc);
        }
        "w" => {
            for wp in sim.watchpoints.display() {
                println!("#{}: {} = 0x{:08x}", wp.id, wp.expr, wp.last_value);
            }
        }
        other => println!("unknown info target: {other}"),
    }
}

fn cmd_examine(sim: &Simulator, args: &str) {
    let mut parts = args.split_whitespace();
    let (Some(n), Some(addr)) = (parts.next(), parts.next()) else {
        println!("usage: x N ADDR");
        return;
    };
    let Ok(n) = n.parse::<u32>() else {
        println!("not a count: {n}");
        return;
    };
    let Ok(addr) = u32::from_str_radix(addr.trim_start_matches("0x"), 16) else {
        println!("not a hex address: {addr}");
        return;
    };
    for i in 0..n {
        let a = addr.wrapping_add(i * 4);
        println!("0x{a:08x}: 0x{:08x}", sim.bus.memory().read(a, 4));
    }
}

fn cmd_expr(sim: &Simulator, text: &str) {
    match expr::evaluate(text, &sim.state, sim.bus.memory()) {
        Ok(v) => println!("= 0x{v:08x} ({v})"),
        Err(e) => println!("{e}"),
    }
}

fn cmd_watch(sim: &mut Simulator, text: &str) {
    match sim.watchpoints.add(text, &sim.state, sim.bus.memory()) {
        Ok(id) => println!("watchpoint #{id} added"),
        Err(e) => println!("{e}"),
    }
}

fn cmd_delete(sim: &mut Simulator, arg: &str) {
    let Ok(id) = arg.trim().parse::<u8>() else {
        println!("not a watchpoint id: {arg}");
        return;
    };
    match sim.watchpoints.delete(id) {
        Ok(()) => println!("watchpoint #{id} deleted"),
        Err(e) => println!("{e}"),
    }
}

/// One test-file record: an expected value followed by an expression
/// on the same line, e.g. `26 ($x1 + $x2) * 2`. A malformed line or a
/// mismatch is a reported failure, not a process abort.
fn cmd_expr_test(sim: &Simulator, path: &str) {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            println!("cannot read {path}: {e}");
            return;
        }
    };

    let mut pass = 0u32;
    let mut fail = 0u32;
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((expected, rest)) = line.split_once(char::is_whitespace) else {
            println!("line {}: malformed (no expression)", lineno + 1);
            fail += 1;
            continue;
        };
        let Ok(expected) = expected.parse::<u32>() else {
            println!("line {}: expected value is not a number: {expected}", lineno + 1);
            fail += 1;
            continue;
        };
        match expr::evaluate(rest.trim(), &sim.state, sim.bus.memory()) {
            Ok(actual) if actual == expected => pass += 1,
            Ok(actual) => {
                println!("line {}: expected {expected}, got {actual}", lineno + 1);
                fail += 1;
            }
            Err(e) => {
                println!("line {}: {e}", lineno + 1);
                fail += 1;
            }
        }
    }
    println!("{pass} passed, {fail} failed");
}
