use std::io::{self, Write};

use crate::kernel::{ProcessControlBlock, Registers};

/// One-way render target. Nothing it returns feeds back into the kernel
/// beyond being logged.
pub trait DisplaySink {
    fn render_cpu(&mut self, registers: &Registers, is_executing: bool) -> io::Result<()>;
    fn render_processes(&mut self, processes: &[&ProcessControlBlock]) -> io::Result<()>;
    fn print(&mut self, text: &str) -> io::Result<()>;
}

/// Prints program output to a writer. With `verbose` it also traces the
/// register file and process table after every decision.
pub struct ConsoleDisplay<W: Write> {
    out: W,
    verbose: bool,
}

impl ConsoleDisplay<io::Stdout> {
    pub fn stdout(verbose: bool) -> ConsoleDisplay<io::Stdout> {
        ConsoleDisplay::new(io::stdout(), verbose)
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W, verbose: bool) -> ConsoleDisplay<W> {
        ConsoleDisplay { out, verbose }
    }
}

impl<W: Write> DisplaySink for ConsoleDisplay<W> {
    fn render_cpu(&mut self, registers: &Registers, is_executing: bool) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }

        writeln!(
            self.out,
            "PC {:02X} | ACC {:02X} | X {:02X} | Y {:02X} | Z {} | {}",
            registers.program_counter,
            registers.accumulator,
            registers.x_register,
            registers.y_register,
            u8::from(registers.zero_flag),
            if is_executing { "executing" } else { "idle" }
        )
    }

    fn render_processes(&mut self, processes: &[&ProcessControlBlock]) -> io::Result<()> {
        if !self.verbose {
            return Ok(());
        }

        write_process_table(&mut self.out, processes)
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{}", text)?;
        self.out.flush()
    }
}

pub fn write_process_table<W: Write>(
    out: &mut W,
    processes: &[&ProcessControlBlock],
) -> io::Result<()> {
    writeln!(out, " PID | Part | State      | PC | ACC | X  | Y  | Z")?;
    writeln!(out, "-----|------|------------|----|-----|----|----|--")?;

    for pcb in processes {
        writeln!(
            out,
            " {:03} | {:4} | {:10} | {:02X} | {:02X}  | {:02X} | {:02X} | {}",
            pcb.get_id(),
            pcb.get_partition(),
            pcb.state.to_string(),
            pcb.registers.program_counter,
            pcb.registers.accumulator,
            pcb.registers.x_register,
            pcb.registers.y_register,
            u8::from(pcb.registers.zero_flag)
        )?;
    }

    Ok(())
}
