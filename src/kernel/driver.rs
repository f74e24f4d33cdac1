use log::{debug, info, trace, warn};

use super::*;

use crate::config::Config;
use crate::error::{KernelError, Result};
use crate::io::{Disk, DisplaySink};

const PRINT_INTEGER: u8 = 1;
const PRINT_STRING: u8 = 2;

/// The kernel loop. Owns the machine state and the schedulers, services
/// interrupts and drives the interpreter one cycle per tick.
pub struct Driver {
    state: KernelState,
    lts: LongTermScheduler,
    sts: ShortTermScheduler,
    keyboard: KeyboardDriver,
    file_system: FileSystemDriver,
    display: Box<dyn DisplaySink>,
}

impl Driver {
    pub fn new(config: &Config, display: Box<dyn DisplaySink>) -> Result<Driver> {
        let memory = Memory::with_layout(config.memory.partition_size, config.memory.partitions)?;
        info!(
            "memory: {} partitions of {} bytes",
            memory.get_partition_count(),
            memory.get_partition_size()
        );
        let mut state = KernelState::new(memory);
        state.single_step = config.single_step;

        let mut keyboard = KeyboardDriver::new();
        keyboard.driver_entry();
        let mut file_system = FileSystemDriver::new(Disk::new());
        file_system.driver_entry();

        Ok(Driver {
            state,
            lts: LongTermScheduler::new(),
            sts: ShortTermScheduler::new(config.scheduler.policy, config.scheduler.quantum)?,
            keyboard,
            file_system,
            display,
        })
    }

    pub fn load(&mut self, program: &[u8]) -> Result<Pid> {
        let pcb = self.lts.admit(&mut self.state.memory, program)?;
        let pid = pcb.get_id();

        self.state.ready_queue.enqueue(pcb);
        self.render_processes();

        Ok(pid)
    }

    /// Dispatches `pid` right away when the CPU is idle. Otherwise it
    /// keeps its place in the ready queue.
    pub fn run(&mut self, pid: Pid) -> Result<()> {
        if self.state.current.as_ref().is_some_and(|pcb| pcb.get_id() == pid) {
            return Ok(());
        }

        if !self.state.ready_queue.contains(pid) {
            return Err(KernelError::NoSuchProcess(pid));
        }

        if self.state.current.is_none() {
            self.sts.start_with(&mut self.state, pid)?;
            self.render();
        }

        Ok(())
    }

    pub fn run_all(&mut self) {
        if self.state.current.is_none() {
            self.sts.start(&mut self.state);
            self.render();
        }
    }

    /// Executes exactly one tick on behalf of single-step mode.
    pub fn step(&mut self) {
        self.raise(Interrupt::Step);
        self.tick();
    }

    pub fn set_quantum(&mut self, quantum: u32) -> Result<()> {
        self.sts.set_quantum(quantum)
    }

    pub fn get_quantum(&self) -> u32 {
        self.sts.get_quantum()
    }

    pub fn set_policy(&mut self, policy: SchedulingAlgorithm) {
        info!("scheduling policy set to {}", policy);
        self.sts.set_scheduling_alg(policy);
    }

    pub fn set_policy_named(&mut self, name: &str) -> Result<()> {
        let policy = name.parse()?;
        self.set_policy(policy);

        Ok(())
    }

    pub fn get_policy(&self) -> SchedulingAlgorithm {
        self.sts.get_scheduling_alg()
    }

    pub fn set_single_step(&mut self, enabled: bool) {
        self.state.single_step = enabled;
        self.state.cpu.is_executing = !enabled && self.state.current.is_some();
    }

    pub fn kill(&mut self, pid: Pid) -> Result<()> {
        self.terminate(pid)?;
        info!("killed pid {}", pid);

        Ok(())
    }

    /// Checks that `pid` is resident, then queues a kill interrupt for it.
    /// The process goes away when the next tick services the interrupt.
    pub fn request_kill(&mut self, pid: Pid) -> Result<()> {
        if self.partition_of(pid).is_none() {
            return Err(KernelError::NoSuchProcess(pid));
        }

        self.raise(Interrupt::Kill { pid });
        Ok(())
    }

    /// Queues an interrupt from outside the core, serviced next tick.
    pub fn raise(&mut self, interrupt: Interrupt) {
        self.state.interrupts.enqueue(interrupt);
    }

    pub fn tick(&mut self) {
        self.state.clock += 1;
        trace!("tick {} ({} interrupts pending)", self.state.clock, self.state.interrupts.len());

        for interrupt in self.state.interrupts.take_pending() {
            self.service(interrupt);
        }

        if self.state.cpu.is_executing {
            self.execute_cycle();
        }
    }

    /// Ticks until there is nothing left to do or `max_ticks` have passed.
    /// Returns the number of ticks taken.
    pub fn run_until_idle(&mut self, max_ticks: u64) -> u64 {
        let mut ticks = 0;

        while ticks < max_ticks && !self.is_idle() {
            self.tick();
            ticks += 1;
        }

        ticks
    }

    /// True when another tick would not change anything: no pending
    /// interrupts and nothing executing automatically.
    pub fn is_idle(&self) -> bool {
        let executing = self.state.cpu.is_executing && self.state.current.is_some();
        self.state.interrupts.is_empty() && !executing
    }

    pub fn processes(&self) -> Vec<&ProcessControlBlock> {
        self.state.processes()
    }

    pub fn state(&self) -> &KernelState {
        &self.state
    }

    pub fn take_input(&mut self) -> String {
        self.keyboard.take_input()
    }

    pub fn file_system(&self) -> &FileSystemDriver {
        &self.file_system
    }

    fn service(&mut self, interrupt: Interrupt) {
        debug!("servicing {} interrupt", interrupt.name());

        match interrupt {
            Interrupt::Timer => {
                if self.state.current.is_some() && self.sts.needs_context_switch(&self.state) {
                    self.sts.context_switch(&mut self.state);
                    self.render();
                }
            }
            Interrupt::Keyboard { .. } => self.keyboard.isr(&interrupt),
            Interrupt::SysCall { pid, accumulator, x, y } => self.sys_call(pid, accumulator, x, y),
            Interrupt::Step => {
                if self.state.single_step {
                    self.execute_cycle();
                } else {
                    debug!("step ignored outside single-step mode");
                }
            }
            Interrupt::UnknownOpcode {
                pid,
                opcode,
                program_counter,
            } => {
                warn!("unknown opcode {:#04x} at {:#04x} in pid {}", opcode, program_counter, pid);
                self.terminate_raiser(pid, interrupt.name());
            }
            Interrupt::MemoryFault { pid, address } => {
                warn!("memory fault at {:#06x} in pid {}", address, pid);
                self.terminate_raiser(pid, interrupt.name());
            }
            Interrupt::CpuBreak { pid } => {
                debug!("break from pid {}", pid);
                self.terminate_raiser(pid, interrupt.name());
            }
            Interrupt::DiskRequest(_) => self.file_system.isr(&interrupt),
            Interrupt::Kill { pid } => {
                if let Err(err) = self.kill(pid) {
                    warn!("kill interrupt failed: {}", err);
                }
            }
        }
    }

    fn execute_cycle(&mut self) {
        if self.state.current.is_none() {
            return;
        }

        if self.sts.needs_context_switch(&self.state) {
            self.sts.context_switch(&mut self.state);
            self.render();
        }

        let Some(mut current) = self.state.current.take() else {
            return;
        };

        self.state.cpu.cycle(&mut current, &mut self.state.memory, &mut self.state.interrupts);
        self.state.current = Some(current);
        self.sts.record_cycle();

        self.render_cpu();
    }

    /// Ends the process that raised a fault or break. It may have left the
    /// CPU, or been killed, since the interrupt was queued.
    fn terminate_raiser(&mut self, pid: Pid, kind: &str) {
        if let Err(err) = self.terminate(pid) {
            debug!("dropping {} interrupt: {}", kind, err);
        }
    }

    fn terminate(&mut self, pid: Pid) -> Result<()> {
        if self.current_pid() == Some(pid) {
            self.terminate_current();
            return Ok(());
        }

        let pcb = self.state.ready_queue.remove(pid).ok_or(KernelError::NoSuchProcess(pid))?;
        self.state.retire(pcb);
        self.render_processes();

        Ok(())
    }

    fn terminate_current(&mut self) {
        self.state.snapshot_current();

        match self.state.current.as_mut() {
            Some(current) => current.state = ProcessState::Terminated,
            None => return,
        }

        self.sts.context_switch(&mut self.state);
        self.render();
    }

    fn sys_call(&mut self, pid: Pid, accumulator: u8, x: u8, y: u8) {
        let Some(partition) = self.partition_of(pid) else {
            debug!("dropping sys call from pid {}, no longer resident", pid);
            return;
        };

        let text = match x {
            PRINT_INTEGER => y.to_string(),
            PRINT_STRING => self.read_string(partition, usize::from(y)),
            _ => {
                warn!("unsupported sys call x={:#04x} (acc={:#04x})", x, accumulator);
                return;
            }
        };

        if let Err(err) = self.display.print(&text) {
            warn!("display failed: {}", err);
        }
    }

    /// Reads a 0x00-terminated string from a partition.
    fn read_string(&self, partition: usize, start: usize) -> String {
        let memory = &self.state.memory;

        (start..memory.get_partition_size())
            .map_while(|address| {
                let byte = memory
                    .translate(partition, address)
                    .and_then(|physical| memory.read_from(physical))
                    .ok()?;
                (byte != 0).then_some(char::from(byte))
            })
            .collect()
    }

    fn partition_of(&self, pid: Pid) -> Option<usize> {
        self.state
            .processes()
            .into_iter()
            .find(|pcb| pcb.get_id() == pid)
            .map(ProcessControlBlock::get_partition)
    }

    fn current_pid(&self) -> Option<Pid> {
        self.state.current.as_ref().map(ProcessControlBlock::get_id)
    }

    fn render(&mut self) {
        self.render_cpu();
        self.render_processes();
    }

    fn render_cpu(&mut self) {
        let registers = *self.state.cpu.registers();

        if let Err(err) = self.display.render_cpu(&registers, self.state.cpu.is_executing) {
            warn!("display failed: {}", err);
        }
    }

    fn render_processes(&mut self) {
        let processes = self.state.processes();

        if let Err(err) = self.display.render_processes(&processes) {
            warn!("display failed: {}", err);
        }
    }
}
