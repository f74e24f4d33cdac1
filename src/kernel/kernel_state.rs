use log::info;

use super::{Cpu, InterruptQueue, Memory, ProcessControlBlock, ProcessState, ReadyQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Kernel,
    User,
}

/// Everything the kernel loop mutates between ticks.
pub struct KernelState {
    pub cpu: Cpu,
    pub memory: Memory,
    pub ready_queue: ReadyQueue,
    pub interrupts: InterruptQueue,
    pub current: Option<ProcessControlBlock>,
    pub mode: Mode,
    pub single_step: bool,
    pub clock: u64,
}

impl KernelState {
    pub fn new(memory: Memory) -> KernelState {
        KernelState {
            cpu: Cpu::new(),
            memory,
            ready_queue: ReadyQueue::new(),
            interrupts: InterruptQueue::new(),
            current: None,
            mode: Mode::Kernel,
            single_step: false,
            clock: 0,
        }
    }

    pub fn current_is_terminated(&self) -> bool {
        self.current.as_ref().is_some_and(ProcessControlBlock::is_terminated)
    }

    /// Copies the live registers into the running process's PCB.
    pub fn snapshot_current(&mut self) {
        if let Some(current) = self.current.as_mut() {
            current.save_registers(self.cpu.registers());
        }
    }

    /// Puts `pcb` on the CPU. The executing flag stays down in single-step mode.
    pub fn dispatch(&mut self, mut pcb: ProcessControlBlock) {
        pcb.state = ProcessState::Running;
        self.mode = Mode::User;
        self.cpu.load(&pcb, !self.single_step);
        self.current = Some(pcb);
    }

    /// Frees the partition of a process that has left every queue.
    pub fn retire(&mut self, mut pcb: ProcessControlBlock) {
        pcb.state = ProcessState::Terminated;
        self.memory.free_partition(pcb.get_partition());
        info!(
            "pid {} terminated, partition {} freed ({} free)",
            pcb.get_id(),
            pcb.get_partition(),
            self.memory.get_free_partitions()
        );
    }

    /// Running process first, then ready queue order.
    pub fn processes(&self) -> Vec<&ProcessControlBlock> {
        self.current.iter().chain(self.ready_queue.iter()).collect()
    }
}
