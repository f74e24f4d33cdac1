use std::collections::VecDeque;

use super::Pid;
use crate::io::BlockKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskRequest {
    Format,
    Write { key: BlockKey, data: Vec<u8> },
}

/// An event queued for servicing on the next drain pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    Timer,
    Keyboard { character: char },
    /// Raised by SYS. The registers are the call's arguments.
    SysCall { pid: Pid, accumulator: u8, x: u8, y: u8 },
    Step,
    UnknownOpcode { pid: Pid, opcode: u8, program_counter: usize },
    /// Raised by BRK once the registers are snapshotted.
    CpuBreak { pid: Pid },
    MemoryFault { pid: Pid, address: usize },
    DiskRequest(DiskRequest),
    Kill { pid: Pid },
}

impl Interrupt {
    pub fn name(&self) -> &'static str {
        match self {
            Interrupt::Timer => "timer",
            Interrupt::Keyboard { .. } => "keyboard",
            Interrupt::SysCall { .. } => "sys-call",
            Interrupt::Step => "step",
            Interrupt::UnknownOpcode { .. } => "unknown-opcode",
            Interrupt::CpuBreak { .. } => "cpu-break",
            Interrupt::MemoryFault { .. } => "memory-fault",
            Interrupt::DiskRequest(_) => "disk-request",
            Interrupt::Kill { .. } => "kill",
        }
    }
}

#[derive(Debug, Default)]
pub struct InterruptQueue {
    pending: VecDeque<Interrupt>,
}

impl InterruptQueue {
    pub fn new() -> InterruptQueue {
        InterruptQueue {
            pending: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, interrupt: Interrupt) {
        self.pending.push_back(interrupt);
    }

    /// Takes everything queued so far. Interrupts raised while the
    /// returned batch is serviced land in the next batch.
    pub fn take_pending(&mut self) -> VecDeque<Interrupt> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
