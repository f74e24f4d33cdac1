use std::fmt;

use super::Registers;

pub type Pid = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    Waiting,
    Terminated,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::New => "new",
            ProcessState::Ready => "ready",
            ProcessState::Running => "running",
            ProcessState::Waiting => "waiting",
            ProcessState::Terminated => "terminated",
        };

        f.write_str(name)
    }
}

/// The process control block. Holds the register snapshot of a
/// process while it is off the CPU, plus its identity and partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessControlBlock {
    pub registers: Registers,
    pub state: ProcessState,

    id: Pid,
    partition: usize,
}

impl ProcessControlBlock {
    pub fn new(id: Pid, partition: usize) -> ProcessControlBlock {
        ProcessControlBlock {
            registers: Registers::default(),
            state: ProcessState::New,
            id,
            partition,
        }
    }

    pub fn get_id(&self) -> Pid {
        self.id
    }

    pub fn get_partition(&self) -> usize {
        self.partition
    }

    pub fn save_registers(&mut self, registers: &Registers) {
        self.registers = *registers;
    }

    pub fn is_terminated(&self) -> bool {
        self.state == ProcessState::Terminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_control_block_new() {
        let pcb = ProcessControlBlock::new(4, 2);

        assert_eq!(pcb.get_id(), 4);
        assert_eq!(pcb.get_partition(), 2);
        assert_eq!(pcb.state, ProcessState::New);
        assert_eq!(pcb.registers, Registers::default());
    }

    #[test]
    fn test_process_control_block_save_registers() {
        let mut pcb = ProcessControlBlock::new(0, 0);
        let registers = Registers {
            program_counter: 12,
            accumulator: 3,
            x_register: 1,
            y_register: 9,
            zero_flag: true,
        };

        pcb.save_registers(&registers);

        assert_eq!(pcb.registers, registers);
    }
}
