use log::info;

use super::{Memory, Pid, ProcessControlBlock, ProcessState};
use crate::error::{KernelError, Result};

/// Admits programs into memory. Each admitted program gets a free
/// partition and a fresh, monotonically increasing process id.
pub(crate) struct LongTermScheduler {
    next_pid: Pid,
}

impl LongTermScheduler {
    pub fn new() -> LongTermScheduler {
        LongTermScheduler { next_pid: 0 }
    }

    pub fn admit(&mut self, memory: &mut Memory, program: &[u8]) -> Result<ProcessControlBlock> {
        if program.len() > memory.get_partition_size() {
            return Err(KernelError::ProgramTooLarge {
                length: program.len(),
                partition_size: memory.get_partition_size(),
            });
        }

        let partition = memory.allocate_partition()?;
        if let Err(err) = memory.write_block_to(memory.get_partition_base(partition), program) {
            memory.free_partition(partition);
            return Err(err);
        }

        let mut pcb = ProcessControlBlock::new(self.next_pid, partition);
        self.next_pid += 1;
        pcb.state = ProcessState::Ready;

        info!("loaded pid {} ({} bytes) into partition {}", pcb.get_id(), program.len(), partition);

        Ok(pcb)
    }
}
