mod cpu;
mod device_driver;
mod interrupt;
mod kernel_state;
mod long_term_scheduler;
pub mod memory;
mod process_control_block;
mod ready_queue;
mod short_term_scheduler;

use long_term_scheduler::LongTermScheduler;
use short_term_scheduler::ShortTermScheduler;

pub use cpu::{Cpu, Registers};
pub use device_driver::{DeviceDriver, FileSystemDriver, KeyboardDriver};
pub use interrupt::{DiskRequest, Interrupt, InterruptQueue};
pub use kernel_state::{KernelState, Mode};
pub use memory::Memory;
pub use process_control_block::{Pid, ProcessControlBlock, ProcessState};
pub use ready_queue::ReadyQueue;
pub use short_term_scheduler::{SchedulingAlgorithm, DEFAULT_QUANTUM};

pub mod driver;

pub use driver::Driver;
