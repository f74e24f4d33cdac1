use thiserror::Error;

use crate::io::BlockKey;
use crate::kernel::Pid;

pub type Result<T> = std::result::Result<T, KernelError>;

#[derive(Debug, Error)]
pub enum KernelError {
    #[error("out of bounds memory access at {address:#06x} (limit {limit:#06x})")]
    OutOfBoundsAccess { address: usize, limit: usize },
    #[error("unknown opcode {opcode:#04x}")]
    UnknownOpcode { opcode: u8 },
    #[error("memory layout needs at least one partition of at least one byte")]
    InvalidLayout,
    #[error("no free memory partition")]
    CapacityExceeded,
    #[error("program of {length} bytes does not fit a {partition_size} byte partition")]
    ProgramTooLarge { length: usize, partition_size: usize },
    #[error("unknown scheduling policy: {0}")]
    InvalidPolicy(String),
    #[error("quantum must be at least one cycle")]
    InvalidQuantum,
    #[error("no process with id {0}")]
    NoSuchProcess(Pid),
    #[error("no block at {0}")]
    NoSuchBlock(BlockKey),
    #[error("{length} bytes do not fit a {block_size} byte block")]
    BlockTooLarge { length: usize, block_size: usize },
    #[error("failed to parse program byte: {token}")]
    ParseProgram { token: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}
