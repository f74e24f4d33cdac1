use std::collections::HashMap;
use std::fmt;

use crate::error::{KernelError, Result};

pub const TRACKS: u8 = 4;
pub const SECTORS: u8 = 8;
pub const BLOCKS: u8 = 8;
pub const BLOCK_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockKey {
    pub track: u8,
    pub sector: u8,
    pub block: u8,
}

impl BlockKey {
    pub fn new(track: u8, sector: u8, block: u8) -> BlockKey {
        BlockKey { track, sector, block }
    }

    pub fn all() -> impl Iterator<Item = BlockKey> {
        (0..TRACKS).flat_map(|track| {
            (0..SECTORS).flat_map(move |sector| {
                (0..BLOCKS).map(move |block| BlockKey::new(track, sector, block))
            })
        })
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.track, self.sector, self.block)
    }
}

/// Block storage addressed by track, sector and block.
/// Blocks only exist after the disk has been formatted.
pub struct Disk {
    blocks: HashMap<BlockKey, Vec<u8>>,
}

impl Disk {
    pub fn new() -> Disk {
        Disk {
            blocks: HashMap::new(),
        }
    }

    pub fn format(&mut self) {
        self.blocks = BlockKey::all().map(|key| (key, vec![0; BLOCK_SIZE])).collect();
    }

    pub fn read(&self, key: BlockKey) -> Result<&[u8]> {
        self.blocks.get(&key).map(Vec::as_slice).ok_or(KernelError::NoSuchBlock(key))
    }

    /// Overwrites a whole block, zero-padding short writes.
    pub fn write(&mut self, key: BlockKey, data: &[u8]) -> Result<()> {
        if data.len() > BLOCK_SIZE {
            return Err(KernelError::BlockTooLarge {
                length: data.len(),
                block_size: BLOCK_SIZE,
            });
        }

        let block = self.blocks.get_mut(&key).ok_or(KernelError::NoSuchBlock(key))?;
        block[..data.len()].copy_from_slice(data);
        block[data.len()..].fill(0);

        Ok(())
    }
}
