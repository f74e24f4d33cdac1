use crate::error::{KernelError, Result};

pub const PARTITION_SIZE: usize = 256;
pub const MAX_PROGRAMS: usize = 3;

/// Main memory, split into equal fixed-size partitions.
/// Each resident program owns exactly one partition.
pub struct Memory {
    data: Vec<u8>,
    partition_size: usize,
    partitions_in_use: Vec<bool>,
}

impl Memory {
    #[cfg(test)]
    pub fn new() -> Memory {
        Memory {
            data: vec![0; PARTITION_SIZE * MAX_PROGRAMS],
            partition_size: PARTITION_SIZE,
            partitions_in_use: vec![false; MAX_PROGRAMS],
        }
    }

    /// Needs at least one partition of at least one byte, and a total
    /// size that fits in `usize`.
    pub fn with_layout(partition_size: usize, partition_count: usize) -> Result<Memory> {
        if partition_size == 0 || partition_count == 0 {
            return Err(KernelError::InvalidLayout);
        }
        let size = partition_size.checked_mul(partition_count).ok_or(KernelError::InvalidLayout)?;

        Ok(Memory {
            data: vec![0; size],
            partition_size,
            partitions_in_use: vec![false; partition_count],
        })
    }

    pub fn read_from(&self, address: usize) -> Result<u8> {
        self.data.get(address).copied().ok_or(KernelError::OutOfBoundsAccess {
            address,
            limit: self.data.len(),
        })
    }

    pub fn write_to(&mut self, address: usize, value: u8) -> Result<()> {
        let limit = self.data.len();

        match self.data.get_mut(address) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(KernelError::OutOfBoundsAccess { address, limit }),
        }
    }

    pub fn read_block_from(&self, start_address: usize, end_address: usize) -> Result<&[u8]> {
        if end_address > self.data.len() || start_address > end_address {
            return Err(KernelError::OutOfBoundsAccess {
                address: end_address,
                limit: self.data.len(),
            });
        }

        Ok(&self.data[start_address..end_address])
    }

    pub fn write_block_to(&mut self, address: usize, data: &[u8]) -> Result<()> {
        let end_address = match address.checked_add(data.len()) {
            Some(end_address) if end_address <= self.data.len() => end_address,
            _ => {
                return Err(KernelError::OutOfBoundsAccess {
                    address,
                    limit: self.data.len(),
                })
            }
        };

        self.data[address..end_address].copy_from_slice(data);
        Ok(())
    }

    /// Maps a partition-relative address onto the physical array.
    pub fn translate(&self, partition: usize, logical_address: usize) -> Result<usize> {
        if logical_address >= self.partition_size || partition >= self.partitions_in_use.len() {
            return Err(KernelError::OutOfBoundsAccess {
                address: logical_address,
                limit: self.partition_size,
            });
        }

        Ok(self.get_partition_base(partition) + logical_address)
    }

    /// Claims the lowest free partition and zeroes it.
    pub fn allocate_partition(&mut self) -> Result<usize> {
        let partition = self
            .partitions_in_use
            .iter()
            .position(|in_use| !in_use)
            .ok_or(KernelError::CapacityExceeded)?;

        self.partitions_in_use[partition] = true;
        self.clear_partition(partition);

        Ok(partition)
    }

    /// Marks a partition reusable. Its bytes stay readable until the
    /// next allocation zeroes them.
    pub fn free_partition(&mut self, partition: usize) {
        if let Some(in_use) = self.partitions_in_use.get_mut(partition) {
            *in_use = false;
        }
    }

    fn clear_partition(&mut self, partition: usize) {
        let base = self.get_partition_base(partition);
        self.data[base..base + self.partition_size].fill(0);
    }

    pub fn get_partition_base(&self, partition: usize) -> usize {
        partition * self.partition_size
    }

    pub fn get_partition_size(&self) -> usize {
        self.partition_size
    }

    pub fn get_partition_count(&self) -> usize {
        self.partitions_in_use.len()
    }

    pub fn get_free_partitions(&self) -> usize {
        self.partitions_in_use.iter().filter(|in_use| !**in_use).count()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const MEMORY_SIZE: usize = PARTITION_SIZE * MAX_PROGRAMS;

    #[test]
    fn test_memory_read_from() {
        let memory = Memory::new();
        assert_eq!(memory.read_from(0).unwrap(), 0);
    }

    #[test]
    fn test_memory_out_of_bounds_read_from() {
        let memory = Memory::new();
        assert!(matches!(
            memory.read_from(MEMORY_SIZE),
            Err(KernelError::OutOfBoundsAccess { address: MEMORY_SIZE, limit: MEMORY_SIZE })
        ));
    }

    #[test]
    fn test_memory_write_to() {
        let mut memory = Memory::new();
        memory.write_to(0, 10).unwrap();
        assert_eq!(memory.read_from(0).unwrap(), 10);
    }

    #[test]
    fn test_memory_out_of_bounds_write_to() {
        let mut memory = Memory::new();
        assert!(memory.write_to(MEMORY_SIZE, 10).is_err());
    }

    #[test]
    fn test_memory_write_block_to() {
        let mut memory = Memory::new();
        memory.write_block_to(256, &[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(memory.read_block_from(256, 261).unwrap(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_memory_out_of_bounds_write_block_to_is_not_partial() {
        let mut memory = Memory::new();
        assert!(memory.write_block_to(MEMORY_SIZE - 2, &[1, 2, 3]).is_err());
        assert_eq!(memory.read_block_from(MEMORY_SIZE - 2, MEMORY_SIZE).unwrap(), &[0, 0]);
    }

    #[test]
    fn test_memory_write_block_to_near_usize_max_is_rejected() {
        let mut memory = Memory::new();
        assert!(matches!(
            memory.write_block_to(usize::MAX, &[1, 2]),
            Err(KernelError::OutOfBoundsAccess { address: usize::MAX, .. })
        ));
    }

    #[test]
    fn test_memory_with_layout_rejects_bad_layouts() {
        assert!(matches!(Memory::with_layout(0, 3), Err(KernelError::InvalidLayout)));
        assert!(matches!(Memory::with_layout(256, 0), Err(KernelError::InvalidLayout)));
        assert!(matches!(Memory::with_layout(usize::MAX, 2), Err(KernelError::InvalidLayout)));

        let memory = Memory::with_layout(16, 2).unwrap();
        assert_eq!(memory.get_partition_count(), 2);
        assert_eq!(memory.translate(1, 15).unwrap(), 31);
    }

    #[test]
    fn test_memory_invalid_range_read_block_from() {
        let memory = Memory::new();
        assert!(memory.read_block_from(5, 0).is_err());
    }

    #[test]
    fn test_memory_translate_rejects_partition_escape() {
        let memory = Memory::new();
        assert!(matches!(
            memory.translate(0, PARTITION_SIZE),
            Err(KernelError::OutOfBoundsAccess { .. })
        ));
        assert!(memory.translate(MAX_PROGRAMS, 0).is_err());
    }

    #[test]
    fn test_memory_allocate_until_capacity_exceeded() {
        let mut memory = Memory::new();

        for expected in 0..MAX_PROGRAMS {
            assert_eq!(memory.allocate_partition().unwrap(), expected);
        }

        assert!(matches!(memory.allocate_partition(), Err(KernelError::CapacityExceeded)));
        assert_eq!(memory.get_free_partitions(), 0);
    }

    #[test]
    fn test_memory_free_partition_then_reallocate_clears() {
        let mut memory = Memory::new();
        memory.allocate_partition().unwrap();
        let partition = memory.allocate_partition().unwrap();
        memory.write_to(memory.get_partition_base(partition), 0xA9).unwrap();

        memory.free_partition(partition);
        assert_eq!(memory.read_from(256).unwrap(), 0xA9);

        assert_eq!(memory.allocate_partition().unwrap(), partition);
        assert_eq!(memory.read_from(256).unwrap(), 0);
    }

    proptest! {
        #[test]
        fn test_memory_translate_is_base_plus_offset(
            partition in 0..MAX_PROGRAMS,
            address in 0..PARTITION_SIZE,
        ) {
            let memory = Memory::new();
            let physical = memory.translate(partition, address).unwrap();
            prop_assert_eq!(physical, partition * PARTITION_SIZE + address);
        }

        #[test]
        fn test_memory_translate_fails_past_partition(
            partition in 0..MAX_PROGRAMS,
            address in PARTITION_SIZE..4 * PARTITION_SIZE,
        ) {
            let memory = Memory::new();
            prop_assert!(memory.translate(partition, address).is_err());
        }

        #[test]
        fn test_memory_write_then_read(address in 0..MEMORY_SIZE, value: u8) {
            let mut memory = Memory::new();
            memory.write_to(address, value).unwrap();
            prop_assert_eq!(memory.read_from(address).unwrap(), value);
        }
    }
}
