use log::trace;

use super::{Interrupt, InterruptQueue, Memory, Pid, ProcessControlBlock};
use crate::error::{KernelError, Result};

/// The instruction set understood by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    LdaConstant,
    LdaMemory,
    StaMemory,
    AdcMemory,
    LdxConstant,
    LdxMemory,
    LdyConstant,
    LdyMemory,
    Nop,
    Brk,
    CpxMemory,
    Bne,
    IncMemory,
    Sys,
}

impl Opcode {
    pub fn byte(self) -> u8 {
        match self {
            Opcode::LdaConstant => 0xA9,
            Opcode::LdaMemory => 0xAD,
            Opcode::StaMemory => 0x8D,
            Opcode::AdcMemory => 0x6D,
            Opcode::LdxConstant => 0xA2,
            Opcode::LdxMemory => 0xAE,
            Opcode::LdyConstant => 0xA0,
            Opcode::LdyMemory => 0xAC,
            Opcode::Nop => 0xEA,
            Opcode::Brk => 0x00,
            Opcode::CpxMemory => 0xEC,
            Opcode::Bne => 0xD0,
            Opcode::IncMemory => 0xEE,
            Opcode::Sys => 0xFF,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::LdaConstant | Opcode::LdaMemory => "LDA",
            Opcode::StaMemory => "STA",
            Opcode::AdcMemory => "ADC",
            Opcode::LdxConstant | Opcode::LdxMemory => "LDX",
            Opcode::LdyConstant | Opcode::LdyMemory => "LDY",
            Opcode::Nop => "NOP",
            Opcode::Brk => "BRK",
            Opcode::CpxMemory => "CPX",
            Opcode::Bne => "BNE",
            Opcode::IncMemory => "INC",
            Opcode::Sys => "SYS",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = KernelError;

    fn try_from(byte: u8) -> Result<Opcode> {
        let opcode = match byte {
            0xA9 => Opcode::LdaConstant,
            0xAD => Opcode::LdaMemory,
            0x8D => Opcode::StaMemory,
            0x6D => Opcode::AdcMemory,
            0xA2 => Opcode::LdxConstant,
            0xAE => Opcode::LdxMemory,
            0xA0 => Opcode::LdyConstant,
            0xAC => Opcode::LdyMemory,
            0xEA => Opcode::Nop,
            0x00 => Opcode::Brk,
            0xEC => Opcode::CpxMemory,
            0xD0 => Opcode::Bne,
            0xEE => Opcode::IncMemory,
            0xFF => Opcode::Sys,
            _ => return Err(KernelError::UnknownOpcode { opcode: byte }),
        };

        Ok(opcode)
    }
}

/// Register file. Acc, X and Y are 8 bits wide and wrap on overflow.
/// The program counter is an offset into the running partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub program_counter: usize,
    pub accumulator: u8,
    pub x_register: u8,
    pub y_register: u8,
    pub zero_flag: bool,
}

pub struct Cpu {
    registers: Registers,
    pub is_executing: bool,
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu {
            registers: Registers::default(),
            is_executing: false,
        }
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Binds a process to the register file.
    pub fn load(&mut self, pcb: &ProcessControlBlock, should_execute: bool) {
        self.registers = pcb.registers;
        self.is_executing = should_execute;
    }

    /// Runs one instruction of `pcb`. Faults are queued as interrupts
    /// and the cycle still completes.
    pub fn cycle(
        &mut self,
        pcb: &mut ProcessControlBlock,
        memory: &mut Memory,
        interrupts: &mut InterruptQueue,
    ) {
        let mut bus = Bus {
            memory,
            partition: pcb.get_partition(),
        };
        let program_counter = self.registers.program_counter;

        match bus.load_from(program_counter).and_then(Opcode::try_from) {
            Ok(opcode) => {
                trace!(
                    "pid {} {:#04x}: {} ({:02X})",
                    pcb.get_id(),
                    program_counter,
                    opcode.mnemonic(),
                    opcode.byte()
                );

                if let Err(err) = self.execute(opcode, &mut bus, pcb, interrupts) {
                    interrupts.enqueue(Cpu::fault_to_interrupt(err, pcb.get_id(), program_counter));
                }
            }
            Err(err) => {
                interrupts.enqueue(Cpu::fault_to_interrupt(err, pcb.get_id(), program_counter))
            }
        }

        self.advance(bus.partition_size());
    }

    fn execute(
        &mut self,
        opcode: Opcode,
        bus: &mut Bus<'_>,
        pcb: &mut ProcessControlBlock,
        interrupts: &mut InterruptQueue,
    ) -> Result<()> {
        match opcode {
            Opcode::LdaConstant => self.registers.accumulator = self.read_operand(bus)?,
            Opcode::LdaMemory => {
                let address = self.read_address(bus)?;
                self.registers.accumulator = bus.load_from(address)?;
            }
            Opcode::StaMemory => {
                let address = self.read_address(bus)?;
                bus.store_to(address, self.registers.accumulator)?;
            }
            Opcode::AdcMemory => {
                let address = self.read_address(bus)?;
                let value = bus.load_from(address)?;
                self.registers.accumulator = self.registers.accumulator.wrapping_add(value);
            }
            Opcode::LdxConstant => self.registers.x_register = self.read_operand(bus)?,
            Opcode::LdxMemory => {
                let address = self.read_address(bus)?;
                self.registers.x_register = bus.load_from(address)?;
            }
            Opcode::LdyConstant => self.registers.y_register = self.read_operand(bus)?,
            Opcode::LdyMemory => {
                let address = self.read_address(bus)?;
                self.registers.y_register = bus.load_from(address)?;
            }
            Opcode::Nop => {}
            Opcode::Brk => {
                pcb.save_registers(&self.registers);
                interrupts.enqueue(Interrupt::CpuBreak { pid: pcb.get_id() });
            }
            Opcode::CpxMemory => {
                let address = self.read_address(bus)?;
                self.registers.zero_flag = self.registers.x_register == bus.load_from(address)?;
            }
            Opcode::Bne => {
                let offset = self.read_operand(bus)? as i8;

                if !self.registers.zero_flag {
                    let size = bus.partition_size() as isize;
                    let target = self.registers.program_counter as isize + offset as isize;
                    self.registers.program_counter = target.rem_euclid(size) as usize;
                }
            }
            Opcode::IncMemory => {
                let address = self.read_address(bus)?;
                let value = bus.load_from(address)?.wrapping_add(1);
                bus.store_to(address, value)?;
            }
            Opcode::Sys => interrupts.enqueue(Interrupt::SysCall {
                pid: pcb.get_id(),
                accumulator: self.registers.accumulator,
                x: self.registers.x_register,
                y: self.registers.y_register,
            }),
        }

        Ok(())
    }

    fn advance(&mut self, partition_size: usize) {
        self.registers.program_counter = (self.registers.program_counter + 1) % partition_size;
    }

    fn read_operand(&mut self, bus: &Bus<'_>) -> Result<u8> {
        self.advance(bus.partition_size());
        bus.load_from(self.registers.program_counter)
    }

    /// Two operand bytes, stored low byte first.
    fn read_address(&mut self, bus: &Bus<'_>) -> Result<usize> {
        let low = self.read_operand(bus)?;
        let high = self.read_operand(bus)?;

        Ok(usize::from(u16::from_le_bytes([low, high])))
    }

    fn fault_to_interrupt(err: KernelError, pid: Pid, program_counter: usize) -> Interrupt {
        match err {
            KernelError::UnknownOpcode { opcode } => Interrupt::UnknownOpcode {
                pid,
                opcode,
                program_counter,
            },
            KernelError::OutOfBoundsAccess { address, .. } => {
                Interrupt::MemoryFault { pid, address }
            }
            _ => Interrupt::MemoryFault {
                pid,
                address: program_counter,
            },
        }
    }
}

/// Memory as seen from inside one partition.
struct Bus<'a> {
    memory: &'a mut Memory,
    partition: usize,
}

impl Bus<'_> {
    fn partition_size(&self) -> usize {
        self.memory.get_partition_size()
    }

    fn load_from(&self, logical_address: usize) -> Result<u8> {
        let address = self.memory.translate(self.partition, logical_address)?;
        self.memory.read_from(address)
    }

    fn store_to(&mut self, logical_address: usize, value: u8) -> Result<()> {
        let address = self.memory.translate(self.partition, logical_address)?;
        self.memory.write_to(address, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::memory::PARTITION_SIZE;

    struct Machine {
        cpu: Cpu,
        pcb: ProcessControlBlock,
        memory: Memory,
        interrupts: InterruptQueue,
    }

    impl Machine {
        fn with_program(partition: usize, program: &[u8]) -> Machine {
            let mut memory = Memory::new();
            memory.write_block_to(memory.get_partition_base(partition), program).unwrap();

            let pcb = ProcessControlBlock::new(1, partition);
            let mut cpu = Cpu::new();
            cpu.load(&pcb, true);

            Machine {
                cpu,
                pcb,
                memory,
                interrupts: InterruptQueue::new(),
            }
        }

        fn cycle(&mut self) {
            self.cpu.cycle(&mut self.pcb, &mut self.memory, &mut self.interrupts);
        }

        fn drained(&mut self) -> Vec<Interrupt> {
            self.interrupts.take_pending().into_iter().collect()
        }
    }

    #[test]
    fn test_opcode_decode_every_byte() {
        let known = (0..=u8::MAX).filter(|byte| Opcode::try_from(*byte).is_ok()).count();
        assert_eq!(known, 14);

        for byte in 0..=u8::MAX {
            if let Ok(opcode) = Opcode::try_from(byte) {
                assert_eq!(opcode.byte(), byte);
            }
        }
    }

    #[test]
    fn test_cpu_lda_constant_then_sta() {
        let mut machine = Machine::with_program(0, &[0xA9, 0x2A, 0x8D, 0x10, 0x00]);

        machine.cycle();
        assert_eq!(machine.cpu.registers().accumulator, 0x2A);
        assert_eq!(machine.cpu.registers().program_counter, 2);

        machine.cycle();
        assert_eq!(machine.memory.read_from(0x10).unwrap(), 0x2A);
        assert_eq!(machine.cpu.registers().program_counter, 5);
    }

    #[test]
    fn test_cpu_address_operand_bytes_are_swapped() {
        // LDA $0005 is stored as AD 05 00.
        let mut machine = Machine::with_program(0, &[0xAD, 0x05, 0x00, 0x00, 0x00, 0x77]);
        machine.cycle();
        assert_eq!(machine.cpu.registers().accumulator, 0x77);

        // AD 00 05 names $0500, which is outside the partition.
        let mut machine = Machine::with_program(0, &[0xAD, 0x00, 0x05]);
        machine.cycle();
        assert_eq!(machine.drained(), vec![Interrupt::MemoryFault { pid: 1, address: 0x0500 }]);
        assert_eq!(machine.cpu.registers().accumulator, 0);
        assert_eq!(machine.cpu.registers().program_counter, 3);
    }

    #[test]
    fn test_cpu_addresses_are_relative_to_partition_base() {
        let mut machine = Machine::with_program(1, &[0xA9, 0x09, 0x8D, 0x04, 0x00]);

        machine.cycle();
        machine.cycle();

        assert_eq!(machine.memory.read_from(PARTITION_SIZE + 4).unwrap(), 0x09);
        assert_eq!(machine.memory.read_from(4).unwrap(), 0);
    }

    #[test]
    fn test_cpu_adc_wraps() {
        let mut machine = Machine::with_program(0, &[0xA9, 0xFF, 0x6D, 0x05, 0x00, 0x02]);

        machine.cycle();
        machine.cycle();

        assert_eq!(machine.cpu.registers().accumulator, 0x01);
    }

    #[test]
    fn test_cpu_load_x_and_y() {
        let mut machine = Machine::with_program(
            0,
            &[0xA2, 0x03, 0xA0, 0x04, 0xAE, 0x0A, 0x00, 0xAC, 0x0B, 0x00, 0x11, 0x22],
        );

        machine.cycle();
        machine.cycle();
        let registers = machine.cpu.registers();
        assert_eq!((registers.x_register, registers.y_register), (3, 4));

        machine.cycle();
        machine.cycle();
        let registers = machine.cpu.registers();
        assert_eq!((registers.x_register, registers.y_register), (0x11, 0x22));
    }

    #[test]
    fn test_cpu_inc_wraps_byte() {
        let mut machine = Machine::with_program(0, &[0xEE, 0x03, 0x00, 0xFF]);

        machine.cycle();

        assert_eq!(machine.memory.read_from(3).unwrap(), 0);
    }

    #[test]
    fn test_cpu_cpx_then_bne_not_taken() {
        let mut machine =
            Machine::with_program(0, &[0xA2, 0x07, 0xEC, 0x07, 0x00, 0xD0, 0x7F, 0x07]);

        machine.cycle();
        machine.cycle();
        assert!(machine.cpu.registers().zero_flag);

        machine.cycle();
        assert_eq!(machine.cpu.registers().program_counter, 7);
    }

    #[test]
    fn test_cpu_bne_backwards() {
        // NOP; BNE -3 lands back on the NOP.
        let mut machine = Machine::with_program(0, &[0xEA, 0xD0, 0xFD]);

        machine.cycle();
        machine.cycle();

        assert_eq!(machine.cpu.registers().program_counter, 0);
    }

    #[test]
    fn test_cpu_bne_wraps_within_partition() {
        let mut memory_image = vec![0xEA; PARTITION_SIZE];
        memory_image[0xFD] = 0xD0;
        memory_image[0xFE] = 0x05;
        let mut machine = Machine::with_program(1, &memory_image);
        machine.cpu.registers.program_counter = 0xFD;

        machine.cycle();

        assert_eq!(machine.cpu.registers().program_counter, 0x04);
        assert!(machine.drained().is_empty());
    }

    #[test]
    fn test_cpu_program_counter_wraps_at_partition_end() {
        let mut machine = Machine::with_program(0, &[0xEA; PARTITION_SIZE]);
        machine.cpu.registers.program_counter = PARTITION_SIZE - 1;

        machine.cycle();

        assert_eq!(machine.cpu.registers().program_counter, 0);
    }

    #[test]
    fn test_cpu_brk_snapshots_registers() {
        let mut machine = Machine::with_program(0, &[0xA9, 0x05, 0x00]);

        machine.cycle();
        machine.cycle();

        assert_eq!(machine.pcb.registers.accumulator, 0x05);
        assert_eq!(machine.pcb.registers.program_counter, 2);
        assert_eq!(machine.drained(), vec![Interrupt::CpuBreak { pid: 1 }]);
    }

    #[test]
    fn test_cpu_sys_passes_registers() {
        let mut machine = Machine::with_program(0, &[0xA2, 0x01, 0xA0, 0x2A, 0xFF]);

        for _ in 0..3 {
            machine.cycle();
        }

        assert_eq!(
            machine.drained(),
            vec![Interrupt::SysCall {
                pid: 1,
                accumulator: 0,
                x: 1,
                y: 0x2A
            }]
        );
    }

    #[test]
    fn test_cpu_unknown_opcode_only_advances_program_counter() {
        let mut machine = Machine::with_program(0, &[0x01]);
        let before = *machine.cpu.registers();

        machine.cycle();

        let after = *machine.cpu.registers();
        assert_eq!(
            machine.drained(),
            vec![Interrupt::UnknownOpcode {
                pid: 1,
                opcode: 0x01,
                program_counter: 0
            }]
        );
        assert_eq!(after, Registers { program_counter: 1, ..before });
    }
}
