use std::collections::VecDeque;

use log::{debug, warn};

use super::{DiskRequest, Interrupt};
use crate::error::Result;
use crate::io::{BlockKey, Disk};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    Unloaded,
    Loaded,
}

pub trait DeviceDriver {
    fn driver_entry(&mut self);
    fn isr(&mut self, params: &Interrupt);
    fn status(&self) -> DriverStatus;
}

pub struct KeyboardDriver {
    status: DriverStatus,
    buffer: VecDeque<char>,
}

impl KeyboardDriver {
    pub fn new() -> KeyboardDriver {
        KeyboardDriver {
            status: DriverStatus::Unloaded,
            buffer: VecDeque::new(),
        }
    }

    pub fn take_input(&mut self) -> String {
        self.buffer.drain(..).collect()
    }
}

impl DeviceDriver for KeyboardDriver {
    fn driver_entry(&mut self) {
        self.status = DriverStatus::Loaded;
    }

    fn isr(&mut self, params: &Interrupt) {
        if self.status() != DriverStatus::Loaded {
            warn!("keyboard driver not loaded, dropping {} interrupt", params.name());
            return;
        }

        match params {
            Interrupt::Keyboard { character } => self.buffer.push_back(*character),
            other => warn!("keyboard driver ignored {} interrupt", other.name()),
        }
    }

    fn status(&self) -> DriverStatus {
        self.status
    }
}

/// Storage access for kernel-level handlers. The scheduler and the
/// interpreter never reach the disk.
pub struct FileSystemDriver {
    status: DriverStatus,
    disk: Disk,
}

impl FileSystemDriver {
    pub fn new(disk: Disk) -> FileSystemDriver {
        FileSystemDriver {
            status: DriverStatus::Unloaded,
            disk,
        }
    }

    pub fn format(&mut self) {
        self.disk.format();
    }

    pub fn read(&self, key: BlockKey) -> Result<&[u8]> {
        self.disk.read(key)
    }

    pub fn write(&mut self, key: BlockKey, data: &[u8]) -> Result<()> {
        self.disk.write(key, data)
    }
}

impl DeviceDriver for FileSystemDriver {
    fn driver_entry(&mut self) {
        self.status = DriverStatus::Loaded;
    }

    fn isr(&mut self, params: &Interrupt) {
        if self.status() != DriverStatus::Loaded {
            warn!("file system driver not loaded, dropping {} interrupt", params.name());
            return;
        }

        match params {
            Interrupt::DiskRequest(DiskRequest::Format) => {
                debug!("formatting disk");
                self.format();
            }
            Interrupt::DiskRequest(DiskRequest::Write { key, data }) => {
                if let Err(err) = self.write(*key, data) {
                    warn!("disk write to {} failed: {}", key, err);
                }
            }
            other => warn!("file system driver ignored {} interrupt", other.name()),
        }
    }

    fn status(&self) -> DriverStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_driver_buffers_characters() {
        let mut keyboard = KeyboardDriver::new();
        keyboard.driver_entry();

        keyboard.isr(&Interrupt::Keyboard { character: 'o' });
        keyboard.isr(&Interrupt::Keyboard { character: 'k' });
        keyboard.isr(&Interrupt::Timer);

        assert_eq!(keyboard.status(), DriverStatus::Loaded);
        assert_eq!(keyboard.take_input(), "ok");
        assert_eq!(keyboard.take_input(), "");
    }

    #[test]
    fn test_file_system_driver_isr_format_then_write() {
        let mut fs = FileSystemDriver::new(Disk::new());
        fs.driver_entry();
        let key = BlockKey::new(0, 1, 2);

        fs.isr(&Interrupt::DiskRequest(DiskRequest::Format));
        fs.isr(&Interrupt::DiskRequest(DiskRequest::Write { key, data: vec![0xAB] }));

        assert_eq!(fs.read(key).unwrap()[0], 0xAB);
    }

    #[test]
    fn test_device_driver_ignores_interrupts_until_loaded() {
        let mut keyboard = KeyboardDriver::new();
        let mut fs = FileSystemDriver::new(Disk::new());
        assert_eq!(fs.status(), DriverStatus::Unloaded);

        keyboard.isr(&Interrupt::Keyboard { character: 'x' });
        fs.isr(&Interrupt::DiskRequest(DiskRequest::Format));

        assert_eq!(keyboard.take_input(), "");
        assert!(fs.read(BlockKey::new(0, 0, 0)).is_err());
    }

    #[test]
    fn test_file_system_driver_write_before_format_fails() {
        let mut fs = FileSystemDriver::new(Disk::new());
        assert!(fs.write(BlockKey::new(0, 0, 0), &[1]).is_err());
    }
}
