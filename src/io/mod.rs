pub mod disk;
pub mod display;
pub mod loader;

pub use disk::{BlockKey, Disk};
pub use display::{ConsoleDisplay, DisplaySink};
