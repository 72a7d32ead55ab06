pub mod console;
pub mod memory;
