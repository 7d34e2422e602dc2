/// A bus that supports memory read/write operations.
///
/// The 6510 address space is 16 bits; every CPU memory access goes through
/// this trait. Memory-mapped I/O means `read` may have side effects
/// (clear-on-read registers), so `peek` exists for observation and
/// diagnostics.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, addr: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, addr: u16, value: u8);

    /// Read a byte without side effects (debugging, error diagnostics).
    fn peek(&self, addr: u16) -> u8;
}
