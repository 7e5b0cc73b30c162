//! Virtual address type.

use std::fmt;
use std::ops::Add;

/// Strongly typed virtual memory address
///
/// Sections and segments record where they are mapped in the image's address
/// space. Those values live next to file offsets and byte sizes of the same
/// width, so the address gets its own type to keep the three apart.
///
/// Addresses are always stored as 64-bit values; 32-bit slices zero-extend.
///
/// ## Example
///
/// ```rust
/// use machscope_core::types::Address;
///
/// let stubs = Address::new(0x1000);
/// assert_eq!(stubs.offset(2 * 6), Address::new(0x100c));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address
    pub const ZERO: Self = Address(0);

    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Raw numeric value
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Address `delta` bytes further on, wrapping on overflow.
    ///
    /// Hostile inputs can place a section near the top of the address space;
    /// wrapping keeps address synthesis total instead of panicking.
    #[must_use]
    pub const fn offset(self, delta: u64) -> Self
    {
        Address(self.0.wrapping_add(delta))
    }

    /// Whether `self` lies in `[start, start + size)`.
    pub fn within(self, start: Address, size: u64) -> bool
    {
        self.0 >= start.0 && self.0 - start.0 < size
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        self.offset(rhs)
    }
}
