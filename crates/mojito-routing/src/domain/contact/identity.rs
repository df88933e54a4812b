//! Small value types carried by every contact.

use std::fmt;

/// Four-character vendor code (e.g. `LIME`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Vendor([u8; 4]);

impl Vendor {
    pub const UNKNOWN: Vendor = Vendor([0; 4]);

    pub const fn new(code: [u8; 4]) -> Self {
        Self(code)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            let c = if b.is_ascii_graphic() { b as char } else { '?' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vendor({self})")
    }
}

/// Protocol version as major/minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const ZERO: Version = Version { major: 0, minor: 0 };

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Flag bits advertised by a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContactFlags(u8);

impl ContactFlags {
    pub const FIREWALLED: u8 = 0x01;
    pub const SHUTDOWN: u8 = 0x02;

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_firewalled(&self) -> bool {
        self.0 & Self::FIREWALLED != 0
    }

    pub fn is_shutdown(&self) -> bool {
        self.0 & Self::SHUTDOWN != 0
    }

    pub fn set(&mut self, bit: u8, on: bool) {
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }
}
