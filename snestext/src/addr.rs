//! 24-bit CPU addresses

/// The 24-bit address type used by the 65816
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Addr24 {
    pub bank: u8,
    pub addr: u16,
}

impl Addr24 {
    pub const fn new(bank: u8, addr: u16) -> Self {
        Self { bank, addr }
    }

    pub const fn from_u32(value: u32) -> Self {
        Self {
            bank: (value >> 16) as u8,
            addr: value as u16,
        }
    }

    pub const fn to_u32(self) -> u32 {
        ((self.bank as u32) << 16) | self.addr as u32
    }

    pub const fn is_lower_half(&self) -> bool {
        self.addr < 0x8000
    }
}

impl From<u32> for Addr24 {
    fn from(value: u32) -> Self {
        Self::from_u32(value)
    }
}

impl From<Addr24> for u32 {
    fn from(addr: Addr24) -> Self {
        addr.to_u32()
    }
}

impl std::fmt::Display for Addr24 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:02x}:{:04x}", self.bank, self.addr)
    }
}

impl std::fmt::UpperHex for Addr24 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::UpperHex::fmt(&self.to_u32(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u32_conversion() {
        let addr = Addr24::from(0xfcbd36);
        assert_eq!(addr, Addr24::new(0xfc, 0xbd36));
        assert_eq!(u32::from(addr), 0xfcbd36);
        assert_eq!(Addr24::from(0x01fc_bd36), Addr24::new(0xfc, 0xbd36));
    }

    #[test]
    fn test_display() {
        assert_eq!(Addr24::new(0xc0, 0x12).to_string(), "c0:0012");
        assert_eq!(format!("{:06X}", Addr24::new(0x01, 0x8000)), "018000");
        assert!(Addr24::new(0x00, 0x7fff).is_lower_half());
        assert!(!Addr24::new(0x00, 0x8000).is_lower_half());
    }
}
