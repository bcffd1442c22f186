//! Conversion between ROM file offsets and CPU addresses
//!
//! # Literature
//!
//! - the [super famicom wiki page](https://wiki.superfamicom.org/memory-mapping)

use crate::addr::Addr24;

const HIROM_BASE: u32 = 0xc0_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryMapping {
    LoRom,
    HiRom,
}

impl MemoryMapping {
    /// Variants in the order they are tried against the header makeup byte
    pub const ALL: [Self; 2] = [Self::LoRom, Self::HiRom];

    pub const fn check_header_mapper_byte(&self, byte: u8) -> bool {
        match self {
            Self::LoRom => byte & 1 == 0,
            Self::HiRom => byte & 1 == 1,
        }
    }

    pub fn detect(makeup: u8) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mapping| mapping.check_header_mapper_byte(makeup))
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::LoRom => "LoROM",
            Self::HiRom => "HiROM",
        }
    }

    /// Bytes per bank which are visible in CPU address space
    pub const fn bank_offset_size(&self) -> usize {
        match self {
            Self::LoRom => 0x8000,
            Self::HiRom => 0x10000,
        }
    }

    pub const fn from_rom(&self, offset: usize) -> Addr24 {
        let offset = offset as u32;
        Addr24::from_u32(match self {
            Self::LoRom => ((offset & 0x3f_8000) << 1) | 0x8000 | (offset & 0x7fff),
            Self::HiRom => (offset & 0x3f_ffff) | HIROM_BASE,
        })
    }

    pub const fn from_cpu(&self, addr: Addr24) -> usize {
        let addr = addr.to_u32();
        (match self {
            Self::LoRom => ((addr & 0x7f_0000) >> 1) | (addr & 0x7fff),
            Self::HiRom => addr & 0x3f_ffff,
        }) as usize
    }

    /// The address of the byte following `addr`, skipping the lower half of
    /// the next bank on LoROM
    pub const fn increment_address(&self, addr: Addr24) -> Addr24 {
        let next = addr.to_u32().wrapping_add(1) & 0xff_ffff;
        Addr24::from_u32(match self {
            Self::LoRom if next & 0xffff == 0 => next | 0x8000,
            _ => next,
        })
    }

    /// Move `addr` by `bytes` in ROM space
    pub const fn offset_address(&self, addr: Addr24, bytes: usize) -> Addr24 {
        self.from_rom(self.from_cpu(addr) + bytes)
    }
}

impl Default for MemoryMapping {
    fn default() -> Self {
        Self::LoRom
    }
}

impl std::fmt::Display for MemoryMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
