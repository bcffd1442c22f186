//! Utilities to read a cartridge image into memory
//!
//! # Literature
//!
//! - the [super famicom wiki page](https://wiki.superfamicom.org/memory-mapping)
//! - <http://patrickjohnston.org/ASM/ROM data/snestek.htm>

use crate::addr::Addr24;
use crate::mapping::MemoryMapping;
use std::path::{Path, PathBuf};
use thiserror::Error;

const MINIMUM_SIZE: usize = 0x8000;
const HEADER_SIZE: usize = 0x40;
const COPIER_HEADER_SIZE: usize = 0x200;

/// Candidate header offsets, LoROM layout first
pub const HEADER_OFFSETS: [usize; 2] = [0x7fc0, 0xffc0];

#[derive(Debug, Error)]
pub enum ReadRomError {
    #[error("could not read file \"{}\" ({source})", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("file too small ({0} < {min})", min = MINIMUM_SIZE)]
    TooSmall(usize),
    #[error("no suitable header found")]
    NoSuitableHeader,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub offset: usize,
    pub makeup: u8,
    pub rom_type: u8,
    pub rom_size: u32,
    pub ram_size: u32,
    pub country: u8,
    pub developer: u8,
    pub version: u8,
    pub checksum_complement: u16,
    pub checksum: u16,
}

impl Header {
    /// Parse the 64 header bytes located at `offset`
    pub fn from_bytes(bytes: &[u8], offset: usize) -> Self {
        assert_eq!(bytes.len(), HEADER_SIZE);
        let mut name = String::with_capacity(21);
        let mut len = 0;
        for c in &bytes[..21] {
            name.push(if matches!(c, 0x20..=0x7e) {
                *c as char
            } else {
                '?'
            });
            if *c != b' ' {
                len = name.len()
            }
        }
        // trim away trailing whitespace
        name.truncate(len);
        Self {
            name,
            offset,
            makeup: bytes[0x15],
            rom_type: bytes[0x16],
            rom_size: 0x400u32.wrapping_shl(bytes[0x17].into()),
            ram_size: 0x400u32.wrapping_shl(bytes[0x18].into()),
            country: bytes[0x19],
            developer: bytes[0x1a],
            version: bytes[0x1b],
            checksum_complement: u16::from_le_bytes([bytes[0x1c], bytes[0x1d]]),
            checksum: u16::from_le_bytes([bytes[0x1e], bytes[0x1f]]),
        }
    }

    pub const fn is_valid(&self) -> bool {
        self.checksum ^ self.checksum_complement == 0xffff
    }

    /// Scan the candidate offsets and return the first header whose checksum
    /// and complement agree
    pub fn find(rom: &[u8]) -> Result<Self, ReadRomError> {
        HEADER_OFFSETS
            .into_iter()
            .filter(|&offset| rom.len() >= offset + HEADER_SIZE)
            .map(|offset| Self::from_bytes(&rom[offset..offset + HEADER_SIZE], offset))
            .find(Self::is_valid)
            .ok_or(ReadRomError::NoSuitableHeader)
    }

    pub fn mapping(&self) -> Option<MemoryMapping> {
        MemoryMapping::detect(self.makeup)
    }
}

#[derive(Debug, Clone)]
pub struct Cartridge {
    header: Header,
    rom: Vec<u8>,
    mapping: MemoryMapping,
}

impl Cartridge {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadRomError> {
        let path = path.as_ref();
        log::info!("loading cartridge image `{}`", path.display());
        let content = std::fs::read(path).map_err(|source| ReadRomError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(content)
    }

    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self, ReadRomError> {
        if bytes.len() < MINIMUM_SIZE {
            return Err(ReadRomError::TooSmall(bytes.len()));
        }
        if bytes.len() & 0x3ff == COPIER_HEADER_SIZE {
            log::debug!("stripping {COPIER_HEADER_SIZE} byte copier header");
            bytes.drain(..COPIER_HEADER_SIZE);
        }

        let header = Header::find(&bytes)?;
        let mapping = header.mapping().ok_or(ReadRomError::NoSuitableHeader)?;
        log::info!(
            "found header \"{}\" at {:#06x} ({})",
            header.name,
            header.offset,
            mapping
        );

        let checksum = bytes.iter().fold(0u16, |b, i| b.wrapping_add((*i).into()));
        if checksum != header.checksum {
            log::warn!(
                "checksum did not match! Checksum in ROM is {:04x}; Calculated checksum is {:04x}",
                header.checksum,
                checksum
            );
        }

        Ok(Self {
            header,
            rom: bytes,
            mapping,
        })
    }

    pub const fn header(&self) -> &Header {
        &self.header
    }

    pub const fn mapping(&self) -> MemoryMapping {
        self.mapping
    }

    pub fn len(&self) -> usize {
        self.rom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rom.is_empty()
    }

    /// Whether `addr` maps to a byte inside the image
    pub fn contains(&self, addr: Addr24) -> bool {
        self.mapping.from_cpu(addr) < self.rom.len()
    }

    /// Read up to `len` bytes at ROM offset `offset`; the slice is shorter
    /// when the image ends early
    pub fn read_rom(&self, offset: usize, len: usize) -> &[u8] {
        let start = offset.min(self.rom.len());
        let end = offset.saturating_add(len).min(self.rom.len());
        &self.rom[start..end]
    }

    /// Read up to `len` bytes at the CPU address `addr`
    pub fn read(&self, addr: Addr24, len: usize) -> &[u8] {
        self.read_rom(self.mapping.from_cpu(addr), len)
    }

    /// Read a single byte, `None` outside the image
    pub fn read_byte(&self, addr: Addr24) -> Option<u8> {
        self.rom.get(self.mapping.from_cpu(addr)).copied()
    }
}
