//! Uncompressed string tables and the interface shared with compressed messages

use crate::addr::Addr24;
use crate::cartridge::Cartridge;
use crate::error::DecodeError;
use std::ops::Range;

/// A string read from the cartridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedString {
    pub id: u32,
    pub address: Addr24,
    /// bit cursor of compressed messages
    pub shift: Option<u8>,
    /// number of source bytes the string occupies
    pub span: usize,
    pub codes: Vec<u16>,
}

pub type Strings<'a> = Box<dyn Iterator<Item = Result<DecodedString, DecodeError>> + 'a>;

/// Something producing consecutive strings by id
pub trait StringGenerator {
    /// The declared id span
    fn ids(&self) -> Range<u32>;

    /// Codes terminating a string, empty when strings carry their length
    fn delimiters(&self) -> &[u16];

    /// Iterate over the strings `first..last`.
    ///
    /// The range is checked before the cartridge is accessed.
    fn strings(&mut self, first: u32, last: u32) -> Result<Strings<'_>, DecodeError>;

    /// Iterate over every declared string
    fn all_strings(&mut self) -> Result<Strings<'_>, DecodeError> {
        let ids = self.ids();
        self.strings(ids.start, ids.end)
    }
}

/// A forward-only byte reader honouring the bank layout
#[derive(Debug, Clone, Copy)]
struct ByteCursor<'a> {
    rom: &'a Cartridge,
    address: Addr24,
}

impl ByteCursor<'_> {
    fn next_byte(&mut self) -> Result<u8, DecodeError> {
        let byte = self
            .rom
            .read_byte(self.address)
            .ok_or(DecodeError::OutOfRom(self.address))?;
        self.address = self.rom.mapping().increment_address(self.address);
        Ok(byte)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PascalParams {
    pub address: Addr24,
    pub ids: Range<u32>,
}

/// Length-prefixed strings
///
/// An entry with length zero takes up one id but produces no string.
#[derive(Debug, Clone)]
pub struct PascalStrings<'rom> {
    rom: &'rom Cartridge,
    params: PascalParams,
}

impl<'rom> PascalStrings<'rom> {
    pub fn new(rom: &'rom Cartridge, params: PascalParams) -> Self {
        Self { rom, params }
    }
}

impl StringGenerator for PascalStrings<'_> {
    fn ids(&self) -> Range<u32> {
        self.params.ids.clone()
    }

    fn delimiters(&self) -> &[u16] {
        &[]
    }

    fn strings(&mut self, first: u32, last: u32) -> Result<Strings<'_>, DecodeError> {
        DecodeError::check_range(first, last, &self.params.ids)?;
        let mut iter = PascalIter {
            cursor: ByteCursor {
                rom: self.rom,
                address: self.params.address,
            },
            id: self.params.ids.start,
            last,
            failed: false,
        };
        while iter.id < first {
            iter.read_entry()?;
        }
        Ok(Box::new(iter.filter_map(|entry| entry.transpose())))
    }
}

struct PascalIter<'a> {
    cursor: ByteCursor<'a>,
    id: u32,
    last: u32,
    failed: bool,
}

impl PascalIter<'_> {
    fn read_entry(&mut self) -> Result<Option<DecodedString>, DecodeError> {
        let address = self.cursor.address;
        let id = self.id;
        self.id += 1;
        let len = self.cursor.next_byte()?;
        if len == 0 {
            return Ok(None);
        }
        let codes = (0..len)
            .map(|_| self.cursor.next_byte().map(u16::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(DecodedString {
            id,
            address,
            shift: None,
            span: usize::from(len) + 1,
            codes,
        }))
    }
}

impl Iterator for PascalIter<'_> {
    type Item = Result<Option<DecodedString>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.id >= self.last {
            return None;
        }
        let entry = self.read_entry();
        self.failed = entry.is_err();
        Some(entry)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CParams {
    pub address: Addr24,
    pub ids: Range<u32>,
    pub delimiters: Vec<u16>,
    /// lead bytes of two-byte codes
    pub prefixes: Vec<u8>,
}

/// Delimiter terminated strings
#[derive(Debug, Clone)]
pub struct CStrings<'rom> {
    rom: &'rom Cartridge,
    params: CParams,
}

impl<'rom> CStrings<'rom> {
    pub fn new(rom: &'rom Cartridge, params: CParams) -> Self {
        Self { rom, params }
    }
}

impl StringGenerator for CStrings<'_> {
    fn ids(&self) -> Range<u32> {
        self.params.ids.clone()
    }

    fn delimiters(&self) -> &[u16] {
        &self.params.delimiters
    }

    fn strings(&mut self, first: u32, last: u32) -> Result<Strings<'_>, DecodeError> {
        DecodeError::check_range(first, last, &self.params.ids)?;
        let mut iter = CIter {
            cursor: ByteCursor {
                rom: self.rom,
                address: self.params.address,
            },
            params: &self.params,
            id: self.params.ids.start,
            last,
            failed: false,
        };
        while iter.id < first {
            iter.read_entry()?;
        }
        Ok(Box::new(iter))
    }
}

struct CIter<'a> {
    cursor: ByteCursor<'a>,
    params: &'a CParams,
    id: u32,
    last: u32,
    failed: bool,
}

impl CIter<'_> {
    fn read_code(&mut self) -> Result<(u16, usize), DecodeError> {
        let byte = self.cursor.next_byte()?;
        if self.params.prefixes.contains(&byte) {
            let low = self.cursor.next_byte()?;
            Ok((u16::from_be_bytes([byte, low]), 2))
        } else {
            Ok((byte.into(), 1))
        }
    }

    fn read_entry(&mut self) -> Result<DecodedString, DecodeError> {
        let address = self.cursor.address;
        let id = self.id;
        self.id += 1;
        let mut codes = vec![];
        let mut span = 0;
        loop {
            let (code, len) = self.read_code()?;
            codes.push(code);
            span += len;
            if self.params.delimiters.contains(&code) {
                return Ok(DecodedString {
                    id,
                    address,
                    shift: None,
                    span,
                    codes,
                });
            }
        }
    }
}

impl Iterator for CIter<'_> {
    type Item = Result<DecodedString, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.id >= self.last {
            return None;
        }
        let entry = self.read_entry();
        self.failed = entry.is_err();
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::tests::{hirom_image, lorom_image};
    use crate::mapping::MemoryMapping;

    fn collect(strings: Strings) -> Vec<DecodedString> {
        strings.collect::<Result<_, _>>().unwrap()
    }

    fn pascal_rom() -> Cartridge {
        let mut rom = hirom_image(0x20000);
        rom[0x3000..0x300b].copy_from_slice(&[
            0x02, 0x41, 0x42, // 0
            0x00, // 1
            0x01, 0x43, // 2
            0x03, 0x44, 0x45, 0x46, // 3
            0x00, // 4
        ]);
        Cartridge::from_bytes(rom).unwrap()
    }

    fn pascal_params() -> PascalParams {
        PascalParams {
            address: Addr24::from(0xc03000),
            ids: 0..5,
        }
    }

    #[test]
    fn test_pascal_strings() {
        let rom = pascal_rom();
        let mut strings = PascalStrings::new(&rom, pascal_params());
        let result = collect(strings.all_strings().unwrap());
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].id, 0);
        assert_eq!(result[0].codes, [0x41, 0x42]);
        assert_eq!(result[0].span, 3);
        assert_eq!(result[1].id, 2);
        assert_eq!(result[1].address, Addr24::from(0xc03004));
        assert_eq!(result[1].codes, [0x43]);
        assert_eq!(result[2].id, 3);
        assert_eq!(result[2].address, Addr24::from(0xc03006));
        assert_eq!(result[2].codes, [0x44, 0x45, 0x46]);
        assert!(result.iter().all(|s| s.shift.is_none()));
    }

    #[test]
    fn test_pascal_zero_length_advances_one_byte() {
        let rom = pascal_rom();
        let mut strings = PascalStrings::new(&rom, pascal_params());
        assert!(collect(strings.strings(1, 2).unwrap()).is_empty());
        let result = collect(strings.strings(2, 3).unwrap());
        assert_eq!(result[0].address, Addr24::from(0xc03004));
    }

    #[test]
    fn test_pascal_out_of_rom() {
        let rom = pascal_rom();
        let mut strings = PascalStrings::new(
            &rom,
            PascalParams {
                address: Addr24::from(0xc1ffff),
                ids: 0..2,
            },
        );
        // the length byte is zero, the next entry lies outside of the image
        let mut iter = strings.all_strings().unwrap();
        assert!(matches!(iter.next(), Some(Err(DecodeError::OutOfRom(_)))));
        assert!(iter.next().is_none());
    }

    fn c_rom() -> Cartridge {
        let mut rom = lorom_image(0x20000);
        // straddle the end of the first bank
        rom[0x7ffa..0x8007].copy_from_slice(&[
            0x41, 0x42, 0xff, // 0
            0x1f, 0x05, 0x43, 0xff, // 1
            0xff, // 2
            0x44, 0x1f, 0xff, 0x45, 0xfe, // 3
        ]);
        Cartridge::from_bytes(rom).unwrap()
    }

    fn c_params() -> CParams {
        CParams {
            address: MemoryMapping::LoRom.from_rom(0x7ffa),
            ids: 0..4,
            delimiters: vec![0xff, 0xfe],
            prefixes: vec![0x1f],
        }
    }

    #[test]
    fn test_c_strings() {
        let rom = c_rom();
        let mut strings = CStrings::new(&rom, c_params());
        let result = collect(strings.all_strings().unwrap());
        let codes: Vec<_> = result.iter().map(|s| s.codes.clone()).collect();
        assert_eq!(
            codes,
            [
                vec![0x41, 0x42, 0xff],
                vec![0x1f05, 0x43, 0xff],
                vec![0xff],
                vec![0x44, 0x1fff, 0x45, 0xfe],
            ]
        );
        assert_eq!(result[0].address, Addr24::from(0x00fffa));
        assert_eq!(result[1].address, Addr24::from(0x00fffd));
        assert_eq!(result[1].span, 4);
        assert_eq!(result[2].address, Addr24::from(0x018001));
        assert_eq!(result[3].address, Addr24::from(0x018002));
    }

    #[test]
    fn test_c_strings_end_with_single_delimiter() {
        let rom = c_rom();
        let mut strings = CStrings::new(&rom, c_params());
        for string in collect(strings.all_strings().unwrap()) {
            let (last, rest) = string.codes.split_last().unwrap();
            assert!(strings.params.delimiters.contains(last));
            assert!(rest.iter().all(|c| !strings.params.delimiters.contains(c)));
        }
    }

    #[test]
    fn test_c_strings_window() {
        let rom = c_rom();
        let mut strings = CStrings::new(&rom, c_params());
        let result = collect(strings.strings(2, 4).unwrap());
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, 2);
        assert_eq!(result[1].codes.last(), Some(&0xfe));
    }

    #[test]
    fn test_invalid_ranges() {
        let rom = c_rom();
        let mut strings = CStrings::new(&rom, c_params());
        for (first, last) in [(2, 2), (3, 1), (0, 5), (4, 5)] {
            assert!(matches!(
                strings.strings(first, last),
                Err(DecodeError::InvalidRange { .. })
            ));
        }
        let mut strings = PascalStrings::new(&rom, pascal_params());
        assert!(strings.strings(1, 0).is_err());
    }
}
