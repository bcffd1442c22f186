//! Fixed-size record tables

use crate::addr::Addr24;
use crate::bits::{get_bits, get_int};
use crate::cartridge::Cartridge;
use crate::error::{DecodeError, TableError};
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    U24,
    /// right-justified bit field of the 3-byte window at the field offset
    Bits(u32),
    /// 24-bit CPU address
    Addr,
}

impl FieldKind {
    /// Resolve a type name; `mask` is only used by `bits`
    pub fn from_name(name: &str, mask: Option<u32>) -> Result<Self, TableError> {
        Ok(match name {
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u24" => Self::U24,
            "addr" => Self::Addr,
            "bits" => match mask {
                Some(mask) if mask != 0 => Self::Bits(mask),
                _ => return Err(TableError::MissingMask),
            },
            _ => return Err(TableError::UnknownFieldType(name.to_string())),
        })
    }

    /// Bytes covered starting at the field offset
    pub const fn size(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U24 | Self::Bits(_) | Self::Addr => 3,
        }
    }

    fn read(&self, bytes: &[u8], offset: usize) -> Value {
        match self {
            Self::U8 | Self::U16 | Self::U24 => {
                Value::Int(get_int(bytes, offset, self.size()))
            }
            Self::Bits(mask) => Value::Int(get_bits(bytes, offset, *mask)),
            Self::Addr => Value::Addr(get_int(bytes, offset, 3).into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub offset: usize,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Int(u32),
    Addr(Addr24),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Addr(addr) => write!(f, "{addr:06X}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableParams {
    pub address: Addr24,
    pub record_size: usize,
    pub ids: Range<u32>,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: u32,
    pub address: Addr24,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone)]
pub struct RecordTable<'rom> {
    rom: &'rom Cartridge,
    params: TableParams,
}

impl<'rom> RecordTable<'rom> {
    pub fn new(rom: &'rom Cartridge, params: TableParams) -> Self {
        Self { rom, params }
    }

    pub fn params(&self) -> &TableParams {
        &self.params
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.params.fields.iter().map(|field| field.name.as_str())
    }

    pub fn record(&self, id: u32) -> Result<Record, DecodeError> {
        DecodeError::check_range(id, id.saturating_add(1), &self.params.ids)?;
        let index = (id - self.params.ids.start) as usize;
        let mapping = self.rom.mapping();
        let address = mapping.offset_address(self.params.address, index * self.params.record_size);
        let bytes = self.rom.read(address, self.params.record_size);
        if bytes.len() < self.params.record_size {
            return Err(DecodeError::OutOfRom(address));
        }
        let values = self
            .params
            .fields
            .iter()
            .map(|field| field.kind.read(bytes, field.offset))
            .collect();
        Ok(Record {
            id,
            address,
            values,
        })
    }

    pub fn records(
        &self,
        first: u32,
        last: u32,
    ) -> Result<impl Iterator<Item = Result<Record, DecodeError>> + '_, DecodeError> {
        DecodeError::check_range(first, last, &self.params.ids)?;
        Ok((first..last).map(move |id| self.record(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::tests::hirom_image;

    fn table_rom() -> Cartridge {
        let mut rom = hirom_image(0x20000);
        rom[0x4000..0x4008].copy_from_slice(&[0x10, 0x34, 0x12, 0xa5, 0x00, 0x80, 0xc4, 0xff]);
        rom[0x4008..0x4010].copy_from_slice(&[0x20, 0x00, 0x01, 0x5a, 0x36, 0xbd, 0xfc, 0xff]);
        Cartridge::from_bytes(rom).unwrap()
    }

    fn fields() -> Vec<Field> {
        [
            ("power", 0, "u8"),
            ("price", 1, "u16"),
            ("target", 4, "addr"),
        ]
        .into_iter()
        .map(|(name, offset, ty)| Field {
            name: name.to_string(),
            offset,
            kind: FieldKind::from_name(ty, None).unwrap(),
        })
        .chain([Field {
            name: "flags".to_string(),
            offset: 2,
            kind: FieldKind::from_name("bits", Some(0x00f000)).unwrap(),
        }])
        .collect()
    }

    fn params() -> TableParams {
        TableParams {
            address: Addr24::from(0xc04000),
            record_size: 8,
            ids: 0x10..0x12,
            fields: fields(),
        }
    }

    #[test]
    fn test_records() {
        let rom = table_rom();
        let table = RecordTable::new(&rom, params());
        let records = table
            .records(0x10, 0x12)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].address, Addr24::from(0xc04000));
        assert_eq!(
            records[0].values,
            [
                Value::Int(0x10),
                Value::Int(0x1234),
                Value::Addr(Addr24::from(0xc48000)),
                Value::Int(0xa),
            ]
        );
        assert_eq!(records[1].id, 0x11);
        assert_eq!(records[1].values[2], Value::Addr(Addr24::from(0xfcbd36)));
        assert_eq!(records[1].values[2].to_string(), "FCBD36");
        assert_eq!(
            table.field_names().collect::<Vec<_>>(),
            ["power", "price", "target", "flags"]
        );
    }

    #[test]
    fn test_field_kinds() {
        assert_eq!(FieldKind::from_name("u24", None).unwrap(), FieldKind::U24);
        assert_eq!(FieldKind::U16.size(), 2);
        assert!(matches!(
            FieldKind::from_name("float", None),
            Err(TableError::UnknownFieldType(name)) if name == "float"
        ));
        assert!(matches!(
            FieldKind::from_name("bits", None),
            Err(TableError::MissingMask)
        ));
    }

    #[test]
    fn test_record_range() {
        let rom = table_rom();
        let table = RecordTable::new(&rom, params());
        assert!(table.records(0, 2).is_err());
        assert!(table.records(0x11, 0x11).is_err());
        assert!(table.record(0x12).is_err());
    }
}
