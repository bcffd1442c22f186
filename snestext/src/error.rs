use crate::addr::Addr24;
use crate::cartridge::ReadRomError;
use crate::text::CharmapLoadError;
use std::ops::Range;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid id range {first:#x}..{last:#x} (declared span is {span:#x?})")]
    InvalidRange {
        first: u32,
        last: u32,
        span: Range<u32>,
    },
    #[error("address {0} lies outside of the ROM image")]
    OutOfRom(Addr24),
    #[error("huffman tree walk starting at {0} did not reach a leaf")]
    Unterminated(Addr24),
}

impl DecodeError {
    /// Check `first..last` against the declared `span`
    pub fn check_range(first: u32, last: u32, span: &Range<u32>) -> std::result::Result<(), Self> {
        if first < last && span.start <= first && last <= span.end {
            Ok(())
        } else {
            Err(Self::InvalidRange {
                first,
                last,
                span: span.clone(),
            })
        }
    }
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("unknown field type `{0}`")]
    UnknownFieldType(String),
    #[error("field type `bits` requires a non-zero mask")]
    MissingMask,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rom(#[from] ReadRomError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Charmap(#[from] CharmapLoadError),
}
