//! Text and record extraction from SNES cartridge images
//!
//! A [`cartridge::Cartridge`] owns the image and its detected
//! [`mapping::MemoryMapping`]. Compressed messages are read with
//! [`huffman::HuffmanDecoder`], plain string tables with
//! [`strings::PascalStrings`] and [`strings::CStrings`]; all of them implement
//! [`strings::StringGenerator`]. [`text`] turns character codes into text.

pub mod addr;
pub mod bits;
pub mod cartridge;
pub mod error;
pub mod huffman;
pub mod mapping;
pub mod strings;
pub mod table;
pub mod text;

pub use error::{Error, Result};
