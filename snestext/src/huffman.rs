//! Huffman compressed message decoding
//!
//! Messages are stored as one continuous bit stream. A group index maps every
//! block of consecutive message ids to a bit position inside the stream; the
//! remaining messages of a block are reached by decoding their predecessors.
//! The tree is stored as two parallel tables of little-endian words, one
//! followed for `0` bits and one for `1` bits.

use crate::addr::Addr24;
use crate::bits::{get_bits, get_int};
use crate::cartridge::Cartridge;
use crate::error::DecodeError;
use crate::mapping::MemoryMapping;
use crate::strings::{DecodedString, StringGenerator, Strings};
use std::ops::Range;

const SHIFT_BITS_LEN: usize = 8;
const GROUP_RECORD_LEN: usize = 3;
const GROUP_OFFSET_MASK: u32 = 0xff_fff8;

/// Position of the next bit to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub address: Addr24,
    /// single bit mask selecting the next bit of the byte at `address`
    pub shift: u8,
}

impl Cursor {
    pub const fn new(address: Addr24, shift: u8) -> Self {
        Self { address, shift }
    }
}

/// Bit order and tree layout used by a title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Bits are consumed from 0x80 down to 0x01, leaves have the top bit
    /// clear and groups hold 8 messages
    MsbFirst,
    /// Bits are consumed from 0x01 up to 0x80, leaves have the top bit set,
    /// branches store halved node indices and groups hold 16 messages
    LsbFirst,
}

impl Scheme {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "msb-first" => Some(Self::MsbFirst),
            "lsb-first" => Some(Self::LsbFirst),
            _ => None,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::MsbFirst => "msb-first",
            Self::LsbFirst => "lsb-first",
        }
    }

    /// Split a message id into the number of messages to skip and the byte
    /// offset of its group record
    pub const fn split_id(&self, id: u32) -> (u32, usize) {
        match self {
            Self::MsbFirst => (id & 7, (id >> 3) as usize * GROUP_RECORD_LEN),
            Self::LsbFirst => (id & 15, (id >> 4) as usize * GROUP_RECORD_LEN),
        }
    }

    pub const fn is_leaf(&self, node: u16) -> bool {
        match self {
            Self::MsbFirst => node & 0x8000 == 0,
            Self::LsbFirst => node & 0x8000 != 0,
        }
    }

    pub const fn next_node(&self, node: u16) -> usize {
        match self {
            Self::MsbFirst => (node & 0x7fff) as usize,
            Self::LsbFirst => ((node & 0x1fff) as usize) << 1,
        }
    }

    /// The shift of a byte none of whose bits have been consumed
    pub const fn first_shift(&self) -> u8 {
        match self {
            Self::MsbFirst => 0x80,
            Self::LsbFirst => 0x01,
        }
    }

    pub const fn advance(&self, mapping: MemoryMapping, cursor: Cursor) -> Cursor {
        let shift = match self {
            Self::MsbFirst => cursor.shift >> 1,
            Self::LsbFirst => cursor.shift << 1,
        };
        if shift == 0 {
            Cursor::new(mapping.increment_address(cursor.address), self.first_shift())
        } else {
            Cursor::new(cursor.address, shift)
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Location and layout of one kind of compressed messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanParams {
    pub scheme: Scheme,
    pub delimiters: Vec<u16>,
    pub group_table: Addr24,
    pub shift_bits: Addr24,
    pub data: Addr24,
    pub off_branch: Addr24,
    pub on_branch: Addr24,
    /// index of the root node in both branch tables
    pub root: usize,
    /// bytes read for each bit test
    pub read_size: usize,
    pub mask: u16,
    pub ids: Range<u32>,
}

#[derive(Debug, Clone)]
struct Tables {
    shift_bits: [u8; SHIFT_BITS_LEN],
    off_branch: Vec<u8>,
    on_branch: Vec<u8>,
}

impl Tables {
    fn load(rom: &Cartridge, params: &HuffmanParams) -> Self {
        assert!(
            !params.ids.is_empty(),
            "degenerate message id span {:#x?}",
            params.ids
        );
        let mut shift_bits = [0; SHIFT_BITS_LEN];
        let bytes = rom.read(params.shift_bits, SHIFT_BITS_LEN);
        assert_eq!(
            bytes.len(),
            SHIFT_BITS_LEN,
            "shift bit array at {} is truncated",
            params.shift_bits
        );
        shift_bits.copy_from_slice(bytes);

        let len = params.root + 2;
        let off_branch = rom.read(params.off_branch, len).to_vec();
        let on_branch = rom.read(params.on_branch, len).to_vec();
        assert_eq!(off_branch.len(), len, "off-branch table at {} is truncated", params.off_branch);
        assert_eq!(on_branch.len(), len, "on-branch table at {} is truncated", params.on_branch);
        log::debug!(
            "loaded huffman tables (root {:#x}, shift bits {:02x?})",
            params.root,
            shift_bits
        );
        Self {
            shift_bits,
            off_branch,
            on_branch,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Session<'a> {
    rom: &'a Cartridge,
    params: &'a HuffmanParams,
    tables: &'a Tables,
}

impl Session<'_> {
    fn mapping(&self) -> MemoryMapping {
        self.rom.mapping()
    }

    /// A walk from the root can visit every node at most once
    fn max_depth(&self) -> usize {
        self.params.root / 2 + 2
    }

    fn decode_char(&self, mut cursor: Cursor) -> Result<(Cursor, u16), DecodeError> {
        let scheme = self.params.scheme;
        let start = cursor.address;
        let mut node = self.params.root;
        for _ in 0..self.max_depth() {
            if !self.rom.contains(cursor.address) {
                return Err(DecodeError::OutOfRom(cursor.address));
            }
            let size = self.params.read_size;
            let data = get_int(self.rom.read(cursor.address, size), 0, size);
            let bit = data & u32::from(cursor.shift);
            cursor = scheme.advance(self.mapping(), cursor);
            let table = if bit != 0 {
                &self.tables.on_branch
            } else {
                &self.tables.off_branch
            };
            let value = get_int(table, node, 2) as u16;
            if scheme.is_leaf(value) {
                return Ok((cursor, value & self.params.mask));
            }
            node = scheme.next_node(value);
        }
        Err(DecodeError::Unterminated(start))
    }

    fn decode_message(&self, mut cursor: Cursor) -> Result<(Cursor, Vec<u16>), DecodeError> {
        let mut codes = vec![];
        loop {
            let (next, code) = self.decode_char(cursor)?;
            cursor = next;
            codes.push(code);
            if self.params.delimiters.contains(&code) {
                return Ok((cursor, codes));
            }
        }
    }

    fn locate(&self, id: u32) -> Result<Cursor, DecodeError> {
        let mapping = self.mapping();
        let (count, group) = self.params.scheme.split_id(id);
        let record_addr = mapping.offset_address(self.params.group_table, group);
        let record = self.rom.read(record_addr, GROUP_RECORD_LEN);
        if record.len() < GROUP_RECORD_LEN {
            return Err(DecodeError::OutOfRom(record_addr));
        }
        let shift = self.tables.shift_bits[usize::from(record[0] & 7)];
        let offset = get_bits(record, 0, GROUP_OFFSET_MASK) as usize;
        let mut cursor = Cursor::new(mapping.offset_address(self.params.data, offset), shift);
        log::debug!(
            "message {:#x}: group record at {}, skipping {} from {} ({:02x})",
            id,
            record_addr,
            count,
            cursor.address,
            cursor.shift
        );
        for _ in 0..count {
            cursor = self.decode_message(cursor)?.0;
        }
        Ok(cursor)
    }

    /// Number of source bytes touched between `start` and `end`
    fn span(&self, start: Cursor, end: Cursor) -> usize {
        let mapping = self.mapping();
        let bytes = mapping
            .from_cpu(end.address)
            .saturating_sub(mapping.from_cpu(start.address));
        if end.shift == self.params.scheme.first_shift() {
            bytes
        } else {
            bytes + 1
        }
    }
}

/// Decoder for one kind of compressed messages of a cartridge
///
/// The shift bit array and the branch tables are read on first use and kept
/// for the lifetime of the decoder.
#[derive(Debug, Clone)]
pub struct HuffmanDecoder<'rom> {
    rom: &'rom Cartridge,
    params: HuffmanParams,
    tables: Option<Tables>,
}

impl<'rom> HuffmanDecoder<'rom> {
    pub fn new(rom: &'rom Cartridge, params: HuffmanParams) -> Self {
        Self {
            rom,
            params,
            tables: None,
        }
    }

    pub fn params(&self) -> &HuffmanParams {
        &self.params
    }

    fn session(&mut self) -> Session<'_> {
        let tables = self
            .tables
            .get_or_insert_with(|| Tables::load(self.rom, &self.params));
        Session {
            rom: self.rom,
            params: &self.params,
            tables,
        }
    }

    /// Find the cursor at which message `id` starts
    pub fn locate(&mut self, id: u32) -> Result<Cursor, DecodeError> {
        DecodeError::check_range(id, id.saturating_add(1), &self.params.ids)?;
        self.session().locate(id)
    }

    /// Decode a single character at `cursor`
    pub fn decode_char(&mut self, cursor: Cursor) -> Result<(Cursor, u16), DecodeError> {
        self.session().decode_char(cursor)
    }

    /// Decode characters up to and including the next delimiter
    pub fn decode_message(&mut self, cursor: Cursor) -> Result<(Cursor, Vec<u16>), DecodeError> {
        self.session().decode_message(cursor)
    }

    /// Decode the messages `first..last` in order
    pub fn messages(&mut self, first: u32, last: u32) -> Result<Messages<'_>, DecodeError> {
        DecodeError::check_range(first, last, &self.params.ids)?;
        let session = self.session();
        let cursor = session.locate(first)?;
        Ok(Messages {
            session,
            cursor: Some(cursor),
            id: first,
            last,
        })
    }
}

impl StringGenerator for HuffmanDecoder<'_> {
    fn ids(&self) -> Range<u32> {
        self.params.ids.clone()
    }

    fn delimiters(&self) -> &[u16] {
        &self.params.delimiters
    }

    fn strings(&mut self, first: u32, last: u32) -> Result<Strings<'_>, DecodeError> {
        Ok(Box::new(self.messages(first, last)?))
    }
}

/// Iterator over consecutive messages
///
/// Every message starts where the previous one ended; after an error no more
/// messages are produced.
#[derive(Debug)]
pub struct Messages<'a> {
    session: Session<'a>,
    cursor: Option<Cursor>,
    id: u32,
    last: u32,
}

impl Iterator for Messages<'_> {
    type Item = Result<DecodedString, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.id >= self.last {
            return None;
        }
        let start = self.cursor.take()?;
        let id = self.id;
        self.id += 1;
        Some(self.session.decode_message(start).map(|(end, codes)| {
            log::trace!("message {id:#x} at {}: {codes:02x?}", start.address);
            self.cursor = Some(end);
            DecodedString {
                id,
                address: start.address,
                shift: Some(start.shift),
                span: self.session.span(start, end),
                codes,
            }
        }))
    }
}
