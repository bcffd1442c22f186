//! Rendering of character codes

use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;
use thiserror::Error;
use toml::value::{Table, Value};

const DAKUTEN: char = '゛';
const HANDAKUTEN: char = '゜';

#[derive(Debug, Error)]
pub enum CharmapLoadError {
    #[error("unable to read charmap ({0})")]
    Io(#[from] std::io::Error),
    #[error("charmap parsing error: {0}")]
    De(#[from] toml::de::Error),
    #[error("expected type `{expected}` for `{field}`, got `{got}`")]
    WrongType {
        field: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("invalid character code `{0}`")]
    InvalidCode(String),
    #[error("unknown field `{0}`")]
    UnknownField(String),
}

/// Mapping from character codes to glyphs
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Charmap {
    glyphs: HashMap<u16, String>,
    /// merge dakuten markers into the following kana
    pub dakuten: bool,
}

impl Charmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, code: u16, glyph: S) {
        self.glyphs.insert(code, glyph.into());
    }

    pub fn get(&self, code: u16) -> Option<&str> {
        self.glyphs.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CharmapLoadError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Parse a charmap document:
    ///
    /// ```toml
    /// dakuten = true
    ///
    /// [glyphs]
    /// 0x01 = "A"
    /// "1f05" = "剣"
    /// ```
    pub fn parse(source: &str) -> Result<Self, CharmapLoadError> {
        let main: Table = toml::de::from_str(source)?;
        let mut charmap = Self::new();
        for (key, val) in main.iter() {
            match (key.as_str(), val) {
                ("dakuten", Value::Boolean(flag)) => charmap.dakuten = *flag,
                ("glyphs", Value::Table(glyphs)) => {
                    for (code, glyph) in glyphs.iter() {
                        let glyph = match glyph {
                            Value::String(glyph) => glyph,
                            val => {
                                return Err(CharmapLoadError::WrongType {
                                    field: code.clone(),
                                    expected: "String",
                                    got: val.type_str(),
                                })
                            }
                        };
                        charmap.insert(parse_code(code)?, glyph.as_str());
                    }
                }
                ("dakuten", val) => {
                    return Err(CharmapLoadError::WrongType {
                        field: key.clone(),
                        expected: "Boolean",
                        got: val.type_str(),
                    })
                }
                ("glyphs", val) => {
                    return Err(CharmapLoadError::WrongType {
                        field: key.clone(),
                        expected: "Table",
                        got: val.type_str(),
                    })
                }
                _ => return Err(CharmapLoadError::UnknownField(key.clone())),
            }
        }
        Ok(charmap)
    }
}

impl FromIterator<(u16, String)> for Charmap {
    fn from_iter<I: IntoIterator<Item = (u16, String)>>(iter: I) -> Self {
        Self {
            glyphs: iter.into_iter().collect(),
            dakuten: false,
        }
    }
}

fn parse_code(code: &str) -> Result<u16, CharmapLoadError> {
    let digits = code
        .strip_prefix("0x")
        .or_else(|| code.strip_prefix("0X"))
        .unwrap_or(code);
    u16::from_str_radix(digits, 16).map_err(|_| CharmapLoadError::InvalidCode(code.to_string()))
}

/// Render `codes` through `charmap`.
///
/// A single trailing delimiter is dropped; unmapped codes are written as
/// `[XX]`.
pub fn get_text(codes: &[u16], charmap: &Charmap, delimiters: &[u16]) -> String {
    let codes = match codes.split_last() {
        Some((last, rest)) if delimiters.contains(last) => rest,
        _ => codes,
    };
    let mut text = String::new();
    for &code in codes {
        match charmap.get(code) {
            Some(glyph) => text.push_str(glyph),
            None => {
                let _ = write!(text, "[{code:02X}]");
            }
        }
    }
    if charmap.dakuten {
        process_dakuten(&text)
    } else {
        text
    }
}

/// Render codes as space separated hex
pub fn get_hex(codes: &[u16]) -> String {
    codes
        .iter()
        .map(|code| format!("{code:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn voiced(c: char) -> Option<char> {
    const UNVOICED: &str = "かきくけこさしすせそたちつてとはひふへほカキクケコサシスセソタチツテトハヒフヘホウ";
    const VOICED: &str = "がぎぐげござじずぜぞだぢづでどばびぶべぼガギグゲゴザジズゼゾダヂヅデドバビブベボヴ";
    UNVOICED
        .chars()
        .position(|u| u == c)
        .and_then(|i| VOICED.chars().nth(i))
}

fn semi_voiced(c: char) -> Option<char> {
    const PLAIN: &str = "はひふへほハヒフヘホ";
    const SEMI_VOICED: &str = "ぱぴぷぺぽパピプペポ";
    PLAIN
        .chars()
        .position(|p| p == c)
        .and_then(|i| SEMI_VOICED.chars().nth(i))
}

/// Merge a dakuten or handakuten marker with the kana following it.
///
/// Markers that are not followed by a matching kana are kept as they are.
pub fn process_dakuten(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let merged = match (c, chars.peek()) {
            (DAKUTEN, Some(&next)) => voiced(next),
            (HANDAKUTEN, Some(&next)) => semi_voiced(next),
            _ => None,
        };
        match merged {
            Some(merged) => {
                chars.next();
                result.push(merged)
            }
            None => result.push(c),
        }
    }
    result
}
