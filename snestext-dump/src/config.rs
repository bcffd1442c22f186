use snestext::addr::Addr24;
use snestext::error::TableError;
use snestext::huffman::{HuffmanParams, Scheme};
use snestext::strings::{CParams, PascalParams};
use snestext::table::{Field, FieldKind, TableParams};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::value::{Table, Value};

static CONFIG_FILE_PATHS: &[(bool, &str)] = &[
    (true, ".config/snestext/config.toml"),
    (true, ".config/snestext.toml"),
    (false, "/etc/snestext.toml"),
];

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("unable to read config file ({0})")]
    Io(#[from] std::io::Error),
    #[error("config file parsing error: {0}")]
    De(#[from] toml::de::Error),
    #[error("expected type `{expected}` for `{location}`, got `{got}`")]
    WrongType {
        location: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("unknown field `{0}`")]
    UnknownField(String),
    #[error("missing attribute `{attr}` in `{location}`")]
    RequiredAttr { location: String, attr: &'static str },
    #[error("unknown value \"{value}\" for field `{field}`")]
    UnknownValue { field: String, value: String },
    #[error("undefined {ty} `{name}`")]
    UndefinedName { name: String, ty: &'static str },
    #[error("invalid field `{field}` in `{location}` ({source})")]
    Field {
        location: String,
        field: String,
        source: TableError,
    },
}

macro_rules! getval {
    ($val:expr, $ty:ident, $location:expr) => {
        match $val {
            Value::$ty(val) => Ok(val),
            val => Err(ConfigLoadError::WrongType {
                location: $location,
                expected: stringify!($ty),
                got: val.type_str(),
            }),
        }
    };
}

/// A table of the config file together with its dotted location
struct Section<'a> {
    location: String,
    map: &'a Table,
}

impl<'a> Section<'a> {
    fn new(location: String, map: &'a Table, allowed: &[&str]) -> Result<Self, ConfigLoadError> {
        if let Some(key) = map.keys().find(|key| !allowed.contains(&key.as_str())) {
            return Err(ConfigLoadError::UnknownField(format!("{location}.{key}")));
        }
        Ok(Self { location, map })
    }

    fn child(&self, key: &str) -> String {
        format!("{}.{key}", self.location)
    }

    fn get(&self, attr: &'static str) -> Result<&'a Value, ConfigLoadError> {
        self.map.get(attr).ok_or_else(|| ConfigLoadError::RequiredAttr {
            location: self.location.clone(),
            attr,
        })
    }

    fn int_value(&self, attr: &str, val: &Value, max: i64) -> Result<u32, ConfigLoadError> {
        let int = *getval!(val, Integer, self.child(attr))?;
        if (0..=max).contains(&int) {
            Ok(int as u32)
        } else {
            Err(ConfigLoadError::UnknownValue {
                field: self.child(attr),
                value: int.to_string(),
            })
        }
    }

    fn int(&self, attr: &'static str, max: i64) -> Result<u32, ConfigLoadError> {
        self.int_value(attr, self.get(attr)?, max)
    }

    fn addr(&self, attr: &'static str) -> Result<Addr24, ConfigLoadError> {
        self.int(attr, 0xff_ffff).map(Addr24::from)
    }

    fn string(&self, attr: &'static str) -> Result<&'a String, ConfigLoadError> {
        getval!(self.get(attr)?, String, self.child(attr))
    }

    fn int_list(&self, attr: &'static str, max: i64) -> Result<Vec<u32>, ConfigLoadError> {
        match self.map.get(attr) {
            None => Ok(vec![]),
            Some(val) => getval!(val, Array, self.child(attr))?
                .iter()
                .map(|val| self.int_value(attr, val, max))
                .collect(),
        }
    }

    fn ids(&self) -> Result<Range<u32>, ConfigLoadError> {
        let ids = getval!(self.get("ids")?, Array, self.child("ids"))?;
        match ids.as_slice() {
            [first, last] => {
                let first = self.int_value("ids", first, i64::from(u32::MAX))?;
                let last = self.int_value("ids", last, i64::from(u32::MAX))?;
                if first < last {
                    Ok(first..last)
                } else {
                    Err(ConfigLoadError::UnknownValue {
                        field: self.child("ids"),
                        value: format!("[{first}, {last}]"),
                    })
                }
            }
            _ => Err(ConfigLoadError::UnknownValue {
                field: self.child("ids"),
                value: format!("array of length {}", ids.len()),
            }),
        }
    }

    fn delimiters(&self) -> Result<Vec<u16>, ConfigLoadError> {
        let delimiters = self.int_list("delimiters", 0xffff)?;
        if delimiters.is_empty() {
            return Err(ConfigLoadError::RequiredAttr {
                location: self.location.clone(),
                attr: "delimiters",
            });
        }
        Ok(delimiters.into_iter().map(|code| code as u16).collect())
    }

    fn tables(&self, attr: &str) -> Result<Vec<(String, Section<'a>)>, ConfigLoadError> {
        match self.map.get(attr) {
            None => Ok(vec![]),
            Some(val) => getval!(val, Table, self.child(attr))?
                .iter()
                .map(|(key, val)| {
                    let location = format!("{}.{key}", self.child(attr));
                    let map = getval!(val, Table, location.clone())?;
                    Ok::<_, ConfigLoadError>((key.clone(), Section { location, map }))
                })
                .collect(),
        }
    }
}

/// How a string group is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringGroup {
    Pascal(PascalParams),
    C(CParams),
}

impl StringGroup {
    fn load(section: Section) -> Result<Self, ConfigLoadError> {
        let kind = section.string("kind")?;
        match kind.as_str() {
            "pascal" => {
                let section =
                    Section::new(section.location, section.map, &["kind", "address", "ids"])?;
                Ok(Self::Pascal(PascalParams {
                    address: section.addr("address")?,
                    ids: section.ids()?,
                }))
            }
            "c" => {
                let section = Section::new(
                    section.location,
                    section.map,
                    &["kind", "address", "ids", "delimiters", "prefixes"],
                )?;
                Ok(Self::C(CParams {
                    address: section.addr("address")?,
                    ids: section.ids()?,
                    delimiters: section.delimiters()?,
                    prefixes: section
                        .int_list("prefixes", 0xff)?
                        .into_iter()
                        .map(|prefix| prefix as u8)
                        .collect(),
                }))
            }
            _ => Err(ConfigLoadError::UnknownValue {
                field: section.child("kind"),
                value: kind.clone(),
            }),
        }
    }
}

fn load_messages(section: Section) -> Result<HuffmanParams, ConfigLoadError> {
    let section = Section::new(
        section.location,
        section.map,
        &[
            "scheme",
            "delimiters",
            "group-table",
            "shift-bits",
            "data",
            "off-branch",
            "on-branch",
            "root",
            "read-size",
            "mask",
            "ids",
        ],
    )?;
    let scheme = section.string("scheme")?;
    let scheme = Scheme::from_name(scheme).ok_or_else(|| ConfigLoadError::UnknownValue {
        field: section.child("scheme"),
        value: scheme.clone(),
    })?;
    let read_size = match section.map.get("read-size") {
        Some(val) => section.int_value("read-size", val, 2)?,
        None => 1,
    };
    if read_size == 0 {
        return Err(ConfigLoadError::UnknownValue {
            field: section.child("read-size"),
            value: read_size.to_string(),
        });
    }
    let mask = match section.map.get("mask") {
        Some(val) => section.int_value("mask", val, 0xffff)? as u16,
        None => 0x7fff,
    };
    Ok(HuffmanParams {
        scheme,
        delimiters: section.delimiters()?,
        group_table: section.addr("group-table")?,
        shift_bits: section.addr("shift-bits")?,
        data: section.addr("data")?,
        off_branch: section.addr("off-branch")?,
        on_branch: section.addr("on-branch")?,
        root: section.int("root", 0xfffe)? as usize,
        read_size: read_size as usize,
        mask,
        ids: section.ids()?,
    })
}

fn load_table(section: Section) -> Result<TableParams, ConfigLoadError> {
    let section = Section::new(
        section.location,
        section.map,
        &["address", "record-size", "ids", "fields"],
    )?;
    let fields = getval!(section.get("fields")?, Array, section.child("fields"))?
        .iter()
        .enumerate()
        .map(|(i, val)| {
            let location = format!("{}[{i}]", section.child("fields"));
            let map = getval!(val, Table, location.clone())?;
            let field = Section::new(location, map, &["name", "offset", "type", "mask"])?;
            let name = field.string("name")?.clone();
            let ty = field.string("type")?;
            let mask = field
                .map
                .get("mask")
                .map(|val| field.int_value("mask", val, 0xff_ffff))
                .transpose()?;
            let kind = FieldKind::from_name(ty, mask).map_err(|source| ConfigLoadError::Field {
                location: field.location.clone(),
                field: name.clone(),
                source,
            })?;
            Ok::<_, ConfigLoadError>(Field {
                name,
                offset: field.int("offset", 0xffff)? as usize,
                kind,
            })
        })
        .collect::<Result<Vec<_>, ConfigLoadError>>()?;
    Ok(TableParams {
        address: section.addr("address")?,
        record_size: section.int("record-size", 0xffff)? as usize,
        ids: section.ids()?,
        fields,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub rom: PathBuf,
    pub charmap: Option<PathBuf>,
    pub messages: BTreeMap<String, HuffmanParams>,
    pub strings: BTreeMap<String, StringGroup>,
    pub tables: BTreeMap<String, TableParams>,
}

impl Title {
    fn load(section: Section, base: &Path) -> Result<Self, ConfigLoadError> {
        let section = Section::new(
            section.location,
            section.map,
            &["rom", "charmap", "messages", "strings", "tables"],
        )?;
        let rom = base.join(section.string("rom")?);
        let charmap = section
            .map
            .get("charmap")
            .map(|val| getval!(val, String, section.child("charmap")))
            .transpose()?
            .map(|path| base.join(path));
        Ok(Self {
            rom,
            charmap,
            messages: section
                .tables("messages")?
                .into_iter()
                .map(|(key, val)| load_messages(val).map(|val| (key, val)))
                .collect::<Result<_, _>>()?,
            strings: section
                .tables("strings")?
                .into_iter()
                .map(|(key, val)| StringGroup::load(val).map(|val| (key, val)))
                .collect::<Result<_, _>>()?,
            tables: section
                .tables("tables")?
                .into_iter()
                .map(|(key, val)| load_table(val).map(|val| (key, val)))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn get_messages(&self, kind: &str) -> Result<&HuffmanParams, ConfigLoadError> {
        self.messages
            .get(kind)
            .ok_or_else(|| ConfigLoadError::UndefinedName {
                name: kind.to_string(),
                ty: "message kind",
            })
    }

    pub fn get_strings(&self, group: &str) -> Result<&StringGroup, ConfigLoadError> {
        self.strings
            .get(group)
            .ok_or_else(|| ConfigLoadError::UndefinedName {
                name: group.to_string(),
                ty: "string group",
            })
    }

    pub fn get_table(&self, name: &str) -> Result<&TableParams, ConfigLoadError> {
        self.tables
            .get(name)
            .ok_or_else(|| ConfigLoadError::UndefinedName {
                name: name.to_string(),
                ty: "record table",
            })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    titles: HashMap<String, Title>,
}

impl Config {
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigLoadError> {
        match path.or_else(Self::seek_config_path) {
            Some(path) => {
                log::info!("loading config file `{}`", path.display());
                Self::load_from_file(path)
            }
            None => {
                log::warn!("no config file found");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&std::fs::read_to_string(path)?, base)
    }

    /// Parse a config document; relative paths are resolved against `base`
    pub fn parse(source: &str, base: &Path) -> Result<Self, ConfigLoadError> {
        let main: Table = toml::de::from_str(source)?;
        let mut titles = HashMap::new();
        for (key, val) in main.iter() {
            match key.as_str() {
                "titles" => {
                    for (name, title) in getval!(val, Table, key.clone())?.iter() {
                        let location = format!("titles.{name}");
                        let map = getval!(title, Table, location.clone())?;
                        let section = Section { location, map };
                        titles.insert(name.clone(), Title::load(section, base)?);
                    }
                }
                _ => return Err(ConfigLoadError::UnknownField(key.clone())),
            }
        }
        Ok(Self { titles })
    }

    pub fn seek_config_path() -> Option<PathBuf> {
        CONFIG_FILE_PATHS
            .iter()
            .filter_map(|&(with_home, path)| {
                if with_home {
                    std::env::var_os("HOME").map(|home| Path::new(&home).join(path))
                } else {
                    Some(PathBuf::from(path))
                }
            })
            .find(|path| path.is_file())
    }

    pub fn get_title(&self, name: &str) -> Result<&Title, ConfigLoadError> {
        self.titles
            .get(name)
            .ok_or_else(|| ConfigLoadError::UndefinedName {
                name: name.to_string(),
                ty: "title",
            })
    }

    pub fn title_names(&self) -> impl Iterator<Item = &str> {
        self.titles.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests;
