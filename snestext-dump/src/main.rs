mod config;

use clap::{Args, ErrorKind, Parser, Subcommand};
use config::{Config, StringGroup, Title};
use snestext::cartridge::{Cartridge, ReadRomError};
use snestext::huffman::HuffmanDecoder;
use snestext::strings::{CStrings, DecodedString, PascalStrings, StringGenerator};
use snestext::table::RecordTable;
use snestext::text::{get_hex, get_text, Charmap, CharmapLoadError};
use std::io::Write;
use std::ops::Range;
use std::path::PathBuf;

#[derive(Parser, Clone)]
#[clap(
    version = clap::crate_version!(),
    about = clap::crate_description!(),
)]
struct Options {
    /// Config file to use instead of the default search path
    #[clap(short, long, parse(from_os_str))]
    config: Option<PathBuf>,
    #[clap(short, long)]
    verbose: bool,
    /// Title as named in the config file
    title: String,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Copy)]
struct Window {
    /// First id to dump (decimal or 0x hex)
    #[clap(long, parse(try_from_str = parse_number))]
    first: Option<u32>,
    /// Id to stop before (decimal or 0x hex)
    #[clap(long, parse(try_from_str = parse_number))]
    last: Option<u32>,
}

impl Window {
    fn resolve(&self, ids: Range<u32>) -> (u32, u32) {
        (self.first.unwrap_or(ids.start), self.last.unwrap_or(ids.end))
    }
}

#[derive(Subcommand, Clone)]
enum Command {
    /// Print the detected cartridge header
    Header,
    /// Dump huffman compressed messages
    Messages {
        kind: String,
        #[clap(flatten)]
        window: Window,
        #[clap(long)]
        csv: bool,
        /// Print character codes instead of text
        #[clap(long)]
        raw: bool,
    },
    /// Dump uncompressed strings
    Strings {
        group: String,
        #[clap(flatten)]
        window: Window,
        #[clap(long)]
        csv: bool,
        /// Print character codes instead of text
        #[clap(long)]
        raw: bool,
    },
    /// Dump a table of fixed-size records
    Table {
        name: String,
        #[clap(flatten)]
        window: Window,
        #[clap(long)]
        csv: bool,
    },
}

fn parse_number(s: &str) -> Result<u32, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn error<E: std::fmt::Display>(kind: ErrorKind, val: E) -> ! {
    clap::app_from_crate!().error(kind, val).exit()
}

fn invalid<E: std::fmt::Display>(err: E) -> ! {
    error(ErrorKind::InvalidValue, format_args!("{err}\n"))
}

fn error_kind(err: &snestext::Error) -> ErrorKind {
    match err {
        snestext::Error::Rom(ReadRomError::Io { .. })
        | snestext::Error::Charmap(CharmapLoadError::Io(_)) => ErrorKind::Io,
        _ => ErrorKind::InvalidValue,
    }
}

/// Exit with a failure reported by the library
fn fatal<E: Into<snestext::Error>>(err: E) -> ! {
    let err = err.into();
    error(error_kind(&err), format_args!("{err}\n"))
}

fn cartridge_from_title(title: &Title) -> snestext::Result<Cartridge> {
    Ok(Cartridge::open(&title.rom)?)
}

fn charmap_from_title(title: &Title) -> snestext::Result<Charmap> {
    match &title.charmap {
        Some(path) => {
            log::info!("loading charmap `{}`", path.display());
            Ok(Charmap::load_from_file(path)?)
        }
        None => {
            log::warn!("no charmap configured, printing placeholders");
            Ok(Charmap::new())
        }
    }
}

/// Quote a CSV cell when it contains a separator, a quote or a line break
fn csv_cell(cell: &str) -> String {
    if cell.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn csv_row<I: IntoIterator<Item = S>, S: AsRef<str>>(cells: I) -> String {
    cells
        .into_iter()
        .map(|cell| csv_cell(cell.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

struct StringPrinter<'a> {
    charmap: &'a Charmap,
    csv: bool,
    raw: bool,
}

impl StringPrinter<'_> {
    fn header(&self) -> Option<String> {
        self.csv
            .then(|| csv_row(["id", "address", "shift", "span", "text"]))
    }

    fn line(&self, string: &DecodedString, delimiters: &[u16]) -> String {
        let text = if self.raw {
            get_hex(&string.codes)
        } else {
            get_text(&string.codes, self.charmap, delimiters)
        };
        let shift = string
            .shift
            .map(|shift| format!("{shift:02X}"))
            .unwrap_or_default();
        if self.csv {
            csv_row([
                format!("{:#x}", string.id),
                format!("{:06X}", string.address),
                shift,
                string.span.to_string(),
                text,
            ])
        } else {
            format!("{:06X}\t{shift}\t{text}", string.address)
        }
    }

    fn dump<G: StringGenerator>(&self, generator: &mut G, window: Window, out: &mut impl Write) {
        let (first, last) = window.resolve(generator.ids());
        let delimiters = generator.delimiters().to_vec();
        let strings = generator.strings(first, last).unwrap_or_else(|err| fatal(err));
        if let Some(header) = self.header() {
            write_line(out, &header);
        }
        for string in strings {
            match string {
                Ok(string) => {
                    log::trace!("{:#x}: {}", string.id, get_hex(&string.codes));
                    write_line(out, &self.line(&string, &delimiters))
                }
                Err(err) => fatal(err),
            }
        }
    }
}

fn write_line(out: &mut impl Write, line: &str) {
    writeln!(out, "{line}").unwrap_or_else(|err| {
        error(ErrorKind::Io, format_args!("Failed writing output ({err})\n"))
    })
}

fn dump_header(rom: &Cartridge, out: &mut impl Write) {
    let header = rom.header();
    write_line(out, &format!("name\t{}", header.name));
    write_line(out, &format!("mapping\t{}", rom.mapping()));
    write_line(out, &format!("offset\t{:#06x}", header.offset));
    write_line(out, &format!("makeup\t{:#04x}", header.makeup));
    write_line(out, &format!("rom type\t{:#04x}", header.rom_type));
    write_line(out, &format!("rom size\t{:#x}", header.rom_size));
    write_line(out, &format!("ram size\t{:#x}", header.ram_size));
    write_line(out, &format!("country\t{:#04x}", header.country));
    write_line(out, &format!("developer\t{:#04x}", header.developer));
    write_line(out, &format!("version\t{}", header.version));
    write_line(out, &format!("checksum\t{:#06x}", header.checksum));
    write_line(out, &format!("image size\t{:#x}", rom.len()));
}

fn dump_table(table: &RecordTable, window: Window, csv: bool, out: &mut impl Write) {
    let (first, last) = window.resolve(table.params().ids.clone());
    let records = table.records(first, last).unwrap_or_else(|err| fatal(err));
    let names = table.field_names().collect::<Vec<_>>();
    if csv {
        let header = ["id", "address"].into_iter().chain(names.iter().copied());
        write_line(out, &csv_row(header));
    } else {
        write_line(out, &format!("id\taddress\t{}", names.join("\t")));
    }
    for record in records {
        let record = record.unwrap_or_else(|err| fatal(err));
        let cells = [format!("{:#x}", record.id), format!("{:06X}", record.address)]
            .into_iter()
            .chain(record.values.iter().map(ToString::to_string))
            .collect::<Vec<_>>();
        if csv {
            write_line(out, &csv_row(cells));
        } else {
            write_line(out, &cells.join("\t"));
        }
    }
}

fn main() {
    let options = Options::parse();

    let filter = if options.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = Config::load(options.config.clone()).unwrap_or_else(|err| {
        error(
            ErrorKind::InvalidValue,
            format_args!("Failure while loading config ({err})\n"),
        )
    });
    let title = config.get_title(&options.title).unwrap_or_else(|err| {
        let known = config.title_names().collect::<Vec<_>>().join(", ");
        error(
            ErrorKind::InvalidValue,
            format_args!("{err} (known titles: {known})\n"),
        )
    });

    let rom = cartridge_from_title(title).unwrap_or_else(|err| fatal(err));
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());

    match options.command {
        Command::Header => dump_header(&rom, &mut out),
        Command::Messages {
            kind,
            window,
            csv,
            raw,
        } => {
            let params = title.get_messages(&kind).unwrap_or_else(|err| invalid(err));
            let charmap = charmap_from_title(title).unwrap_or_else(|err| fatal(err));
            let printer = StringPrinter {
                charmap: &charmap,
                csv,
                raw,
            };
            let mut decoder = HuffmanDecoder::new(&rom, params.clone());
            printer.dump(&mut decoder, window, &mut out);
        }
        Command::Strings {
            group,
            window,
            csv,
            raw,
        } => {
            let group = title.get_strings(&group).unwrap_or_else(|err| invalid(err));
            let charmap = charmap_from_title(title).unwrap_or_else(|err| fatal(err));
            let printer = StringPrinter {
                charmap: &charmap,
                csv,
                raw,
            };
            match group {
                StringGroup::Pascal(params) => {
                    printer.dump(&mut PascalStrings::new(&rom, params.clone()), window, &mut out)
                }
                StringGroup::C(params) => {
                    printer.dump(&mut CStrings::new(&rom, params.clone()), window, &mut out)
                }
            }
        }
        Command::Table { name, window, csv } => {
            let params = title.get_table(&name).unwrap_or_else(|err| invalid(err));
            dump_table(&RecordTable::new(&rom, params.clone()), window, csv, &mut out);
        }
    }

    out.flush().unwrap_or_else(|err| {
        error(ErrorKind::Io, format_args!("Failed writing output ({err})\n"))
    });
}
