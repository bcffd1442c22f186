use super::*;

const DOCUMENT: &str = r#"
[titles.rs3]
rom = "roms/rs3.sfc"
charmap = "rs3.toml"

[titles.rs3.messages.battle]
scheme = "msb-first"
delimiters = [0x00]
group-table = 0xC40000
shift-bits = 0xC40100
data = 0xC50000
off-branch = 0xC40200
on-branch = 0xC40400
root = 0x1FE
read-size = 1
mask = 0x7FFF
ids = [0, 0x400]

[titles.rs3.strings.items]
kind = "pascal"
address = 0xC60000
ids = [0, 256]

[titles.rs3.strings.names]
kind = "c"
address = 0xC61000
ids = [0, 16]
delimiters = [0x00]
prefixes = [0x1F]

[titles.rs3.tables.weapons]
address = 0xC70000
record-size = 8
ids = [0, 64]
fields = [ { name = "power", offset = 2, type = "u8" },
           { name = "flags", offset = 3, type = "bits", mask = 0x0F00 } ]
"#;

fn parse(source: &str) -> Result<Config, ConfigLoadError> {
    Config::parse(source, Path::new("/games"))
}

#[test]
fn test_full_document() {
    let config = parse(DOCUMENT).unwrap();
    let title = config.get_title("rs3").unwrap();
    assert_eq!(title.rom, Path::new("/games/roms/rs3.sfc"));
    assert_eq!(title.charmap.as_deref(), Some(Path::new("/games/rs3.toml")));

    let battle = title.get_messages("battle").unwrap();
    assert_eq!(battle.scheme, Scheme::MsbFirst);
    assert_eq!(battle.delimiters, [0x00]);
    assert_eq!(battle.group_table, Addr24::from(0xc40000));
    assert_eq!(battle.on_branch, Addr24::from(0xc40400));
    assert_eq!(battle.root, 0x1fe);
    assert_eq!(battle.read_size, 1);
    assert_eq!(battle.mask, 0x7fff);
    assert_eq!(battle.ids, 0..0x400);

    assert_eq!(
        title.get_strings("items").unwrap(),
        &StringGroup::Pascal(PascalParams {
            address: Addr24::from(0xc60000),
            ids: 0..256,
        })
    );
    assert_eq!(
        title.get_strings("names").unwrap(),
        &StringGroup::C(CParams {
            address: Addr24::from(0xc61000),
            ids: 0..16,
            delimiters: vec![0x00],
            prefixes: vec![0x1f],
        })
    );

    let weapons = title.get_table("weapons").unwrap();
    assert_eq!(weapons.record_size, 8);
    assert_eq!(weapons.fields.len(), 2);
    assert_eq!(weapons.fields[0].kind, FieldKind::U8);
    assert_eq!(weapons.fields[1].offset, 3);
    assert_eq!(weapons.fields[1].kind, FieldKind::Bits(0x0f00));
}

#[test]
fn test_absolute_paths_kept() {
    let config = parse("[titles.x]\nrom = \"/srv/x.sfc\"").unwrap();
    let title = config.get_title("x").unwrap();
    assert_eq!(title.rom, Path::new("/srv/x.sfc"));
    assert!(title.charmap.is_none());
    assert!(title.messages.is_empty());
}

#[test]
fn test_undefined_names() {
    let config = parse(DOCUMENT).unwrap();
    assert!(matches!(
        config.get_title("rs2"),
        Err(ConfigLoadError::UndefinedName { ty: "title", .. })
    ));
    let title = config.get_title("rs3").unwrap();
    assert!(matches!(
        title.get_messages("field"),
        Err(ConfigLoadError::UndefinedName { name, .. }) if name == "field"
    ));
    assert!(title.get_strings("spells").is_err());
    assert!(title.get_table("armor").is_err());
}

#[test]
fn test_unknown_field() {
    assert!(matches!(
        parse("[profiles.x]"),
        Err(ConfigLoadError::UnknownField(field)) if field == "profiles"
    ));
    let source = DOCUMENT.replace("read-size = 1", "read-size = 1\nbanks = 4");
    assert!(matches!(
        parse(&source),
        Err(ConfigLoadError::UnknownField(field)) if field == "titles.rs3.messages.battle.banks"
    ));
}

#[test]
fn test_wrong_type() {
    let source = DOCUMENT.replace("root = 0x1FE", "root = \"0x1FE\"");
    assert!(matches!(
        parse(&source),
        Err(ConfigLoadError::WrongType {
            expected: "Integer",
            got: "string",
            ..
        })
    ));
}

#[test]
fn test_unknown_scheme() {
    let source = DOCUMENT.replace("msb-first", "middle-out");
    assert!(matches!(
        parse(&source),
        Err(ConfigLoadError::UnknownValue { value, .. }) if value == "middle-out"
    ));
}

#[test]
fn test_required_attr() {
    let source = DOCUMENT.replace("data = 0xC50000\n", "");
    assert!(matches!(
        parse(&source),
        Err(ConfigLoadError::RequiredAttr { attr: "data", .. })
    ));
}

#[test]
fn test_bad_ids() {
    let source = DOCUMENT.replace("ids = [0, 256]", "ids = [256, 0]");
    assert!(matches!(parse(&source), Err(ConfigLoadError::UnknownValue { .. })));
    let source = DOCUMENT.replace("ids = [0, 256]", "ids = [0]");
    assert!(matches!(parse(&source), Err(ConfigLoadError::UnknownValue { .. })));
}

#[test]
fn test_unknown_field_type() {
    let source = DOCUMENT.replace("type = \"u8\"", "type = \"f32\"");
    assert!(matches!(
        parse(&source),
        Err(ConfigLoadError::Field {
            source: TableError::UnknownFieldType(ty),
            ..
        }) if ty == "f32"
    ));
}

#[test]
fn test_syntax_error() {
    assert!(matches!(parse("[titles"), Err(ConfigLoadError::De(_))));
}

/// Known battle message decodes to its code sequence, run with
/// `SNESTEXT_CONFIG=... SNESTEXT_TITLE=... cargo test -- --ignored`
#[test]
#[ignore]
fn test_known_battle_message() {
    use snestext::cartridge::Cartridge;
    use snestext::huffman::HuffmanDecoder;

    let path = std::env::var("SNESTEXT_CONFIG").expect("SNESTEXT_CONFIG is not set");
    let name = std::env::var("SNESTEXT_TITLE").expect("SNESTEXT_TITLE is not set");
    let config = Config::load_from_file(path).unwrap();
    let title = config.get_title(&name).unwrap();
    let rom = Cartridge::open(&title.rom).unwrap();
    let mut decoder = HuffmanDecoder::new(&rom, title.get_messages("battle").unwrap().clone());
    let message = decoder
        .messages(0x141, 0x142)
        .unwrap()
        .next()
        .unwrap()
        .unwrap();
    assert_eq!(message.address, Addr24::from(0xfcbd36));
    assert_eq!(
        message.codes,
        [
            0xbd, 0x17, 0x11, 0x17, 0x01, 0x20, 0x21, 0x2e, 0x01, 0x10, 0x15, 0x32, 0x20, 0x11,
            0x3f, 0x1b, 0x7f, 0xb1, 0xac
        ]
    );
}
