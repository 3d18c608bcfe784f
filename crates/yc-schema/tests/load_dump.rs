//! Integration tests: load YAML documents from `tests/data/`, validate them
//! against a full schema, and dump them back.

use std::path::PathBuf;

use yc_schema::prelude::*;
use yc_schema::{parse_document, ErrorKind};

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn pet_config() -> YamlConfig {
    YamlConfig::new([
        ScalarElem::str("pet")
            .default("squirrel")
            .required()
            .choices(["squirrel", "cat", "dog"])
            .help("The kind of pet.")
            .into(),
        ScalarElem::int("quantity").required().choices([1, 2, 3]).into(),
        RangeElem::float("quality").min(0).max(1.0).into(),
        ListElem::new(
            "potential_names",
            ScalarElem::anon(ScalarType::Str).help("Such as Fido."),
        )
        .help("What you could name this pet.")
        .into(),
        KeyedElem::new(
            "properties",
            [
                ScalarElem::str("description")
                    .help("General pet description.")
                    .into(),
                RegexElem::new("greeting", r"hello \w+$")
                    .help("A regex of some sort.")
                    .into(),
                RangeElem::int("legs").min(0).into(),
            ],
        )
        .help("Pet properties")
        .into(),
        CodeElem::new("behavior_code")
            .help("Program for pet behavior.")
            .into(),
    ])
    .expect("pet schema is valid")
}

fn load_fixture(name: &str) -> ConfigResult<ConfigDict> {
    pet_config().load_file(data_path(name))
}

// ---------------------------------------------------------------------------
// Loading and dumping
// ---------------------------------------------------------------------------

#[test]
fn test_load_fixture() {
    let data = load_fixture("test1.yaml").unwrap();
    assert_eq!(data["pet"], Value::from("cat"));
    assert_eq!(data["quantity"], Value::Int(2));
    assert_eq!(data["quality"], Value::Float(0.5));
    assert_eq!(data.lookup("potential_names.2"), Some(&Value::from("Mr. Whiskers")));
    assert_eq!(data.lookup("properties.greeting"), Some(&Value::from("hello world")));
    assert_eq!(data.lookup("properties.legs"), Some(&Value::Int(4)));
    assert_eq!(data["behavior_code"], Value::from("sleep()\neat(fish)\n"));
}

#[test]
fn test_dump_then_load_is_identity() {
    let config = pet_config();
    let data = load_fixture("test1.yaml").unwrap();

    let mut out = Vec::new();
    config.dump(&mut out, Some(&data), &DumpOptions::default()).unwrap();
    let reloaded = config.load(out.as_slice()).unwrap();
    assert_eq!(reloaded, data);
}

#[test]
fn test_dump_without_comments_is_identity() {
    let config = pet_config();
    let data = load_fixture("test1.yaml").unwrap();
    let text = config.dump_to_string(Some(&data), &DumpOptions::bare()).unwrap();
    assert!(!text.contains('#'));
    assert_eq!(config.load_str(&text).unwrap(), data);
}

#[test]
fn test_dumped_code_block_is_a_list_of_lines() {
    let config = pet_config();
    let data = load_fixture("test1.yaml").unwrap();
    let text = config.dump_to_string(Some(&data), &DumpOptions::bare()).unwrap();
    assert!(text.contains("behavior_code:\n  - sleep()\n  - eat(fish)\n"));
}

#[test]
fn test_template_documents_every_field() {
    let text = pet_config()
        .dump_to_string(None, &DumpOptions::default())
        .unwrap();
    assert!(text.starts_with(
        "# PET(required str): The kind of pet.\n# Choices: squirrel, cat, dog\npet: squirrel\n"
    ));
    assert!(text.contains("# QUANTITY(required int)\n# Choices: 1, 2, 3\nquantity:\n"));
    assert!(text.contains("# QUALITY(float)\n# Valid Range: 0.0 - 1.0\nquality:\n"));
    assert!(text.contains("# POTENTIAL_NAMES(list): What you could name this pet.\n"));
    assert!(text.contains("potential_names:\n  # (str): Such as Fido.\n  -\n"));
    assert!(text.contains("  # GREETING(str): A regex of some sort.\n  # Values must match: r'hello \\w+$'\n"));
    assert!(text.contains("# LEGS(int)\n  # Valid Range: > 0\n"));
    assert!(parse_document(&text).is_ok());
}

#[test]
fn test_template_without_choices() {
    let text = pet_config()
        .dump_to_string(
            None,
            &DumpOptions {
                show_choices: false,
                ..DumpOptions::default()
            },
        )
        .unwrap();
    assert!(text.contains("# PET(required str): The kind of pet.\npet: squirrel\n"));
    assert!(!text.contains("Choices"));
}

#[test]
fn test_file_round_trip() {
    let config = pet_config();
    let data = load_fixture("test1.yaml").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pets.yaml");
    config.dump_file(&path, Some(&data), &DumpOptions::default()).unwrap();
    assert_eq!(config.load_file(&path).unwrap(), data);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = pet_config()
        .load_file(dir.path().join("absent.yaml"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_control_characters_round_trip() {
    let config = pet_config();
    let data = config
        .load_str("quantity: 1\nproperties:\n  description: \"del\\x7f, c1\\x90, ls\\u2028\"\n")
        .unwrap();
    assert_eq!(
        data.lookup("properties.description"),
        Some(&Value::from("del\u{7f}, c1\u{90}, ls\u{2028}"))
    );
    for opts in [DumpOptions::default(), DumpOptions::bare()] {
        let text = config.dump_to_string(Some(&data), &opts).unwrap();
        assert!(text.contains("\\x7f"), "{text}");
        assert_eq!(config.load_str(&text).unwrap(), data);
    }
}

// ---------------------------------------------------------------------------
// Regressions
// ---------------------------------------------------------------------------

#[test]
fn test_duplicate_keys_rejected() {
    let err = load_fixture("duplicates.yaml").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[test]
fn test_only_scalars_convert_to_strings() {
    let err = load_fixture("string_conv_limits.yaml").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeConversion);
}

#[test]
fn test_regex_sees_converted_value() {
    let err = load_fixture("regex_val_type.yaml").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}

#[test]
fn test_regex_default_is_normalized() {
    let elem = RegexElem::new("num", r"\d+").default(5).build().unwrap();
    assert_eq!(elem.base().default_value(), &Value::from("5"));
}

#[test]
fn test_extra_keyed_key_rejected() {
    let raw = parse_document("not_defined: nope\n").unwrap();
    let err = pet_config().validate(&raw).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownKey);
}

#[test]
fn test_choice_violation() {
    let err = pet_config().load_str("pet: horse\nquantity: 1\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
    let err = pet_config().load_str("quantity: 4\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}

#[test]
fn test_range_bounds_are_exclusive() {
    assert!(pet_config().load_str("quantity: 1\nquality: 0.99\n").is_ok());
    let err = pet_config().load_str("quantity: 1\nquality: 1.0\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
    let err = pet_config()
        .load_str("quantity: 1\nproperties:\n  legs: 0\n")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[test]
fn test_set_default_on_nested_field() {
    let mut config = YamlConfig::new([KeyedElem::new(
        "pie",
        [ScalarElem::str("fruit").into()],
    )
    .into()])
    .unwrap();
    config.set_default("pie.fruit", "apple").unwrap();
    let data = config.load_str("").unwrap();
    assert_eq!(data.lookup("pie.fruit"), Some(&Value::from("apple")));
}

#[test]
fn test_set_default_through_list_items() {
    let mut config = YamlConfig::new([ListElem::new(
        "cars",
        KeyedElem::anon([
            ScalarElem::str("color").into(),
            ScalarElem::str("make").into(),
            ListElem::new("extras", ScalarElem::anon(ScalarType::Str)).into(),
        ]),
    )
    .into()])
    .unwrap();
    config.set_default("cars.*.color", "red").unwrap();
    config
        .set_default("cars.*.extras", vec!["rhoomba", "heated sunshades"])
        .unwrap();

    let data = config
        .load_str(
            "cars:\n  - color: green\n    make: Dodge\n  - make: Honda\n    extras: [flaming wheels]\n",
        )
        .unwrap();

    assert_eq!(data.lookup("cars.0.color"), Some(&Value::from("green")));
    assert_eq!(
        data.lookup("cars.0.extras"),
        Some(&Value::from(vec!["rhoomba", "heated sunshades"]))
    );
    assert_eq!(data.lookup("cars.1.color"), Some(&Value::from("red")));
    assert_eq!(
        data.lookup("cars.1.extras"),
        Some(&Value::from(vec!["flaming wheels"]))
    );
}

#[test]
fn test_set_default_rejects_bad_values() {
    let mut config = pet_config();
    let err = config.set_default("quantity", "many").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeConversion);
    let err = config.set_default("properties.nope", 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownKey);
}

#[test]
fn test_set_default_on_derived_field() {
    let mut config = YamlConfig::builder([
        ScalarElem::int("a").into(),
        DerivedElem::new("double").into(),
    ])
    .resolver("double", |d| Ok(Value::Int(d["a"].as_i64().unwrap_or(0) * 2)))
    .build()
    .unwrap();
    let err = config.set_default("double", 4).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[test]
fn test_defaulted_category_fixture() {
    let config = YamlConfig::new([DefaultedCategoryElem::new(
        "cars",
        [
            ScalarElem::int("wheels").required().into(),
            ScalarElem::str("drivetrain").required().default("2WD").into(),
            ScalarElem::str("color").into(),
        ],
    )
    .into()])
    .unwrap();

    let data = config.load_file(data_path("cars.yaml")).unwrap();
    assert_eq!(data.lookup("cars.jeep.wheels"), Some(&Value::Int(4)));
    assert_eq!(data.lookup("cars.jeep.drivetrain"), Some(&Value::from("4WD")));
    assert_eq!(data.lookup("cars.reliant_robin.color"), Some(&Value::from("red")));
    assert_eq!(data.lookup("cars._"), None);

    let text = config.dump_to_string(Some(&data), &DumpOptions::bare()).unwrap();
    assert!(!text.contains("_:"));
    assert_eq!(config.load_str(&text).unwrap(), data);
}

#[test]
fn test_category_defaults_merge_with_input() {
    let defaults: Value = [("a", 1)].into_iter().collect();
    let config = YamlConfig::new([CategoryElem::new("counts", ScalarElem::anon(ScalarType::Int))
        .default(defaults)
        .into()])
    .unwrap();
    let data = config.load_str("counts:\n  b: 2\n").unwrap();
    let expected: Value = [("a", 1), ("b", 2)].into_iter().collect();
    assert_eq!(data["counts"], expected);
}
