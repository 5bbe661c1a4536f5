//! Replays a corpus of documents through decode → encode and prints a
//! pass/fail table. Exits non-zero when any case disagrees with its
//! expectation.
use std::process::ExitCode;
use std::time::Instant;

use colored::Colorize;
use typjson::{Codec, CodecConfig, CodecError, EnumTy, FieldCase, RecordTy, TaggedTy, Ty};

/// What a case should produce.
enum Expect {
    /// Decodes, and re-encodes to this exact text.
    Text(&'static str),
    /// Decoding fails with an error of this class.
    Fails(&'static str),
}

struct Case {
    name: &'static str,
    ty: Ty,
    input: &'static str,
    expect: Expect,
}

fn color() -> Ty {
    EnumTy::new("Color")
        .member("RED", Ty::text(), typjson::Data::text("r"))
        .member("BLUE", Ty::text(), typjson::Data::text("b"))
        .into_ty()
}

fn address() -> Ty {
    RecordTy::new("Address")
        .field("street", Ty::text())
        .field("house", Ty::int())
        .field("apt", Ty::optional(Ty::text()))
        .into_ty()
}

fn node() -> Ty {
    RecordTy::new("Node")
        .field("value", Ty::int())
        .field("next", Ty::optional(Ty::reference("Node")))
        .into_ty()
}

/// A `Node` record's fields sit one level below the node, so a chain of
/// `n` nodes needs `n + 1` levels.
const MAX_DEPTH: usize = 6;

fn codecs() -> Result<(Codec, Codec), CodecError> {
    let plain = Codec::builder()
        .define(node())
        .config(CodecConfig { max_depth: MAX_DEPTH, ..Default::default() })
        .build()?;
    let snake = Codec::builder()
        .config(CodecConfig { field_case: FieldCase::SnakeCase, ..Default::default() })
        .build()?;
    Ok((plain, snake))
}

fn corpus<'a>(plain: &'a Codec, snake: &'a Codec) -> Vec<(Case, &'a Codec)> {
    let case = |name, ty, input, expect| Case { name, ty, input, expect };
    vec![
        (case("int", Ty::int(), "3", Expect::Text("3")), plain),
        (case("int rejects bool", Ty::int(), "true", Expect::Fails("type")), plain),
        (case("int rejects fraction", Ty::int(), "1.5", Expect::Fails("type")), plain),
        (case("float from integer literal", Ty::float(), "1", Expect::Text("1.0")), plain),
        (case("decimal keeps literal", Ty::decimal(), "0.10", Expect::Text("0.10")), plain),
        (case("union int first", Ty::union([Ty::int(), Ty::float()]), "3", Expect::Text("3")), plain),
        (case("union float first", Ty::union([Ty::float(), Ty::int()]), "3", Expect::Text("3.0")), plain),
        (case("optional null", Ty::optional(Ty::int()), "null", Expect::Text("null")), plain),
        (case("set duplicates", Ty::set(Ty::int()), "[1,1,2]", Expect::Fails("value")), plain),
        (case("tuple arity", Ty::tuple([Ty::text(), Ty::int()]), r#"["a"]"#, Expect::Fails("value")), plain),
        (case("uuid upper case", Ty::uuid(), r#""BD65600D-8669-4903-8A14-AF88203ADD38""#, Expect::Fails("value")), plain),
        (case("datetime zulu", Ty::datetime(), r#""2020-01-01T17:45:55Z""#, Expect::Text(r#""2020-01-01T17:45:55+00:00""#)), plain),
        (case("datetime needs time", Ty::datetime(), r#""2022-07-12""#, Expect::Fails("value")), plain),
        (case("time micros", Ty::time(), r#""17:45:55.123456""#, Expect::Text(r#""17:45:55.123456""#)), plain),
        (case("enum member", color(), r#""b""#, Expect::Text(r#""b""#)), plain),
        (case("enum unknown value", color(), r#""w""#, Expect::Fails("value")), plain),
        (
            case("record optional omitted", address(), r#"{"street":"Main","house":1}"#,
                 Expect::Text(r#"{"street":"Main","house":1,"apt":null}"#)),
            plain,
        ),
        (case("record field missing", address(), r#"{"street":"Main"}"#, Expect::Fails("value")), plain),
        (
            case("recursive record", Ty::reference("Node"), r#"{"value":1,"next":{"value":2,"next":null}}"#,
                 Expect::Text(r#"{"value":1,"next":{"value":2,"next":null}}"#)),
            plain,
        ),
        (case("depth at limit", Ty::reference("Node"), AT_LIMIT, Expect::Text(AT_LIMIT_CANONICAL)), plain),
        (case("depth guard", Ty::reference("Node"), DEEP, Expect::Fails("depth")), plain),
        (
            case("snake case tagged", TaggedTy::new("A").variant("Number", Ty::int()).into_ty(),
                 r#"{"number":3}"#, Expect::Text(r#"{"number":3}"#)),
            snake,
        ),
        (
            case("any passthrough", Ty::Any, r#"{"z":[1,2.50,null],"a":{}}"#,
                 Expect::Text(r#"{"z":[1,2.50,null],"a":{}}"#)),
            plain,
        ),
    ]
}

const AT_LIMIT: &str = r#"{"value":0,"next":{"value":1,"next":{"value":2,"next":{"value":3,"next":
    {"value":4,"next":null}}}}}"#;

const AT_LIMIT_CANONICAL: &str =
    r#"{"value":0,"next":{"value":1,"next":{"value":2,"next":{"value":3,"next":{"value":4,"next":null}}}}}"#;

const DEEP: &str = r#"{"value":0,"next":{"value":1,"next":{"value":2,"next":{"value":3,"next":
    {"value":4,"next":{"value":5,"next":{"value":6,"next":{"value":7,"next":{"value":8,"next":null}}}}}}}}}"#;

fn error_class(error: &CodecError) -> &'static str {
    match error {
        CodecError::TypeMismatch { .. } => "type",
        CodecError::Value { .. } => "value",
        CodecError::DepthExceeded { .. } => "depth",
        CodecError::Parse(_) => "parse",
        CodecError::Io(_) => "io",
        CodecError::Config(_) => "config",
        CodecError::Schema(_) => "schema",
    }
}

/// `Ok(detail)` when the case behaved as expected, `Err(detail)` otherwise.
fn run_case(case: &Case, codec: &Codec) -> Result<String, String> {
    let decoded = codec.decode_from_text(&case.ty, case.input);
    match (&case.expect, decoded) {
        (Expect::Text(expected), Ok(data)) => {
            let text = codec.encode_to_text(&data, Some(&case.ty)).map_err(|e| format!("re-encode failed: {e}"))?;
            if text == *expected { Ok(text) } else { Err(format!("got {text}, wanted {expected}")) }
        }
        (Expect::Text(_), Err(error)) => Err(format!("unexpected error: {error}")),
        (Expect::Fails(class), Ok(data)) => Err(format!("decoded to {data}, wanted a {class} error")),
        (Expect::Fails(class), Err(error)) if error_class(&error) == *class => Ok(error.to_string()),
        (Expect::Fails(class), Err(error)) => Err(format!("wanted a {class} error, got: {error}")),
    }
}

fn main() -> ExitCode {
    let started = Instant::now();
    let (plain, snake) = match codecs() {
        Ok(codecs) => codecs,
        Err(error) => {
            eprintln!("{} {error}", "corpus codecs failed to build:".red().bold());
            return ExitCode::FAILURE;
        }
    };
    let corpus = corpus(&plain, &snake);
    let width = corpus.iter().map(|(case, _)| case.name.len()).max().unwrap_or(0);

    let mut failures = 0usize;
    for (case, codec) in &corpus {
        match run_case(case, codec) {
            Ok(detail) => {
                println!("{} {:width$}  {}", "✅".green(), case.name, detail.dimmed());
            }
            Err(detail) => {
                failures += 1;
                println!("{} {}  {}", "❌".red(), format!("{:width$}", case.name).bold(), detail.red());
            }
        }
    }

    let summary = format!(
        "{} passed, {} failed in {:.1?} ({})",
        corpus.len() - failures,
        failures,
        started.elapsed(),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
    );
    if failures == 0 {
        println!("{}", summary.green().bold());
        ExitCode::SUCCESS
    } else {
        println!("{}", summary.red().bold());
        ExitCode::FAILURE
    }
}
