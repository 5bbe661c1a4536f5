//! Command line: check documents against a schema type, or normalize one.
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use typjson::{Codec, CodecConfig, FieldCase, Json, Schema, Ty};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// decode JSON documents against declared types
#[derive(Parser, Debug)]
#[command(name = "typjson", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// decode every input against the type and report which ones conform
    Check(CheckCmd),
    /// decode one document and write it back out in canonical form
    Normalize(NormalizeCmd),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema document declaring the named types
    #[arg(long, short)]
    schema: PathBuf,

    /// type to decode against (a name from the schema or a primitive);
    /// defaults to the schema's root
    #[arg(long = "type", short = 't')]
    type_name: Option<String>,

    /// codec settings as a JSON file (max_depth, strict_fields, ...)
    #[arg(long)]
    config: Option<PathBuf>,

    /// key case the input documents are written in
    #[arg(long)]
    case: Option<FieldCase>,
}

#[derive(clap::Parser, Debug)]
struct CheckCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct NormalizeCmd {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// input document, or '-' for stdin
    #[arg(long, short)]
    input: String,

    /// key case to write; defaults to the input case
    #[arg(long)]
    output_case: Option<FieldCase>,

    /// spaces per indentation level (compact if omitted)
    #[arg(long)]
    indent: Option<usize>,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// Everything a subcommand needs to run documents through the engine.
struct Loaded {
    schema: Schema,
    ty: Ty,
    config: CodecConfig,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load(&self) -> Result<Loaded> {
        let source = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read schema {}", self.schema.display()))?;
        let schema = Schema::from_json_str(&source)
            .with_context(|| format!("invalid schema {}", self.schema.display()))?;
        let ty = schema.ty(self.type_name.as_deref())?;

        let mut config = match self.config.as_ref() {
            Some(path) => {
                let source = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                CodecConfig::from_json_str(&source)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => CodecConfig::default(),
        };
        if let Some(case) = self.case {
            config.field_case = case;
        }
        Ok(Loaded { schema, ty, config })
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Returns whether every input conformed.
    pub fn run(&self) -> Result<bool> {
        match &self.cmd {
            Command::Check(target) => target.run(),
            Command::Normalize(target) => target.run().map(|()| true),
        }
    }
}

impl CheckCmd {
    fn run(&self) -> Result<bool> {
        let loaded = self.schema_settings.load()?;
        let codec = loaded.schema.codec(loaded.config)?;
        let source_paths = resolve_file_path_patterns(&self.input)?;

        // one immutable codec, shared by every worker
        let results = source_paths
            .par_iter()
            .map(|path| (path, check_file(&codec, &loaded.ty, path)))
            .collect::<Vec<_>>();

        let mut failures = 0usize;
        for (path, result) in &results {
            match result {
                Ok(()) => eprintln!("{} {}", "✅".green(), path.display()),
                Err(error) => {
                    failures += 1;
                    eprintln!("{} {}: {error:#}", "❌".red(), path.display());
                }
            }
        }
        let summary = format!("{} of {} documents conform to {}", results.len() - failures, results.len(), loaded.ty);
        if failures == 0 {
            eprintln!("{}", summary.green().bold());
        } else {
            eprintln!("{}", summary.red().bold());
        }
        Ok(failures == 0)
    }
}

impl NormalizeCmd {
    fn run(&self) -> Result<()> {
        let loaded = self.schema_settings.load()?;
        let reader = loaded.schema.codec(loaded.config.clone())?;
        let writer = loaded.schema.codec(CodecConfig {
            field_case: self.output_case.unwrap_or(loaded.config.field_case),
            indent: self.indent.or(loaded.config.indent),
            ..loaded.config.clone()
        })?;

        let node = read_document(&self.input)?;
        let data = reader.decode(&loaded.ty, &node)?;
        let mut text = writer.encode_to_text(&data, Some(&loaded.ty))?;
        text.push('\n');

        match self.out.as_ref() {
            Some(out) => {
                if let Some(parent) = out.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(out, &text)
                    .with_context(|| format!("failed to write {}", out.display()))?;
            }
            None => print!("{text}"),
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn check_file(codec: &Codec, ty: &Ty, path: &Path) -> Result<()> {
    let file = std::fs::File::open(path)?;
    codec.decode_from_stream(std::io::BufReader::new(file), ty)?;
    Ok(())
}

fn read_document(input: &str) -> Result<Json> {
    let mut source = String::new();
    if input == "-" {
        std::io::stdin().read_to_string(&mut source).context("failed to read stdin")?;
    } else {
        source = std::fs::read_to_string(input).with_context(|| format!("failed to read {input}"))?;
    }
    Ok(typjson::json::parse(&source)?)
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let before = out.len();
        for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
            out.push(entry?);
        }
        if out.len() == before {
            bail!("glob pattern matched no files: {pattern}");
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}
