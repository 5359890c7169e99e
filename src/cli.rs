//! CLI: schema documents → TypeScript module (`generate`) or a summary (`check`).
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::Value;

use crate::batch::{self, BatchReport};
use crate::options::{ArrayStyle, DateType, EnumStrategy, NullableStyle, Options};
use crate::schema::SchemaDocument;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// lower JSON-Schema / OpenAPI schema documents to TypeScript declarations
#[derive(Parser, Debug)]
#[command(name = "schema-lower", version)]
pub struct CommandLineInterface {
    /// debug-level logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// lower every named schema and write one TypeScript module per input
    Generate(GenerateOut),
    /// lower every named schema and only report what succeeded or failed
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer selecting the schema document inside each input (e.g. /components)
    #[arg(long)]
    json_pointer: Option<String>,

    /// jq filter applied to each input; every output is one schema document
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns.
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct LoweringSettings {
    /// JSON options file (camelCase fields, every field optional)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    enum_type: Option<EnumTypeArg>,

    #[arg(long, value_enum)]
    date_type: Option<DateTypeArg>,

    #[arg(long, value_enum)]
    nullable: Option<NullableArg>,

    #[arg(long, value_enum)]
    array_type: Option<ArrayTypeArg>,

    /// lower named schemas on all cores
    #[arg(long, default_value_t = false)]
    parallel: bool,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    lowering: LoweringSettings,

    /// omit the generated-file banner
    #[arg(long, default_value_t = false)]
    no_banner: bool,

    /// output .ts file (stdout if omitted); with several inputs, a directory
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    lowering: LoweringSettings,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum EnumTypeArg {
    Union,
    Enum,
    Const,
    Branded,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum DateTypeArg {
    String,
    Date,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum NullableArg {
    Null,
    Undefined,
    NullUndefined,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ArrayTypeArg {
    Generic,
    Bracket,
}

/// One schema document pulled out of an input file.
struct LoadedDocument {
    label: String,
    source: PathBuf,
    document: SchemaDocument,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load(&self) -> Result<Vec<LoadedDocument>> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        let mut out = Vec::new();
        for source_path in source_paths {
            let label = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {label}"))?;
            let value: Value = crate::path_de::from_str_with_path(&source)
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("failed to parse JSON source file {label}"))?;

            let selected = match self.jq_expr.as_ref() {
                None => vec![value],
                Some(jq_expr) => crate::jq_exec::select_documents(jq_expr, &value)
                    .with_context(|| format!("failed to apply jq expression to {label}"))?,
            };
            let many = selected.len() > 1;
            for (i, value) in selected.into_iter().enumerate() {
                let value = match self.json_pointer.as_deref() {
                    None => value,
                    Some(pointer) => value
                        .pointer(pointer)
                        .cloned()
                        .with_context(|| format!("JSON pointer {pointer} not found in {label}"))?,
                };
                let document = SchemaDocument::from_value(value)
                    .with_context(|| format!("invalid schema document {label}"))?;
                let label = if many { format!("{label}#{i}") } else { label.clone() };
                out.push(LoadedDocument { label, source: source_path.clone(), document });
            }
        }
        Ok(out)
    }
}

impl LoweringSettings {
    fn options(&self) -> Result<Options> {
        let mut options = match &self.config {
            None => Options::default(),
            Some(path) => {
                let src = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read options file {}", path.display()))?;
                Options::from_json_str(&src)
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("invalid options file {}", path.display()))?
            }
        };
        if let Some(v) = self.enum_type {
            options = options.enum_type(match v {
                EnumTypeArg::Union => EnumStrategy::Union,
                EnumTypeArg::Enum => EnumStrategy::Enum,
                EnumTypeArg::Const => EnumStrategy::Const,
                EnumTypeArg::Branded => EnumStrategy::Branded,
            });
        }
        if let Some(v) = self.date_type {
            options = options.date_type(match v {
                DateTypeArg::String => DateType::String,
                DateTypeArg::Date => DateType::Date,
            });
        }
        if let Some(v) = self.nullable {
            options = options.nullable_type(match v {
                NullableArg::Null => NullableStyle::Null,
                NullableArg::Undefined => NullableStyle::Undefined,
                NullableArg::NullUndefined => NullableStyle::NullAndUndefined,
            });
        }
        if let Some(v) = self.array_type {
            options = options.array_type(match v {
                ArrayTypeArg::Generic => ArrayStyle::Generic,
                ArrayTypeArg::Bracket => ArrayStyle::Bracket,
            });
        }
        Ok(options)
    }

    fn lower(&self, document: &SchemaDocument, options: &Options) -> BatchReport {
        if self.parallel {
            batch::lower_document_parallel(document, options)
        } else {
            batch::lower_document(document, options)
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Exit code: 0 when every named type lowered, 1 otherwise.
    pub fn run(&self) -> Result<i32> {
        match &self.cmd {
            Command::Generate(target) => {
                let options = target.lowering.options()?;
                let documents = target.input_settings.load()?;
                let many = documents.len() > 1;
                let mut all_ok = true;
                for loaded in &documents {
                    let report = target.lowering.lower(&loaded.document, &options);
                    print_summary(&loaded.label, &report);
                    all_ok &= report.is_success();

                    let banner = (!target.no_banner).then(|| crate::emit::banner(&loaded.label));
                    let module = crate::emit::render_module(&report.declarations(), banner.as_deref());
                    match target.out.as_ref() {
                        None => println!("{module}"),
                        Some(out) => {
                            let path = if many {
                                out.join(module_file_name(&loaded.source, &loaded.label))
                            } else {
                                out.clone()
                            };
                            write_output(&path, &module)?;
                            tracing::info!(path = %path.display(), "wrote module");
                        }
                    }
                }
                Ok(if all_ok { 0 } else { 1 })
            }
            Command::Check(target) => {
                let options = target.lowering.options()?;
                let documents = target.input_settings.load()?;
                let mut all_ok = true;
                for loaded in &documents {
                    let report = target.lowering.lower(&loaded.document, &options);
                    print_summary(&loaded.label, &report);
                    all_ok &= report.is_success();
                }
                Ok(if all_ok { 0 } else { 1 })
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn print_summary(label: &str, report: &BatchReport) {
    let ok = format!("{} succeeded", report.succeeded()).green();
    let failed = if report.failed() == 0 {
        format!("{} failed", report.failed()).normal()
    } else {
        format!("{} failed", report.failed()).red().bold()
    };
    eprintln!("{} {label}: {ok}, {failed}", "lowered".bold());
    for failure in &report.failures {
        eprintln!("  {} {failure}", "✗".red());
    }
    for warning in report.warnings() {
        eprintln!("  {} {warning}", "!".yellow());
    }
    if report.cancelled {
        eprintln!("  {}", "run cancelled before every schema was attempted".yellow());
    }
}

fn module_file_name(source: &Path, label: &str) -> String {
    let stem = source.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "schema".to_string());
    match label.rsplit_once('#') {
        Some((_, index)) => format!("{stem}.{index}.ts"),
        None => format!("{stem}.ts"),
    }
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();
    for raw in patterns {
        let pattern = raw.as_ref();
        if !has_glob_chars(pattern) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let before = out.len();
        for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern {pattern}"))? {
            out.push(entry?);
        }
        if out.len() == before {
            bail!("glob pattern matched no files: {pattern}");
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = CommandLineInterface::parse_from([
            "schema-lower", "check", "-i", "a.json", "--enum-type", "branded", "--nullable", "null-undefined",
        ]);
        let Command::Check(target) = &cli.cmd else { panic!("expected check") };
        let options = target.lowering.options().unwrap();
        assert_eq!(options.enum_type, EnumStrategy::Branded);
        assert_eq!(options.nullable_type, NullableStyle::NullAndUndefined);
        assert_eq!(options.array_type, ArrayStyle::Bracket);
    }

    #[test]
    fn module_names_per_input() {
        assert_eq!(module_file_name(Path::new("specs/api.json"), "specs/api.json"), "api.ts");
        assert_eq!(module_file_name(Path::new("specs/api.json"), "specs/api.json#2"), "api.2.ts");
    }

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["x.json", "y.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("x.json"), PathBuf::from("y.json")]);
        assert!(resolve_file_path_patterns(["/definitely/not/here/*.json"]).is_err());
    }
}
