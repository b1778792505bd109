//! # POML Command Line Interface
//!
//! A thin CLI wrapper around the `poml` library (`spec.md` §6). Argument
//! parsing and I/O live here; all compilation logic lives in the library.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write as IoWrite};
use std::path::{Path, PathBuf};

use clap::Parser;

use poml::resolver::FsResolver;
use poml::stylesheet::Stylesheet;
use poml::trace::TraceFile;
use poml::value::{Context, Value};
use poml::writer::{TruncateFrom, WriteOptions};
use poml::{reader::ReadOptions, write_with_source_map};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Inline POML source; pass "-" to read from stdin.
    #[arg(long)]
    input: Option<String>,

    /// Path to a POML source file.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Output path; stdout if omitted.
    #[arg(long)]
    output: Option<PathBuf>,

    /// `KEY=VAL` context binding, repeatable.
    #[arg(long = "context", value_name = "KEY=VAL")]
    context: Vec<String>,

    /// JSON file of context bindings.
    #[arg(long)]
    context_file: Option<PathBuf>,

    /// Inline JSON stylesheet.
    #[arg(long)]
    stylesheet: Option<String>,

    /// JSON file of stylesheet rules.
    #[arg(long)]
    stylesheet_file: Option<PathBuf>,

    /// Collapse interpolation whitespace.
    #[arg(long)]
    trim: bool,

    /// Emit per-speaker messages instead of raw text.
    #[arg(long)]
    speaker_mode: bool,

    /// Pretty-print HTML/JSON/YAML/XML output.
    #[arg(long)]
    pretty_print: bool,

    /// Exit non-zero on the first recorded error.
    #[arg(long)]
    strict: bool,

    /// Resolution root for relative `src=` paths and side files.
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Directory to write `{id}.trace.json` files into.
    #[arg(long)]
    trace_dir: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(message) = run(args) {
        eprintln!("{}", message);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), String> {
    let cwd = args.cwd.clone().unwrap_or_else(|| PathBuf::from("."));

    let source = load_source(&args)?;
    let source_path = args.file.clone();

    let mut ctx = Context::new();
    load_context(&args, source_path.as_deref(), &mut ctx)?;

    let stylesheet = load_stylesheet(&args, source_path.as_deref())?;

    let options = ReadOptions {
        trim: args.trim,
        cwd: cwd.clone(),
    };
    let resolver = FsResolver;

    let compiled = poml::read(&source, source_path.as_deref(), &options, &mut ctx, &stylesheet, &resolver);

    let write_opts = WriteOptions {
        trim: args.trim,
        pretty_print: args.pretty_print,
        truncate_from: TruncateFrom::End,
        ..WriteOptions::default()
    };

    let mapped = write_with_source_map(&compiled.ir, &write_opts);

    let mut all_errors = compiled.errors.into_vec();
    all_errors.extend(mapped.errors.clone());

    if let Some(dir) = &args.trace_dir {
        write_trace(dir, &source, &ctx, &stylesheet, source_path.as_deref(), &mapped.result.output)?;
    }

    let rendered = if args.speaker_mode {
        render_messages(&mapped.messages)
    } else {
        mapped.result.output.clone()
    };

    emit(&args.output, &rendered)?;

    if args.strict {
        if let Some(first) = all_errors.first() {
            return Err(first.to_string());
        }
    }

    Ok(())
}

fn load_source(args: &Args) -> Result<String, String> {
    if let Some(input) = &args.input {
        if input == "-" {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {}", e))?;
            return Ok(buf);
        }
        return Ok(input.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e));
    }
    Err("one of --input or --file is required".to_string())
}

fn load_context(args: &Args, source_path: Option<&Path>, ctx: &mut Context) -> Result<(), String> {
    let mut object = BTreeMap::new();

    let side_file = source_path.map(side_file_path(".context.json"));
    let explicit = args.context_file.clone().or(side_file.filter(|p| p.exists()));
    if let Some(path) = explicit {
        let bytes = fs::read(&path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        let value = poml::jsonbuf::parse(&bytes).map_err(|e| e.to_string())?;
        if let Value::Object(map) = value {
            object.extend(map);
        }
    }

    for kv in &args.context {
        let (key, raw) = kv
            .split_once('=')
            .ok_or_else(|| format!("malformed --context \"{}\", expected KEY=VAL", kv))?;
        let value = poml::jsonbuf::parse_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        object.insert(key.to_string(), value);
    }

    ctx.merge_object_into_globals(object);
    Ok(())
}

fn load_stylesheet(args: &Args, source_path: Option<&Path>) -> Result<Stylesheet, String> {
    let side_file = source_path.map(side_file_path(".stylesheet.json"));

    let text = if let Some(inline) = &args.stylesheet {
        Some(inline.clone())
    } else if let Some(path) = &args.stylesheet_file {
        Some(fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?)
    } else if let Some(path) = side_file.filter(|p| p.exists()) {
        Some(fs::read_to_string(&path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?)
    } else {
        None
    };

    let Some(text) = text else {
        return Ok(Stylesheet::new());
    };

    let value = poml::jsonbuf::parse_str(&text).map_err(|e| e.to_string())?;
    let Value::Object(rules) = value else {
        return Ok(Stylesheet::new());
    };

    let mut map = BTreeMap::new();
    for (selector, attrs) in rules {
        if let Value::Object(attrs) = attrs {
            map.insert(selector, attrs);
        }
    }
    Ok(Stylesheet::from_map(map))
}

fn side_file_path(suffix: &'static str) -> impl Fn(&Path) -> PathBuf {
    move |source_path: &Path| {
        let stem = source_path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        source_path.with_file_name(format!("{}{}", stem, suffix))
    }
}

fn write_trace(
    dir: &Path,
    input: &str,
    ctx: &Context,
    stylesheet: &Stylesheet,
    source_path: Option<&Path>,
    pretty_output: &str,
) -> Result<(), String> {
    fs::create_dir_all(dir).map_err(|e| format!("failed to create {}: {}", dir.display(), e))?;
    let id = chrono::Utc::now().format("%Y%m%dT%H%M%S%.fZ").to_string();
    let trace = TraceFile::new(
        input,
        &context_as_value(ctx),
        &stylesheet_as_value(stylesheet),
        source_path.map(Path::to_path_buf),
        &Value::String(pretty_output.to_string()),
        pretty_output,
    );
    let json = trace.to_json_string().map_err(|e| e.to_string())?;
    let path = TraceFile::path_for(dir, &id);
    fs::write(&path, json).map_err(|e| format!("failed to write {}: {}", path.display(), e))
}

fn context_as_value(ctx: &Context) -> Value {
    Value::Object(ctx.snapshot())
}

fn stylesheet_as_value(stylesheet: &Stylesheet) -> Value {
    let map: BTreeMap<String, Value> = stylesheet
        .rules()
        .iter()
        .map(|(selector, attrs)| (selector.clone(), Value::Object(attrs.clone())))
        .collect();
    Value::Object(map)
}

fn render_messages(messages: &[poml::message::Message]) -> String {
    let mut out = String::new();
    for msg in messages {
        let text = match &msg.content {
            poml::message::RichContent::Text(t) => t.clone(),
            poml::message::RichContent::Parts(parts) => parts
                .iter()
                .map(|p| match p {
                    poml::message::ContentPart::Text(t) => t.clone(),
                    poml::message::ContentPart::Media(m) => format!("<{}>", m.media_type),
                })
                .collect::<Vec<_>>()
                .join(""),
        };
        out.push_str(&format!("[{}] {}\n", msg.speaker.as_str(), text));
    }
    out
}

fn emit(output: &Option<PathBuf>, rendered: &str) -> Result<(), String> {
    match output {
        Some(path) => fs::write(path, rendered).map_err(|e| format!("failed to write {}: {}", path.display(), e)),
        None => {
            print!("{}", rendered);
            io::stdout().flush().map_err(|e| e.to_string())
        }
    }
}
