use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::{Value, json};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yedit_core::{ContentType, EditOperation, FormatMode, Request, State};

#[derive(Parser, Debug)]
#[command(
    name = "yedit",
    about = "Query and edit YAML/JSON files by dotted path (e.g. a.b[0].c)",
    version
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the value at --key (or the whole document)
    Get(GetArgs),
    /// Ensure a value is present: put, update (--update) or append (--append)
    Set(SetArgs),
    /// Ensure a key or item is absent
    Remove(RemoveArgs),
    /// Run a full request read from a YAML or JSON file
    Run(RunArgs),
}

#[derive(ClapArgs, Debug)]
struct DocArgs {
    /// File to load and write back
    path: Option<PathBuf>,
    /// Inline document used instead of the file contents
    #[arg(long)]
    content: Option<String>,
    /// yaml or json
    #[arg(long, default_value = "yaml")]
    content_type: String,
    /// Path delimiter (one of . # | :)
    #[arg(long, default_value_t = '.')]
    separator: char,
    /// Copy the file to <file>.<timestamp> before replacing it
    #[arg(long, default_value_t = false)]
    backup: bool,
    /// Sort mapping keys instead of keeping source order
    #[arg(long, default_value_t = false)]
    plain: bool,
}

#[derive(ClapArgs, Debug)]
struct GetArgs {
    #[command(flatten)]
    doc: DocArgs,
    /// Path to read, e.g. a.b[0].c
    #[arg(long, default_value = "")]
    key: String,
}

#[derive(ClapArgs, Debug)]
struct SetArgs {
    #[command(flatten)]
    doc: DocArgs,
    /// Path to write, e.g. a.b[0].c
    #[arg(long, default_value = "")]
    key: String,
    /// New value; parsed as YAML unless --value-type str
    #[arg(long)]
    value: Option<String>,
    /// bool or str
    #[arg(long)]
    value_type: Option<String>,
    /// Merge into a mapping / replace an item of a sequence
    #[arg(long, default_value_t = false, conflicts_with = "append")]
    update: bool,
    /// Append to the sequence at --key
    #[arg(long, default_value_t = false)]
    append: bool,
    /// Sequence position to replace with --update
    #[arg(long, allow_hyphen_values = true)]
    index: Option<i64>,
    /// Sequence item to replace with --update
    #[arg(long)]
    curr_value: Option<String>,
    /// yaml or json, when --curr-value is a serialized document
    #[arg(long)]
    curr_value_format: Option<String>,
    /// YAML/JSON file holding a list of edits
    #[arg(long, value_name = "FILE", conflicts_with = "value")]
    edits: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct RemoveArgs {
    #[command(flatten)]
    doc: DocArgs,
    /// Path to remove, e.g. a.b[0]
    #[arg(long, default_value = "")]
    key: String,
    /// Item (sequence) or key (mapping) to remove
    #[arg(long)]
    value: Option<String>,
    /// Position to remove from a root sequence
    #[arg(long, allow_hyphen_values = true)]
    index: Option<i64>,
    /// Pop --value out of the container at --key instead of deleting --key
    #[arg(long, default_value_t = false)]
    update: bool,
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// Request file (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    request: PathBuf,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yedit_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let req = match cli.cmd {
        Cmd::Get(a) => get_request(a),
        Cmd::Set(a) => set_request(a),
        Cmd::Remove(a) => remove_request(a),
        Cmd::Run(a) => run_request(a),
    }
    .unwrap_or_else(|e| fail(&format!("{:#}", e), 2));

    match yedit_core::run(&req) {
        Ok(resp) => match serde_json::to_string_pretty(&resp) {
            Ok(s) => println!("{}", s),
            Err(e) => fail(&e.to_string(), 3),
        },
        Err(e) => fail(&e.to_string(), 1),
    }
}

fn fail(msg: &str, code: i32) -> ! {
    let out = json!({ "failed": true, "msg": msg });
    println!("{}", out);
    std::process::exit(code);
}

fn base_request(doc: DocArgs, state: State) -> anyhow::Result<Request> {
    let content_type: ContentType = doc.content_type.parse()?;
    Ok(Request {
        src: doc.path,
        content: doc.content.map(Value::String),
        content_type,
        separator: doc.separator,
        state,
        backup: doc.backup,
        format: if doc.plain {
            FormatMode::Plain
        } else {
            FormatMode::Preserve
        },
        ..Request::default()
    })
}

fn get_request(args: GetArgs) -> anyhow::Result<Request> {
    let mut req = base_request(args.doc, State::List)?;
    req.key = args.key;
    Ok(req)
}

fn set_request(args: SetArgs) -> anyhow::Result<Request> {
    let mut req = base_request(args.doc, State::Present)?;
    req.key = args.key;
    req.value = args.value.map(Value::String);
    req.value_type = args.value_type;
    req.update = args.update;
    req.append = args.append;
    req.index = args.index;
    req.curr_value = args.curr_value.map(Value::String);
    req.curr_value_format = args.curr_value_format;
    if let Some(path) = args.edits {
        let text = std::fs::read_to_string(&path)?;
        let edits: Vec<EditOperation> = serde_yaml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("invalid edits in {}: {}", path.display(), e))?;
        req.edits = Some(edits);
    }
    Ok(req)
}

fn remove_request(args: RemoveArgs) -> anyhow::Result<Request> {
    let mut req = base_request(args.doc, State::Absent)?;
    req.key = args.key;
    // Items are matched by value, so `--value 3` must be the number 3.
    req.value = args
        .value
        .map(|v| yedit_core::parse_value(Value::String(v), None))
        .transpose()?;
    req.index = args.index;
    req.update = args.update;
    Ok(req)
}

fn run_request(args: RunArgs) -> anyhow::Result<Request> {
    let text = std::fs::read_to_string(&args.request)?;
    let req: Request = serde_yaml::from_str(&text)
        .map_err(|e| anyhow::anyhow!("invalid request {}: {}", args.request.display(), e))?;
    tracing::debug!(request = %args.request.display(), state = ?req.state, "loaded request");
    Ok(req)
}
