use clap::{ArgAction, Parser};
use colored::Colorize;
use docexpr_lang::{Backend, Collation, Document, Engine, Expression, Options, ParseOptions, Value};
use itertools::Itertools;
use miette::{IntoDiagnostic, miette};
use std::io::{self, BufWriter, IsTerminal, Read, Write};
use std::{fs, path::PathBuf};

#[derive(Parser, Debug, Default)]
#[command(name = "docexpr")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = "# Examples:\n\n\
    ## To read a field from every document:\n\
    docexpr '$.name' users.json\n\n\
    ## To count documents from stdin:\n\
    cat users.json | docexpr --aggregate 'COUNT(*)'\n\n\
    ## To bind a parameter:\n\
    docexpr --param min=18 '$.age >= @min' users.json\n\n\
    ## To show how an expression was parsed:\n\
    docexpr --explain '$.a.b[*] ANY = 20'")]
#[command(
    about = "docexpr evaluates document expressions against JSON documents.",
    long_about = None
)]
pub struct Cli {
    /// Backend used to compile the expression
    #[arg(short, long)]
    backend: Option<Backend>,

    /// String comparison rules: `binary` or `ignorecase`
    #[arg(short, long, default_value_t = Collation::default())]
    collation: Collation,

    /// Bind a parameter as NAME=JSON (repeatable)
    #[arg(short, long = "param", value_name = "NAME=JSON")]
    params: Vec<String>,

    /// Evaluate once over all documents instead of once per document
    #[arg(short = 'A', long, default_value_t = false)]
    aggregate: bool,

    /// Print the parsed expression instead of evaluating it
    #[arg(long, default_value_t = false)]
    explain: bool,

    /// Print each result on a single line
    #[arg(long, default_value_t = false)]
    compact: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[arg(value_name = "EXPRESSION")]
    expression: String,
    files: Vec<PathBuf>,
}

impl Cli {
    /// Installs a stderr subscriber filtered by `DOCEXPR_LOG`, falling back to
    /// the level picked by `-v`.
    pub fn init_tracing(&self) {
        let level = match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("DOCEXPR_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
            )
            .with_writer(io::stderr)
            .try_init();
    }

    pub fn run(&self) -> miette::Result<()> {
        let engine = self.create_engine();
        let options = ParseOptions {
            parameters: self.parameters()?,
            ..Default::default()
        };
        let expression = engine.compile_with(&self.expression, &options).map_err(miette::Report::new)?;

        if self.explain {
            return self.print_explain(&expression);
        }

        let documents = self.read_documents()?;
        tracing::debug!(documents = documents.len(), aggregate = self.aggregate, "evaluating");

        let results = if self.aggregate {
            expression
                .execute_source(&documents, &self.collation)
                .map_err(miette::Report::new)?
        } else {
            documents
                .iter()
                .map(|document| expression.execute_document(document, &self.collation))
                .flatten_ok()
                .collect::<Result<Vec<_>, _>>()
                .map_err(miette::Report::new)?
        };

        self.print(&results)
    }

    fn create_engine(&self) -> Engine {
        let mut options = Options {
            cache: false,
            ..Default::default()
        };

        if let Some(backend) = self.backend {
            options.backend = backend;
        }

        Engine::new(options)
    }

    fn parameters(&self) -> miette::Result<Document> {
        self.params
            .iter()
            .map(|param| {
                let (name, json) = param
                    .split_once('=')
                    .ok_or_else(|| miette!("Invalid parameter `{}`, expected NAME=JSON", param))?;
                let value = serde_json::from_str::<serde_json::Value>(json)
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::from(json));

                Ok((name.trim().to_string(), value))
            })
            .collect()
    }

    fn read_documents(&self) -> miette::Result<Vec<Value>> {
        let contents = if self.files.is_empty() {
            if io::stdin().is_terminal() {
                return Ok(vec![Value::Null]);
            }

            let mut input = String::new();
            io::stdin().read_to_string(&mut input).into_diagnostic()?;
            vec![input]
        } else {
            self.files
                .iter()
                .map(|file| {
                    if !file.exists() {
                        return Err(miette!("File not found: {}", file.display()));
                    }
                    fs::read_to_string(file).into_diagnostic()
                })
                .collect::<miette::Result<Vec<_>>>()?
        };

        contents
            .iter()
            .flat_map(|content| serde_json::Deserializer::from_str(content).into_iter::<serde_json::Value>())
            .map(|json| json.map(Value::from).into_diagnostic())
            .collect()
    }

    fn print(&self, values: &[Value]) -> miette::Result<()> {
        let stdout = io::stdout();
        let mut handle = BufWriter::new(stdout.lock());

        for value in values {
            let json = value.to_json();
            let text = if self.compact {
                serde_json::to_string(&json)
            } else {
                serde_json::to_string_pretty(&json)
            }
            .into_diagnostic()?;

            writeln!(handle, "{}", text).into_diagnostic()?;
        }

        handle.flush().into_diagnostic()
    }

    fn print_explain(&self, expression: &Expression) -> miette::Result<()> {
        let stdout = io::stdout();
        let mut handle = BufWriter::new(stdout.lock());

        let lines = [
            ("type", expression.ty().to_string()),
            ("scalar", expression.is_scalar().to_string()),
            ("immutable", expression.is_immutable().to_string()),
            ("use_source", expression.use_source().to_string()),
            ("fields", expression.fields().iter().join(", ")),
            ("backend", expression.backend().to_string()),
            ("source", expression.source().to_string()),
        ];

        for (label, value) in lines {
            writeln!(handle, "{}: {}", label.bold().cyan(), value).into_diagnostic()?;
        }

        handle.flush().into_diagnostic()
    }
}
