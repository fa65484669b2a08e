//! `protodef-decode`: decode one packet body (stdin) to JSON (stdout).
//!
//! Usage:
//!   protodef-decode --schema <protocol.json> --type <scope:name> [--hex]
//!                   [--options <options.json>] [--protocol <version>]
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use std::io::{self, Read, Write};

use protodef::cli::{decode_to_json, parse_hex, parse_options, read_file, CliError};
use protodef::DecoderOptions;
use tracing_subscriber::EnvFilter;

struct Args {
    schema: String,
    root: String,
    hex: bool,
    options: Option<String>,
    protocol: Option<i32>,
}

fn parse_args(args: &[String]) -> Result<Args, CliError> {
    let mut schema = None;
    let mut root = None;
    let mut hex = false;
    let mut options = None;
    let mut protocol = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--hex" => { hex = true; }
            "--schema" => {
                i += 1;
                schema = args.get(i).cloned();
            }
            "--type" => {
                i += 1;
                root = args.get(i).cloned();
            }
            "--options" => {
                i += 1;
                options = args.get(i).cloned();
            }
            "--protocol" => {
                i += 1;
                let v = args.get(i).ok_or_else(|| CliError::Usage("--protocol needs a value".into()))?;
                protocol = Some(v.parse().map_err(|_| CliError::Usage(format!("bad protocol version: {v}")))?);
            }
            other => return Err(CliError::Usage(format!("unknown argument: {other}"))),
        }
        i += 1;
    }
    Ok(Args {
        schema: schema.ok_or_else(|| CliError::Usage("--schema is required".into()))?,
        root: root.ok_or_else(|| CliError::Usage("--type is required".into()))?,
        hex,
        options,
        protocol,
    })
}

fn run() -> Result<String, CliError> {
    let args: Vec<String> = std::env::args().collect();
    let args = parse_args(&args)?;

    let schema = read_file(&args.schema)?;
    let options = match &args.options {
        Some(path) => parse_options(&read_file(path)?)?,
        None => DecoderOptions::default(),
    };

    let mut body = Vec::new();
    io::stdin().read_to_end(&mut body)?;
    if args.hex {
        body = parse_hex(&String::from_utf8_lossy(&body))?;
    }

    decode_to_json(&schema, &args.root, &body, options, args.protocol)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    match run() {
        Ok(json) => {
            let mut out = io::stdout();
            if let Err(e) = out.write_all(json.as_bytes()).and_then(|_| out.write_all(b"\n")) {
                eprintln!("{}", CliError::Io(e));
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
