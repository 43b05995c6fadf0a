use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use prost::Message;
use prost_types::compiler::CodeGeneratorRequest;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_logging();

    let args: Vec<_> = std::env::args().collect();

    match args.len() {
        // Invoked by protoc
        1 => run_plugin(),
        3 | 4 => run_descriptor_set(&args[1], &args[2], args.get(3).map(String::as_str).unwrap_or("")),
        _ => {
            print_usage(&args[0]);
            Ok(())
        }
    }
}

fn init_logging() {
    // stdout carries the plugin response
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PROTOCODEC_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn run_plugin() -> Result<()> {
    let mut buf = Vec::new();
    io::stdin().read_to_end(&mut buf)?;

    let request = CodeGeneratorRequest::decode(buf.as_slice())
        .context("couldn't parse CodeGeneratorRequest, run this as a protoc plugin")?;
    tracing::info!(files = request.file_to_generate.len(), "plugin request");

    let response = protocodec::generate_request(&request);
    if let Some(error) = &response.error {
        tracing::error!("{error}");
    }

    io::stdout()
        .write_all(&response.encode_to_vec())
        .context("couldn't write CodeGeneratorResponse to stdout")?;
    Ok(())
}

fn run_descriptor_set(input: &str, out_dir: &str, parameter: &str) -> Result<()> {
    // Read descriptor bytes
    let descriptor_bytes = if input == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        fs::read(input).with_context(|| format!("couldn't read {input}"))?
    };

    tracing::info!(bytes = descriptor_bytes.len(), "read descriptor set");

    let files = protocodec::generate_descriptor_set(&descriptor_bytes, parameter)?;

    for file in files {
        let path = Path::new(out_dir).join(&file.name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &file.content).with_context(|| format!("couldn't write {}", path.display()))?;
        eprintln!("Generated {}", path.display());
    }

    Ok(())
}

fn print_usage(program: &str) {
    eprintln!("protocodec code generator");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  protoc --plugin=protoc-gen-protocodec={program} --protocodec_out=<dir> <files>");
    eprintln!("  {program} <descriptor_set.pb> <out_dir> [parameter]");
    eprintln!("  {program} - <out_dir> [parameter] < descriptor_set.pb");
    eprintln!();
    eprintln!("PARAMETER (comma separated):");
    eprintln!("  runtime_module=<path>   module generated code calls (default crate::protobuf_runtime)");
    eprintln!("  runtime_file=<name>     runtime output file (default protobuf_runtime.rs)");
    eprintln!("  comments=<true|false>   copy .proto comments onto generated items");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("  PROTOCODEC_LOG          tracing filter, e.g. debug (default warn)");
}
