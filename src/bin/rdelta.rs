//! src/bin/rdelta.rs
//!
//! Command-line front end for the streaming signature/delta/patch pipelines.

use std::io;
use std::num::{NonZeroU8, NonZeroU32};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgMatches, Command, value_parser};
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

use signature::SignatureFormat;
use transfer::{DeltaStream, Error, SignatureStream, SyncOptions, load_signature};

fn cli() -> Command {
    Command::new("rdelta")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Streaming rsync-style signature, delta, and patch tool")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("buffer-size")
                .long("buffer-size")
                .value_name("BYTES")
                .value_parser(value_parser!(usize))
                .global(true)
                .help("I/O buffer granularity"),
        )
        .arg(
            Arg::new("block-size")
                .long("block-size")
                .value_name("BYTES")
                .value_parser(value_parser!(NonZeroU32))
                .global(true)
                .help("Signature block length (default: derived from the source size)"),
        )
        .arg(
            Arg::new("strong-length")
                .long("strong-length")
                .value_name("BYTES")
                .value_parser(value_parser!(NonZeroU8))
                .global(true)
                .help("Truncate stored strong checksums to this many bytes"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_parser(["md4", "md5"])
                .global(true)
                .help("Strong checksum family embedded in signatures"),
        )
        .subcommand(
            Command::new("signature")
                .about("Fingerprint a basis file")
                .arg(
                    Arg::new("basis")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(output_arg("signature file to write")),
        )
        .subcommand(
            Command::new("delta")
                .about("Describe a new file relative to a basis signature")
                .arg(
                    Arg::new("signature")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("new")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(output_arg("delta file to write")),
        )
        .subcommand(
            Command::new("patch")
                .about("Rebuild the new file from basis plus delta")
                .arg(
                    Arg::new("basis")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("delta")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(output_arg("reconstructed file to write (replaced atomically)")),
        )
}

fn output_arg(help: &str) -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("PATH")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(help.to_owned())
}

fn options_from(matches: &ArgMatches) -> SyncOptions {
    let mut options = SyncOptions::new();
    if let Some(&buffer_size) = matches.get_one::<usize>("buffer-size") {
        options = options.with_buffer_size(buffer_size);
    }
    if let Some(&block_length) = matches.get_one::<NonZeroU32>("block-size") {
        options = options.with_block_length(block_length);
    }
    if let Some(&strong_length) = matches.get_one::<NonZeroU8>("strong-length") {
        options = options.with_strong_length(strong_length);
    }
    if let Some(format) = matches.get_one::<String>("format") {
        options = options.with_format(match format.as_str() {
            "md4" => SignatureFormat::Md4,
            _ => SignatureFormat::Md5,
        });
    }
    options
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let matches = cli().get_matches();
    match run(&matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("rdelta: {error}");
            let mut source = std::error::Error::source(&error);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(matches: &ArgMatches) -> Result<(), Error> {
    match matches.subcommand() {
        Some(("signature", sub)) => signature_command(sub).await,
        Some(("delta", sub)) => delta_command(sub).await,
        Some(("patch", sub)) => patch_command(sub).await,
        _ => unreachable!("subcommand is required by the parser"),
    }
}

async fn signature_command(matches: &ArgMatches) -> Result<(), Error> {
    let basis = matches.get_one::<PathBuf>("basis").expect("required arg");
    let output = matches.get_one::<PathBuf>("output").expect("required arg");

    let mut stream = SignatureStream::for_path(basis, options_from(matches));
    let mut sink = create_sink(output).await?;
    while let Some(chunk) = stream.next_chunk().await {
        let chunk = chunk?;
        sink.write_all(&chunk)
            .await
            .map_err(|source| Error::SinkWrite { source })?;
    }
    sink.flush()
        .await
        .map_err(|source| Error::SinkWrite { source })
}

async fn delta_command(matches: &ArgMatches) -> Result<(), Error> {
    let signature_path = matches
        .get_one::<PathBuf>("signature")
        .expect("required arg");
    let new_path = matches.get_one::<PathBuf>("new").expect("required arg");
    let output = matches.get_one::<PathBuf>("output").expect("required arg");

    let sig_bytes = read_input(signature_path).await?;
    let handle = load_signature(&sig_bytes)?;

    let mut stream = DeltaStream::for_path(new_path, &handle, options_from(matches));
    let mut sink = create_sink(output).await?;
    while let Some(chunk) = stream.next_chunk().await {
        let chunk = chunk?;
        sink.write_all(&chunk)
            .await
            .map_err(|source| Error::SinkWrite { source })?;
    }
    sink.flush()
        .await
        .map_err(|source| Error::SinkWrite { source })
}

async fn patch_command(matches: &ArgMatches) -> Result<(), Error> {
    let basis = matches.get_one::<PathBuf>("basis").expect("required arg");
    let delta_path = matches.get_one::<PathBuf>("delta").expect("required arg");
    let output = matches.get_one::<PathBuf>("output").expect("required arg");

    let delta = read_input(delta_path).await?;
    transfer::apply_delta_to_path(&delta, basis, output, options_from(matches)).await?;
    Ok(())
}

async fn read_input(path: &PathBuf) -> Result<Vec<u8>, Error> {
    tokio::fs::read(path).await.map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            Error::SourceNotFound { path: path.clone() }
        } else {
            Error::SourceOpen {
                path: path.clone(),
                source,
            }
        }
    })
}

async fn create_sink(path: &PathBuf) -> Result<tokio::fs::File, Error> {
    tokio::fs::File::create(path)
        .await
        .map_err(|source| Error::SinkWrite { source })
}
