//! Producer process: streams an input file through the selected transport

use clap::Parser;
use mailbench::{Backend, Producer};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "producer")]
#[command(about = "Send each line of a file across the selected IPC backend")]
struct Cli {
    /// Backend selector: 1 = message passing, 2 = shared memory
    mechanism: u32,

    /// Newline-delimited input file
    input: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(backend) = Backend::from_selector(cli.mechanism) else {
        eprintln!("producer: unknown backend selector {} (use 1 or 2)", cli.mechanism);
        return ExitCode::FAILURE;
    };

    let file = match File::open(&cli.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("producer: cannot open {}: {}", cli.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    println!("{}", backend.label());

    let mut producer = match Producer::start(backend) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("producer: {e}");
            return ExitCode::FAILURE;
        }
    };

    for line in BufReader::new(file).lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("producer: read error: {e}");
                return ExitCode::FAILURE;
            }
        };
        println!("Sending message: {line}");
        if let Err(e) = producer.send_line(&line) {
            eprintln!("producer: {e}");
            return ExitCode::FAILURE;
        }
    }

    println!();
    println!("End of input file! exit!");

    match producer.finish() {
        Ok(latency) => {
            println!("Total time taken in sending msg: {latency}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("producer: {e}");
            ExitCode::FAILURE
        }
    }
}
