//! Consumer process: prints received messages until the sentinel arrives

use clap::Parser;
use mailbench::{Backend, Consumer};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "consumer")]
#[command(about = "Receive and print messages from the producer; must use the same backend")]
struct Cli {
    /// Backend selector: 1 = message passing, 2 = shared memory
    /// (must match the producer's)
    mechanism: u32,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(backend) = Backend::from_selector(cli.mechanism) else {
        eprintln!("consumer: unknown backend selector {} (use 1 or 2)", cli.mechanism);
        return ExitCode::FAILURE;
    };

    println!("{}", backend.label());

    let mut consumer = match Consumer::attach(backend) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("consumer: {e}");
            return ExitCode::FAILURE;
        }
    };

    loop {
        match consumer.next_line() {
            Ok(Some(line)) => println!("Receiving message: {line}"),
            Ok(None) => break,
            Err(e) => {
                eprintln!("consumer: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    println!("Producer exit!");
    println!("Total time taken in receiving msg: {}", consumer.into_latency());
    ExitCode::SUCCESS
}
