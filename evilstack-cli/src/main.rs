use anyhow::Context;
use clap::Parser;
use evilstack::asm;
use evilstack::io::StdIo;
use evilstack::vm::{self, VmOptions};
use std::process::ExitCode;
use std::time::Duration;

/// Run an EvilStack program.
#[derive(Parser, Debug)]
#[command()]
struct Args {
    /// File containing an EvilStack program.
    #[arg()]
    file: String,
    /// Maximum operand stack size.
    #[arg(long, short = 'm', default_value_t = 2097152)]
    max_stack_size: usize,
    /// A limit for the number of executed instructions.
    /// If the limit is reached, the program will be stopped with an error.
    #[arg(long, short = 'l')]
    op_limit: Option<u64>,
    /// Print statistics after running the program.
    #[arg(long, short = 's')]
    stats: bool,
}

// Exit codes: 0 success, 1 run-time error, 2 assembly error.
fn main() -> ExitCode {
    let args = Args::parse();

    let source = match read_source(&args.file) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("{:#}", error);
            return ExitCode::from(2);
        }
    };

    let program = match asm::assemble(&source) {
        Ok(program) => program,
        Err(errors) => {
            eprintln!("{}", errors);
            return ExitCode::from(2);
        }
    };

    let options = VmOptions::new(args.op_limit.unwrap_or(u64::MAX), args.max_stack_size);
    let mut io = StdIo::new();

    let start_time = std::time::Instant::now();
    let result = vm::run(&program, &mut io, options);
    let elapsed = start_time.elapsed();

    match result {
        Ok(result) => {
            if args.stats {
                print_stats(result.instruction_counter, elapsed);
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("{}", error);
            ExitCode::from(1)
        }
    }
}

fn read_source(file: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("cannot read {}", file))
}

fn print_stats(instruction_counter: u64, elapsed: Duration) {
    let instructions_per_second = instruction_counter as f64 / elapsed.as_secs_f64();
    eprintln!("Execution time: {:?}", elapsed);
    eprintln!(
        "Instructions executed: {} ({}/s)",
        instruction_counter,
        match instructions_per_second {
            n if n >= 1_000_000.0 => format!("{:.1}M", n / 1_000_000.0),
            n if n >= 1_000.0 => format!("{:.1}k", n / 1_000.0),
            n => format!("{:.1}", n),
        }
    );
}
