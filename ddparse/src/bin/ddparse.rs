use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ddparse::{
    fuzz, oracle, parse_partial_with, suite, trace_with, Exp10Table, FuzzConfig, Precision,
    Sampling, SuiteConfig,
};
use tracing::Level;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(about = "ddparse - correctly rounded decimal to binary conversion and its verification harness")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert numerals and compare them with the reference parser
    Parse {
        /// Numerals to convert
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Target format
        #[arg(long, value_enum, default_value_t = Precision::Double)]
        precision: Precision,

        /// Also print the accumulator and factor before final scaling
        #[arg(long)]
        trace: bool,
    },
    /// Compare random conversions against the reference parser
    Fuzz {
        /// Number of inputs
        #[arg(long, default_value_t = 200_000)]
        samples: usize,

        /// Run seed
        #[arg(long, default_value_t = 1234)]
        seed: u64,

        /// Target format
        #[arg(long, value_enum, default_value_t = Precision::Double)]
        precision: Precision,

        /// Input generator
        #[arg(long, value_enum, default_value_t = Sampling::ShortestRepr)]
        sampling: Sampling,

        /// Inputs per parallel batch
        #[arg(long, default_value_t = 4096)]
        batch_size: usize,

        /// Mismatch examples to print
        #[arg(long, default_value_t = 16)]
        max_reported: usize,
    },
    /// Build or run the regression suite
    Suite {
        #[command(subcommand)]
        command: SuiteCommands,
    },
    /// Print power-of-ten table entries
    Table {
        /// Only print this decimal exponent
        #[arg(long, allow_hyphen_values = true)]
        exponent: Option<i64>,
    },
}

#[derive(Subcommand)]
enum SuiteCommands {
    /// Collect rows and write them as JSON
    Build {
        /// Output file
        #[arg(long, default_value = "dd_suite.json")]
        output: PathBuf,

        /// Failing rows to collect per algorithm
        #[arg(long, default_value_t = 50)]
        fail_quota: usize,

        /// Rows on which every algorithm matches
        #[arg(long, default_value_t = 50)]
        works_all_quota: usize,

        /// Seed for random candidates and shuffling
        #[arg(long, default_value_t = 2025)]
        seed: u64,

        /// Random candidates to try after the sweeps
        #[arg(long, default_value_t = 500_000)]
        max_random_tries: usize,
    },
    /// Re-run a stored suite against the current table
    Run {
        /// Suite file
        #[arg(long, default_value = "dd_suite.json")]
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let table = Exp10Table::global();

    match cli.command {
        Commands::Parse {
            inputs,
            precision,
            trace,
        } => {
            for input in &inputs {
                handle_parse(table, input, precision, trace);
            }
        }
        Commands::Fuzz {
            samples,
            seed,
            precision,
            sampling,
            batch_size,
            max_reported,
        } => {
            let config = FuzzConfig::with_samples(samples)
                .with_seed(seed)
                .with_precision(precision)
                .with_sampling(sampling)
                .with_batch_size(batch_size)
                .with_max_reported(max_reported);
            let report = fuzz::run(table, &config)?;
            print!("{report}");
            if !report.is_clean() {
                return Err(format!("{} conversions disagreed with the reference", report.mismatches).into());
            }
        }
        Commands::Suite {
            command:
                SuiteCommands::Build {
                    output,
                    fail_quota,
                    works_all_quota,
                    seed,
                    max_random_tries,
                },
        } => {
            let config = SuiteConfig::with_quotas(fail_quota, works_all_quota)
                .with_seed(seed)
                .with_max_random_tries(max_random_tries);
            let rows = suite::build(table, &config);
            suite::save(&output, &rows)?;
            println!("Built suite: {} rows. Saved to {}", rows.len(), output.display());
        }
        Commands::Suite {
            command: SuiteCommands::Run { input },
        } => {
            let rows = suite::load(&input)?;
            println!("Loaded {} rows from {}", rows.len(), input.display());
            print!("{}", suite::run(table, &rows));
        }
        Commands::Table { exponent } => handle_table(table, exponent)?,
    }

    Ok(())
}

fn handle_parse(table: &Exp10Table, input: &str, precision: Precision, show_trace: bool) {
    let (value, bits, consumed) = match precision {
        Precision::Double => {
            let conversion = parse_partial_with::<f64, _>(table, input);
            (conversion.value.to_string(), conversion.bits(), conversion.consumed)
        }
        Precision::Single => {
            let conversion = parse_partial_with::<f32, _>(table, input);
            (conversion.value.to_string(), conversion.bits(), conversion.consumed)
        }
    };

    println!("{input:?} ({precision})");
    println!("  value:    {value}");
    println!("  bits:     {}", suite::format_hex_bits(bits));
    println!("  consumed: {consumed}/{}", input.len());
    match oracle::oracle_bits(precision, input) {
        Ok(expected) if expected == bits => println!("  reference: match"),
        Ok(expected) => println!("  reference: MISMATCH, expected {}", suite::format_hex_bits(expected)),
        Err(err) => println!("  reference: {err}"),
    }

    if show_trace {
        match trace_with(table, input) {
            Some(trace) => {
                println!(
                    "  trace:    exponent {} (index {}), accumulator ({:e}, {:e}), factor 2^{}",
                    trace.decimal_exponent,
                    trace.table_index,
                    trace.accumulator.high,
                    trace.accumulator.low,
                    trace.factor_exponent
                );
                println!(
                    "  collapsed: {}",
                    suite::format_hex_bits(oracle::collapsed_bits(&trace, precision))
                );
            }
            None => println!("  trace:    none"),
        }
    }
}

fn handle_table(table: &Exp10Table, exponent: Option<i64>) -> Result<(), Box<dyn std::error::Error>> {
    let print_entry = |exponent: i32, entry: &ddparse::PowerOfTenEntry| {
        println!(
            "{exponent:>5}  high {:>17}  low {:<22e}  factor 2^{}",
            entry.magnitude.high,
            entry.magnitude.low,
            entry.factor_exponent
        );
    };

    match exponent {
        Some(exponent) => {
            let entry = table
                .get(exponent)
                .ok_or_else(|| format!("exponent {exponent} is outside the table"))?;
            print_entry(exponent as i32, entry);
        }
        None => {
            for (exponent, entry) in table.iter() {
                print_entry(exponent, entry);
            }
        }
    }
    Ok(())
}
