//! Randomized comparison against the reference parser
//!
//! Samples are split into fixed-size batches that run in parallel. Each
//! batch derives its own generator from the run seed and the batch number,
//! so a run is reproducible regardless of how rayon schedules the batches.

use std::fmt;
use std::time::{Duration, Instant};

use ddparse_core::{trace_with, Exp10Table};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HarnessError, Result};
use crate::oracle::{self, Precision};

/// How fuzz inputs are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Sampling {
    /// Shortest round-trip rendering of a random finite value
    #[default]
    ShortestRepr,
    /// Random digit strings with random exponents
    RandomDigits,
}

/// Configuration for a fuzz run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzConfig {
    /// Number of inputs to convert
    pub samples: usize,
    /// Seed for the per-batch generators
    pub seed: u64,
    pub precision: Precision,
    pub sampling: Sampling,
    /// Inputs per parallel batch
    pub batch_size: usize,
    /// Mismatch examples kept in the report
    pub max_reported: usize,
}

impl FuzzConfig {
    /// Create a config for `samples` inputs with default settings
    pub fn with_samples(samples: usize) -> Self {
        Self {
            samples,
            ..Self::default()
        }
    }

    /// Set the run seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the target format
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Set the input generator
    pub fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = sampling;
        self
    }

    /// Set the number of inputs per batch
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set how many mismatch examples are kept
    pub fn with_max_reported(mut self, max_reported: usize) -> Self {
        self.max_reported = max_reported;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(HarnessError::InvalidConfig("batch size must be positive"));
        }
        Ok(())
    }
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            samples: 200_000,
            seed: 1234,
            precision: Precision::Double,
            sampling: Sampling::ShortestRepr,
            batch_size: 4096,
            max_reported: 16,
        }
    }
}

/// One input whose conversion disagreed with the reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mismatch {
    pub input: String,
    pub expected: u64,
    pub actual: u64,
    /// Decimal exponent of the first significant digit, when it is in table range
    pub decimal_exponent: Option<i32>,
}

/// Outcome of a fuzz run
#[derive(Debug, Clone, Default)]
pub struct FuzzReport {
    pub precision: Precision,
    /// Inputs converted
    pub total: usize,
    /// Inputs the reference parser refused; not counted in `total`
    pub rejected: usize,
    pub mismatches: usize,
    /// Highest decimal exponent among mismatching inputs
    pub highest_mismatch_exponent: Option<i32>,
    pub examples: Vec<Mismatch>,
    pub elapsed: Duration,
}

impl FuzzReport {
    /// Whether every conversion matched the reference
    pub fn is_clean(&self) -> bool {
        self.mismatches == 0
    }

    fn merge(mut self, other: Self, max_reported: usize) -> Self {
        self.total += other.total;
        self.rejected += other.rejected;
        self.mismatches += other.mismatches;
        self.highest_mismatch_exponent = self
            .highest_mismatch_exponent
            .max(other.highest_mismatch_exponent);
        let room = max_reported.saturating_sub(self.examples.len());
        self.examples.extend(other.examples.into_iter().take(room));
        self
    }
}

impl fmt::Display for FuzzReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[FUZZ {}] total: {}, time: {:.2?}", self.precision, self.total, self.elapsed)?;
        writeln!(f, "  mismatches vs reference: {}", self.mismatches)?;
        if self.rejected > 0 {
            writeln!(f, "  rejected by reference: {}", self.rejected)?;
        }
        match self.highest_mismatch_exponent {
            Some(exponent) => writeln!(f, "  highest decimal exponent among mismatches: {exponent}")?,
            None => writeln!(f, "  highest decimal exponent among mismatches: -")?,
        }
        for example in &self.examples {
            writeln!(
                f,
                "    {:?}: expected {:#018x}, got {:#018x}",
                example.input, example.expected, example.actual
            )?;
        }
        Ok(())
    }
}

/// Run a fuzz comparison on `table`
pub fn run(table: &Exp10Table, config: &FuzzConfig) -> Result<FuzzReport> {
    config.validate()?;
    info!(
        samples = config.samples,
        seed = config.seed,
        precision = %config.precision,
        sampling = ?config.sampling,
        "starting fuzz run"
    );
    let start = Instant::now();

    let batches = config.samples.div_ceil(config.batch_size);
    let mut report = (0..batches)
        .into_par_iter()
        .map(|batch| {
            let begin = batch * config.batch_size;
            let len = config.batch_size.min(config.samples - begin);
            run_batch(table, config, batch as u64, len)
        })
        .reduce(FuzzReport::default, |a, b| a.merge(b, config.max_reported));

    report.precision = config.precision;
    report.elapsed = start.elapsed();
    info!(
        total = report.total,
        mismatches = report.mismatches,
        elapsed = ?report.elapsed,
        "fuzz run finished"
    );
    Ok(report)
}

/// Seed for one batch, spread with the 64-bit golden ratio
fn batch_seed(seed: u64, batch: u64) -> u64 {
    seed ^ batch.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn run_batch(table: &Exp10Table, config: &FuzzConfig, batch: u64, len: usize) -> FuzzReport {
    let mut rng = StdRng::seed_from_u64(batch_seed(config.seed, batch));
    let precision = config.precision;
    let mut report = FuzzReport::default();

    for _ in 0..len {
        let input = match config.sampling {
            Sampling::ShortestRepr => {
                oracle::shortest_repr(precision, oracle::random_finite_bits(precision, &mut rng))
            }
            Sampling::RandomDigits => oracle::random_digits(precision, &mut rng),
        };
        let expected = match oracle::oracle_bits(precision, &input) {
            Ok(bits) => bits,
            Err(_) => {
                report.rejected += 1;
                continue;
            }
        };
        report.total += 1;

        let actual = oracle::convert_bits(table, precision, &input);
        if actual == expected {
            continue;
        }

        let decimal_exponent = trace_with(table, &input).map(|trace| trace.decimal_exponent);
        warn!(
            input = %input,
            expected = format_args!("{expected:#018x}"),
            actual = format_args!("{actual:#018x}"),
            "conversion mismatch"
        );
        report.mismatches += 1;
        report.highest_mismatch_exponent = report.highest_mismatch_exponent.max(decimal_exponent);
        if report.examples.len() < config.max_reported {
            report.examples.push(Mismatch {
                input,
                expected,
                actual,
                decimal_exponent,
            });
        }
    }
    report
}
