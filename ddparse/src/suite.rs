//! Regression suite of double-precision conversions
//!
//! A suite is a JSON array of rows. Each row keeps the input text, the
//! intermediate accumulator and factor exponent, and the bits every finishing
//! algorithm produced when the row was recorded. The builder collects a
//! quota of rows on which each algorithm disagrees with the reference plus
//! a quota of rows on which all of them agree.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ddparse_core::{trace_with, Exp10Table, Trace};
use hashbrown::HashSet;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{HarnessError, Result};
use crate::oracle::{self, Precision};

/// Bit pattern of the smallest positive normal double
pub const MIN_NORMAL_BITS: u64 = 0x0010_0000_0000_0000;

const SIGN_BIT: u64 = 1 << 63;

/// Render a bit pattern as `0x` followed by 16 hex digits
pub fn format_hex_bits(bits: u64) -> String {
    format!("{bits:#018x}")
}

/// Parse the output of [`format_hex_bits`]
pub fn parse_hex_bits(text: &str) -> Result<u64> {
    let digits = text
        .strip_prefix("0x")
        .filter(|digits| digits.len() == 16)
        .ok_or_else(|| HarnessError::MalformedBits(text.to_owned()))?;
    u64::from_str_radix(digits, 16).map_err(|_| HarnessError::MalformedBits(text.to_owned()))
}

/// Serde adapter storing `u64` bit patterns as hex strings
pub mod hex_bits {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bits: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_hex_bits(*bits))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_hex_bits(&text).map_err(D::Error::custom)
    }
}

/// Serde adapter storing `f64` values by their exact bit pattern
pub mod hex_float {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        super::hex_bits::serialize(&value.to_bits(), serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        super::hex_bits::deserialize(deserializer).map(f64::from_bits)
    }
}

/// Ways of finishing a conversion from its trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// The exact single-rounding scaler
    Exact,
    /// `to_scalar(accumulator) * 2^k`
    Collapsed,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Exact, Algorithm::Collapsed];

    /// Signed double bits produced from `trace`
    pub fn evaluate(self, trace: &Trace) -> u64 {
        match self {
            Algorithm::Exact => trace.value::<f64>().to_bits(),
            Algorithm::Collapsed => oracle::collapsed_bits(trace, Precision::Double),
        }
    }

    fn slot(self) -> usize {
        match self {
            Algorithm::Exact => 0,
            Algorithm::Collapsed => 1,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Exact => write!(f, "exact"),
            Algorithm::Collapsed => write!(f, "collapsed"),
        }
    }
}

/// Bits one algorithm produced for a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmResult {
    pub algorithm: Algorithm,
    #[serde(with = "hex_bits")]
    pub bits: u64,
    pub matches_oracle: bool,
}

/// Group a row was collected for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignment {
    /// Every algorithm matched the reference
    WorksAll,
    /// Counted towards the failure quota of this algorithm
    Fails(Algorithm),
}

/// One recorded conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionRow {
    #[serde(with = "hex_bits")]
    pub original_bits: u64,
    pub input: String,
    pub decimal_exponent: i32,
    pub table_index: usize,
    #[serde(with = "hex_float")]
    pub accumulator_high: f64,
    #[serde(with = "hex_float")]
    pub accumulator_low: f64,
    pub factor_exponent: i32,
    pub results: Vec<AlgorithmResult>,
    pub assigned: Option<Assignment>,
}

impl RegressionRow {
    /// Record the conversion of the shortest rendering of `bits`
    ///
    /// Returns `None` for values without a trace (zero and non-finite).
    pub fn record(table: &Exp10Table, bits: u64) -> Option<Self> {
        let input = oracle::shortest_repr(Precision::Double, bits);
        let trace = trace_with(table, &input)?;
        let results = Algorithm::ALL
            .iter()
            .map(|&algorithm| {
                let produced = algorithm.evaluate(&trace);
                AlgorithmResult {
                    algorithm,
                    bits: produced,
                    matches_oracle: produced == bits,
                }
            })
            .collect();

        Some(Self {
            original_bits: bits,
            input,
            decimal_exponent: trace.decimal_exponent,
            table_index: trace.table_index,
            accumulator_high: trace.accumulator.high,
            accumulator_low: trace.accumulator.low,
            factor_exponent: trace.factor_exponent,
            results,
            assigned: None,
        })
    }

    /// Algorithms that disagreed with the reference when recorded
    pub fn failing(&self) -> impl Iterator<Item = Algorithm> + '_ {
        self.results
            .iter()
            .filter(|result| !result.matches_oracle)
            .map(|result| result.algorithm)
    }

    /// Whether the stored intermediate state differs from `trace`
    fn is_stale(&self, trace: &Trace) -> bool {
        self.accumulator_high.to_bits() != trace.accumulator.high.to_bits()
            || self.accumulator_low.to_bits() != trace.accumulator.low.to_bits()
            || self.factor_exponent != trace.factor_exponent
            || self.table_index != trace.table_index
    }
}

/// Quotas and seed for building a suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Failing rows to collect per algorithm
    pub fail_quota: usize,
    /// Rows on which every algorithm matches
    pub works_all_quota: usize,
    /// Seed for random candidates and the final shuffle
    pub seed: u64,
    /// Upper bound on random candidates once the sweeps are done
    pub max_random_tries: usize,
}

impl SuiteConfig {
    /// Create a config with both quotas set
    pub fn with_quotas(fail_quota: usize, works_all_quota: usize) -> Self {
        Self {
            fail_quota,
            works_all_quota,
            ..Self::default()
        }
    }

    /// Set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the random candidate budget
    pub fn with_max_random_tries(mut self, max_random_tries: usize) -> Self {
        self.max_random_tries = max_random_tries;
        self
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            fail_quota: 50,
            works_all_quota: 50,
            seed: 2025,
            max_random_tries: 500_000,
        }
    }
}

struct SuiteBuilder<'a> {
    table: &'a Exp10Table,
    config: &'a SuiteConfig,
    failures: [Vec<RegressionRow>; 2],
    works_all: Vec<RegressionRow>,
    seen: HashSet<u64>,
}

impl<'a> SuiteBuilder<'a> {
    fn new(table: &'a Exp10Table, config: &'a SuiteConfig) -> Self {
        Self {
            table,
            config,
            failures: [Vec::new(), Vec::new()],
            works_all: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn targets_met(&self) -> bool {
        self.works_all.len() >= self.config.works_all_quota
            && self
                .failures
                .iter()
                .all(|rows| rows.len() >= self.config.fail_quota)
    }

    /// Record `bits` and keep the row if some quota still needs it
    fn offer(&mut self, bits: u64) -> bool {
        if self.seen.contains(&bits) {
            return false;
        }
        let Some(mut row) = RegressionRow::record(self.table, bits) else {
            return false;
        };

        let candidate = row
            .failing()
            .filter(|algorithm| self.failures[algorithm.slot()].len() < self.config.fail_quota)
            .min_by_key(|algorithm| self.failures[algorithm.slot()].len());
        let failed = row.failing().next().is_some();

        match candidate {
            Some(algorithm) => {
                row.assigned = Some(Assignment::Fails(algorithm));
                self.failures[algorithm.slot()].push(row);
            }
            None if !failed && self.works_all.len() < self.config.works_all_quota => {
                row.assigned = Some(Assignment::WorksAll);
                self.works_all.push(row);
            }
            None => return false,
        }
        self.seen.insert(bits);
        true
    }

    fn finish(self, rng: &mut StdRng) -> Vec<RegressionRow> {
        for algorithm in Algorithm::ALL {
            info!(
                %algorithm,
                rows = self.failures[algorithm.slot()].len(),
                "assigned failures"
            );
        }
        info!(rows = self.works_all.len(), "assigned works_all");

        let longest = self.failures.iter().map(Vec::len).max().unwrap_or(0);
        let mut buckets: Vec<_> = self.failures.into_iter().map(Vec::into_iter).collect();
        let mut suite = Vec::new();
        for _ in 0..longest {
            suite.extend(buckets.iter_mut().filter_map(Iterator::next));
        }
        suite.extend(self.works_all);
        suite.shuffle(rng);
        suite
    }
}

/// Build a suite from subnormal sweeps, the normal boundary and random values
pub fn build(table: &Exp10Table, config: &SuiteConfig) -> Vec<RegressionRow> {
    let mut builder = SuiteBuilder::new(table, config);

    // Low subnormal payloads
    for bits in (1..1u64 << 20).step_by(973) {
        if builder.targets_met() {
            break;
        }
        builder.offer(bits);
    }
    debug!(rows = builder.seen.len(), "subnormal sweep done");

    // Upwards from the smallest normal value, both signs
    'boundary: for offset in (0..1u64 << 18).step_by(1019) {
        for sign in [0, SIGN_BIT] {
            if builder.targets_met() {
                break 'boundary;
            }
            builder.offer((MIN_NORMAL_BITS + offset) | sign);
        }
    }
    debug!(rows = builder.seen.len(), "boundary sweep done");

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut tries = 0;
    while !builder.targets_met() && tries < config.max_random_tries {
        tries += 1;
        builder.offer(oracle::random_finite_bits(Precision::Double, &mut rng));
    }
    if !builder.targets_met() {
        info!(tries, "random candidates exhausted before all quotas were met");
    }

    let suite = builder.finish(&mut rng);
    info!(rows = suite.len(), "built suite");
    suite
}

/// Write a suite as pretty-printed JSON
pub fn save(path: impl AsRef<Path>, rows: &[RegressionRow]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| HarnessError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writer.flush().map_err(|e| HarnessError::io(path, e))?;
    Ok(())
}

/// Read a suite written by [`save`]
pub fn load(path: impl AsRef<Path>) -> Result<Vec<RegressionRow>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| HarnessError::io(path, e))?;
    let rows = serde_json::from_reader(BufReader::new(file))?;
    Ok(rows)
}

/// Per-algorithm mismatch count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmTally {
    pub algorithm: Algorithm,
    pub mismatches: usize,
    /// Rows assigned to this algorithm's failure quota
    pub assigned: usize,
}

/// Outcome of re-running a suite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteReport {
    pub rows: usize,
    /// Rows whose input no longer yields a trace
    pub skipped: usize,
    /// Rows whose stored accumulator, factor or index differ from the current table
    pub stale: usize,
    /// Rows whose stored bits disagree with the reference parser
    pub oracle_disagreements: usize,
    pub works_all: usize,
    pub tallies: Vec<AlgorithmTally>,
}

impl SuiteReport {
    /// Mismatch count of one algorithm
    pub fn mismatches(&self, algorithm: Algorithm) -> usize {
        self.tallies
            .iter()
            .find(|tally| tally.algorithm == algorithm)
            .map_or(0, |tally| tally.mismatches)
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary on suite ({} rows):", self.rows)?;
        for tally in &self.tallies {
            writeln!(
                f,
                "  {:<10} vs reference mismatches: {}/{}",
                tally.algorithm.to_string(),
                tally.mismatches,
                self.rows
            )?;
        }
        writeln!(f, "  stored bits vs reference:       {}/{}", self.oracle_disagreements, self.rows)?;
        writeln!(f, "  skipped: {}, stale: {}", self.skipped, self.stale)?;
        writeln!(f, "  assigned groups:")?;
        writeln!(f, "    works_all: {}", self.works_all)?;
        for tally in &self.tallies {
            writeln!(f, "    {}: {}", tally.algorithm, tally.assigned)?;
        }
        Ok(())
    }
}

/// Re-run every algorithm on every row against the current table
pub fn run(table: &Exp10Table, rows: &[RegressionRow]) -> SuiteReport {
    let mut report = SuiteReport {
        rows: rows.len(),
        skipped: 0,
        stale: 0,
        oracle_disagreements: 0,
        works_all: 0,
        tallies: Algorithm::ALL
            .iter()
            .map(|&algorithm| AlgorithmTally {
                algorithm,
                mismatches: 0,
                assigned: 0,
            })
            .collect(),
    };

    for (index, row) in rows.iter().enumerate() {
        match row.assigned {
            Some(Assignment::WorksAll) => report.works_all += 1,
            Some(Assignment::Fails(algorithm)) => report.tallies[algorithm.slot()].assigned += 1,
            None => {}
        }

        let Some(trace) = trace_with(table, &row.input) else {
            debug!(index, input = %row.input, "skipping row without a trace");
            report.skipped += 1;
            continue;
        };
        if row.is_stale(&trace) {
            debug!(index, input = %row.input, "stored intermediate state is stale");
            report.stale += 1;
        }
        match oracle::oracle_bits(Precision::Double, &row.input) {
            Ok(bits) if bits == row.original_bits => {}
            _ => report.oracle_disagreements += 1,
        }

        for algorithm in Algorithm::ALL {
            let bits = algorithm.evaluate(&trace);
            if bits == row.original_bits {
                continue;
            }
            report.tallies[algorithm.slot()].mismatches += 1;
            if algorithm == Algorithm::Exact {
                warn!(
                    index,
                    input = %row.input,
                    expected = format_args!("{:#018x}", row.original_bits),
                    actual = format_args!("{bits:#018x}"),
                    "exact scaler disagrees with stored bits"
                );
            }
        }
    }

    info!(
        rows = report.rows,
        skipped = report.skipped,
        stale = report.stale,
        "suite run finished"
    );
    report
}
