//! Power-of-ten table
//!
//! Maps every supported decimal exponent `e` to a double-double magnitude
//! and a power-of-two exponent `k` with `magnitude * 2^k == 10^e`. The
//! magnitudes are kept near `2^49` so that up to ten times a magnitude
//! still fits the 53-bit high limb during accumulation.
//!
//! The factor is stored by its exponent rather than as a float. `2^k` for
//! the deepest entries is far below the smallest subnormal double, and a
//! float factor would force the tail to stop renormalizing and let the
//! magnitude sink into the low limb.

use crate::dd::DoubleDouble;

/// Smallest decimal exponent held by the table
pub const MIN_EXPONENT: i32 = -324;

/// Largest decimal exponent held by the table
pub const MAX_EXPONENT: i32 = 308;

/// Number of entries in the table
pub const TABLE_LEN: usize = (MAX_EXPONENT - MIN_EXPONENT + 1) as usize;

/// Normalization width `2^(53 - 4)`
pub const WIDTH: f64 = 562_949_953_421_312.0;

/// Binary exponent of [`WIDTH`]
pub const WIDTH_EXPONENT: i32 = 49;

/// Table entry for one decimal exponent
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PowerOfTenEntry {
    /// Normalized magnitude
    pub magnitude: DoubleDouble,
    /// Exponent `k` of the factor `2^k` undoing the normalization
    pub factor_exponent: i32,
}

impl PowerOfTenEntry {
    const EMPTY: Self = Self {
        magnitude: DoubleDouble::ZERO,
        factor_exponent: 0,
    };
}

/// Immutable power-of-ten table covering `[MIN_EXPONENT, MAX_EXPONENT]`
///
/// Build it once with [`Exp10Table::new`] and share it by reference; it is
/// never mutated after construction.
#[derive(Debug, Clone)]
pub struct Exp10Table {
    entries: [PowerOfTenEntry; TABLE_LEN],
}

impl Exp10Table {
    /// Build the table
    pub fn new() -> Self {
        let mut entries = [PowerOfTenEntry::EMPTY; TABLE_LEN];

        let mut normal = DoubleDouble::new(WIDTH, 0.0);
        let mut factor_exponent = -WIDTH_EXPONENT;
        for exponent in 0..=MAX_EXPONENT {
            if normal.high >= WIDTH {
                factor_exponent += 4;
                normal = normal / 16;
            }
            entries[Self::slot(exponent)] = PowerOfTenEntry {
                magnitude: normal,
                factor_exponent,
            };
            normal = normal * 10;
        }

        // The exponent cannot flush to zero, so the tail renormalizes all
        // the way down and every magnitude keeps its bits in the high limb.
        let mut normal = DoubleDouble::new(WIDTH, 0.0);
        let mut factor_exponent = -WIDTH_EXPONENT;
        for exponent in (MIN_EXPONENT..0).rev() {
            if normal.high < WIDTH {
                factor_exponent -= 4;
                normal = normal * 16;
            }
            normal = normal / 10;
            entries[Self::slot(exponent)] = PowerOfTenEntry {
                magnitude: normal,
                factor_exponent,
            };
        }

        Self { entries }
    }

    /// Process-wide table, built on first use
    #[cfg(feature = "std")]
    pub fn global() -> &'static Exp10Table {
        static TABLE: std::sync::OnceLock<Exp10Table> = std::sync::OnceLock::new();
        TABLE.get_or_init(Exp10Table::new)
    }

    /// Entry for a decimal exponent, `None` outside the supported range
    pub fn get(&self, exponent: i64) -> Option<&PowerOfTenEntry> {
        let index = Self::index(exponent)?;
        self.entries.get(index)
    }

    /// Position of a decimal exponent in the table
    pub fn index(exponent: i64) -> Option<usize> {
        if (i64::from(MIN_EXPONENT)..=i64::from(MAX_EXPONENT)).contains(&exponent) {
            Some((exponent - i64::from(MIN_EXPONENT)) as usize)
        } else {
            None
        }
    }

    /// Iterate over `(exponent, entry)` pairs in ascending exponent order
    pub fn iter(&self) -> impl Iterator<Item = (i32, &PowerOfTenEntry)> + '_ {
        (MIN_EXPONENT..=MAX_EXPONENT).zip(self.entries.iter())
    }

    fn slot(exponent: i32) -> usize {
        (exponent - MIN_EXPONENT) as usize
    }
}

impl Default for Exp10Table {
    fn default() -> Self {
        Self::new()
    }
}
