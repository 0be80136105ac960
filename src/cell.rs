use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Largest background accepted for randomly generated cells (0xFFFFFF).
pub const MAX_RANDOM_BACKGROUND: i32 = 16_777_215;

const TEXT_LENGTH: RangeInclusive<usize> = 5..=15;
const NUMBER_RANGE: RangeInclusive<u32> = 1..=10_000;

/// A single cell update as the spreadsheet API expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub id: i64,
    pub raw_value: String,
    pub background: i32,
}

impl Cell {
    pub fn new(id: i64, raw_value: impl Into<String>, background: i32) -> Self {
        Cell {
            id,
            raw_value: raw_value.into(),
            background,
        }
    }

    /// A cell with no content, only a background color.
    pub fn blank(id: i64, background: i32) -> Self {
        Cell::new(id, String::new(), background)
    }
}

/// The kinds of content the load generator writes into a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Number,
    Formula,
}

impl ValueKind {
    pub const ALL: [ValueKind; 3] = [ValueKind::Text, ValueKind::Number, ValueKind::Formula];

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    /// Generate a raw value of this kind.
    pub fn generate<R: Rng>(self, rng: &mut R) -> String {
        match self {
            ValueKind::Text => {
                let len = rng.gen_range(TEXT_LENGTH);
                (0..len)
                    .map(|_| char::from(rng.sample(Alphanumeric)))
                    .collect()
            }
            ValueKind::Number => rng.gen_range(NUMBER_RANGE).to_string(),
            ValueKind::Formula => {
                let letter = char::from(b'A' + rng.gen_range(0..26u8));
                format!("={}{}", letter, rng.gen_range(NUMBER_RANGE))
            }
        }
    }
}

/// Pick a value kind uniformly, then generate a value of that kind.
pub fn random_raw_value<R: Rng>(rng: &mut R) -> String {
    ValueKind::random(rng).generate(rng)
}

/// Build a randomized cell with an id drawn from `ids`.
///
/// The caller guarantees `ids` is non-empty; `LoadTestConfig::validate`
/// rejects inverted ranges before a run starts.
pub fn random_cell<R: Rng>(rng: &mut R, ids: RangeInclusive<i64>) -> Cell {
    let raw_value = random_raw_value(rng);
    let id = rng.gen_range(ids);
    let background = rng.gen_range(0..=MAX_RANDOM_BACKGROUND);
    Cell::new(id, raw_value, background)
}
