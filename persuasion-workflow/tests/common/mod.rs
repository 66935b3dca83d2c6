#![allow(dead_code)]

use persuasion_core::{MethodBlock, RatingRow, RatingTable};

pub const PRINCIPLES: [&str; 6] = [
    "Reziprozität",
    "Verpfl. & Konsistenz",
    "Sozl. Bewährtheit",
    "Sympathie",
    "Autorität",
    "Knappheit",
];

pub fn principles() -> Vec<String> {
    PRINCIPLES.iter().map(|s| s.to_string()).collect()
}

/// Deterministic rating in 0..=5.
pub fn score(method: usize, row: usize, principle: usize) -> f64 {
    let seed = (method as u64) * 100_003 + (row as u64) * 1_009 + principle as u64 + 17;
    let mixed = seed.wrapping_mul(2_654_435_761) ^ (seed >> 3);
    ((mixed >> 13) % 6) as f64
}

/// `block_size` rows per method, label on the first row only, a rate on every row.
pub fn survey_table(methods: &[&str], block_size: usize) -> RatingTable {
    let mut rows = Vec::new();
    for (m, method) in methods.iter().enumerate() {
        for r in 0..block_size {
            let scores: Vec<f64> = (0..PRINCIPLES.len()).map(|j| score(m, r, j)).collect();
            let rate = 0.1 * (m + 1) as f64 + 0.02 * scores[4] + 0.013 * ((r * 7) % 5) as f64;
            let mut row = RatingRow::new(scores).with_rate(rate);
            if r == 0 {
                row = row.with_method(*method);
            }
            rows.push(row);
        }
    }
    RatingTable::new(principles(), rows).unwrap()
}

pub fn block(method: &str, columns: Vec<Vec<f64>>) -> MethodBlock {
    let principles = (0..columns.len())
        .map(|j| PRINCIPLES.get(j).map_or_else(|| format!("p{}", j), |p| p.to_string()))
        .collect();
    MethodBlock {
        index: 0,
        method: method.to_string(),
        start_row: 0,
        sheet_rows: (2, columns.first().map_or(0, Vec::len) + 1),
        principles,
        columns,
    }
}
