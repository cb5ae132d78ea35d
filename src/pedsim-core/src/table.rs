//! Row-major 2-D integer result sink, used for the sampler's verbose tables
//! and the generation×distance histogram. `None` is the missing-value
//! sentinel — distinguishable from any valid pid or distance, which are
//! always non-negative save for the -1 cross-pedigree sentinel handled by
//! callers directly.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    rows: Vec<Vec<Option<i64>>>,
}

impl Table {
    #[must_use]
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    #[must_use]
    pub fn with_shape(rows: usize, cols: usize) -> Self {
        Self {
            rows: vec![vec![None; cols]; rows],
        }
    }

    pub fn push_row(&mut self, row: Vec<Option<i64>>) {
        self.rows.push(row);
    }

    /// Appends one value per existing row (or seeds the table if empty).
    pub fn push_column(&mut self, values: Vec<Option<i64>>) {
        if self.rows.is_empty() {
            self.rows = values.into_iter().map(|v| vec![v]).collect();
        } else {
            for (row, value) in self.rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
    }

    /// Appends one missing-value column to every row.
    pub fn pad_column(&mut self) {
        for row in &mut self.rows {
            row.push(None);
        }
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<i64> {
        self.rows.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    pub fn set(&mut self, row: usize, col: usize, value: Option<i64>) {
        self.rows[row][col] = value;
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Option<i64>>] {
        &self.rows
    }
}
