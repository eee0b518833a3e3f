//! Keyed float attribute table.
//!
//! One row per shape or grid point, keyed by an `i32` reference, with
//! named float columns. Row order is insertion order. Unset values are
//! stored as `-1.0`, which every analysis treats as "no value".

use indexmap::IndexMap;

/// Value written into new cells and reset columns.
pub const NO_VALUE: f32 = -1.0;

/// Summary statistics of one column, ignoring [`NO_VALUE`] cells.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ColumnStats {
    /// Smallest value.
    pub min: f32,
    /// Largest value.
    pub max: f32,
    /// Sum of values.
    pub total: f64,
    /// Number of cells holding a value.
    pub count: usize,
}

/// Column-oriented float table keyed by reference number.
#[derive(Clone, Debug, Default)]
pub struct AttributeTable {
    columns: Vec<String>,
    rows: IndexMap<i32, Vec<f32>>,
}

impl AttributeTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names in index order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Index of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Name of the column at `index`.
    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    /// Return the index of `name`, appending it (filled with [`NO_VALUE`]) if absent.
    pub fn get_or_insert_column(&mut self, name: &str) -> usize {
        if let Some(i) = self.column_index(name) {
            return i;
        }
        self.columns.push(name.to_owned());
        for row in self.rows.values_mut() {
            row.push(NO_VALUE);
        }
        self.columns.len() - 1
    }

    /// Like [`get_or_insert_column`](Self::get_or_insert_column) but resets
    /// an existing column to [`NO_VALUE`].
    pub fn insert_or_reset_column(&mut self, name: &str) -> usize {
        if let Some(i) = self.column_index(name) {
            for row in self.rows.values_mut() {
                row[i] = NO_VALUE;
            }
            return i;
        }
        self.get_or_insert_column(name)
    }

    /// Remove a column. Later column indices shift down by one.
    pub fn remove_column(&mut self, index: usize) {
        if index >= self.columns.len() {
            return;
        }
        self.columns.remove(index);
        for row in self.rows.values_mut() {
            row.remove(index);
        }
    }

    /// Add a row (all cells [`NO_VALUE`]); an existing row is left unchanged.
    pub fn add_row(&mut self, key: i32) {
        let width = self.columns.len();
        self.rows.entry(key).or_insert_with(|| vec![NO_VALUE; width]);
    }

    /// Add a row at position `index` in row order. An existing row is
    /// left where it is.
    pub fn insert_row(&mut self, index: usize, key: i32) {
        if self.rows.contains_key(&key) {
            return;
        }
        let width = self.columns.len();
        let index = index.min(self.rows.len());
        self.rows.shift_insert(index, key, vec![NO_VALUE; width]);
    }

    /// Cell value by row position.
    pub fn value_at(&self, row: usize, column: usize) -> Option<f32> {
        self.rows.get_index(row).and_then(|(_, r)| r.get(column)).copied()
    }

    /// Set a cell by row position. Returns false if out of range.
    pub fn set_value_at(&mut self, row: usize, column: usize, value: f32) -> bool {
        match self.rows.get_index_mut(row).and_then(|(_, r)| r.get_mut(column)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Key of the row at position `row`.
    pub fn key_at(&self, row: usize) -> Option<i32> {
        self.rows.get_index(row).map(|(k, _)| *k)
    }

    /// Remove a row, keeping the order of the others.
    pub fn remove_row(&mut self, key: i32) -> bool {
        self.rows.shift_remove(&key).is_some()
    }

    /// True if a row exists for `key`.
    pub fn has_row(&self, key: i32) -> bool {
        self.rows.contains_key(&key)
    }

    /// Position of `key` in row order.
    pub fn row_index(&self, key: i32) -> Option<usize> {
        self.rows.get_index_of(&key)
    }

    /// Row keys in order.
    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.rows.keys().copied()
    }

    /// Cell value.
    pub fn value(&self, key: i32, column: usize) -> Option<f32> {
        self.rows.get(&key).and_then(|r| r.get(column)).copied()
    }

    /// Set a cell. Returns false if the row or column does not exist.
    pub fn set_value(&mut self, key: i32, column: usize, value: f32) -> bool {
        match self.rows.get_mut(&key).and_then(|r| r.get_mut(column)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Statistics over a column.
    pub fn column_stats(&self, column: usize) -> ColumnStats {
        let mut stats = ColumnStats {
            min: f32::MAX,
            max: f32::MIN,
            total: 0.0,
            count: 0,
        };
        for v in self.rows.values().filter_map(|r| r.get(column)).copied() {
            if v == NO_VALUE {
                continue;
            }
            stats.min = stats.min.min(v);
            stats.max = stats.max.max(v);
            stats.total += f64::from(v);
            stats.count += 1;
        }
        if stats.count == 0 {
            stats.min = NO_VALUE;
            stats.max = NO_VALUE;
        }
        stats
    }

    /// Drop every row, keeping the columns.
    pub fn clear_rows(&mut self) {
        self.rows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_columns_fill_existing_rows() {
        let mut t = AttributeTable::new();
        t.add_row(7);
        t.add_row(3);
        let c = t.get_or_insert_column("Connectivity");
        assert_eq!(c, 0);
        assert_eq!(t.value(7, c), Some(NO_VALUE));
        assert!(t.set_value(3, c, 4.0));
        assert_eq!(t.value(3, c), Some(4.0));
        assert_eq!(t.get_or_insert_column("Connectivity"), 0);
    }

    #[test]
    fn reset_column_clears_values() {
        let mut t = AttributeTable::new();
        t.add_row(1);
        let c = t.get_or_insert_column("Depth");
        t.set_value(1, c, 2.0);
        assert_eq!(t.insert_or_reset_column("Depth"), c);
        assert_eq!(t.value(1, c), Some(NO_VALUE));
    }

    #[test]
    fn row_removal_keeps_order() {
        let mut t = AttributeTable::new();
        for k in [5, 1, 9] {
            t.add_row(k);
        }
        assert!(t.remove_row(1));
        assert!(!t.remove_row(1));
        assert_eq!(t.keys().collect::<Vec<_>>(), vec![5, 9]);
        assert_eq!(t.row_index(9), Some(1));
    }

    #[test]
    fn positional_insert_and_access() {
        let mut t = AttributeTable::new();
        let c = t.get_or_insert_column("x");
        t.add_row(0);
        t.add_row(4);
        t.insert_row(1, 2);
        assert_eq!(t.keys().collect::<Vec<_>>(), vec![0, 2, 4]);
        assert!(t.set_value_at(1, c, 3.5));
        assert_eq!(t.value(2, c), Some(3.5));
        assert_eq!(t.value_at(2, c), Some(NO_VALUE));
        assert_eq!(t.key_at(2), Some(4));
        assert!(!t.set_value_at(3, c, 1.0));
    }

    #[test]
    fn stats_skip_unset_cells() {
        let mut t = AttributeTable::new();
        let c = t.get_or_insert_column("x");
        for k in 0..4 {
            t.add_row(k);
        }
        t.set_value(0, c, 2.0);
        t.set_value(2, c, 6.0);
        let s = t.column_stats(c);
        assert_eq!(s.count, 2);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 6.0);
        assert_eq!(s.total, 8.0);
    }
}
