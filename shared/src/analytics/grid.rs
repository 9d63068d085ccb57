//! Grid resampling and statistics with zero-as-masked handling

use crate::models::{Grid, GridStats};

/// Edge length of the grid served to the visualization layer
pub const VISUALIZATION_GRID_SIZE: usize = 64;

/// Block-average `grid` into a `target_size` × `target_size` grid.
///
/// Block edges come from integer division of the input dimensions by the
/// target size (at least 1), so inputs smaller than the target repeat their
/// trailing cells rather than being interpolated. Cells equal to 0.0 are
/// masked and excluded; a block with no unmasked cell yields 0.0.
pub fn resample(grid: &[Vec<f64>], target_size: usize) -> Grid {
    if target_size == 0 {
        return Vec::new();
    }

    let rows = grid.len();
    let cols = grid.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 {
        return vec![vec![0.0; target_size]; target_size];
    }

    let step_row = (rows / target_size).max(1);
    let step_col = (cols / target_size).max(1);

    (0..target_size)
        .map(|i| {
            let row_start = (i * step_row).min(rows - 1);
            let row_end = ((i + 1) * step_row).min(rows);
            (0..target_size)
                .map(|j| {
                    let col_start = (j * step_col).min(cols - 1);
                    let col_end = ((j + 1) * step_col).min(cols);
                    block_mean(&grid[row_start..row_end], col_start, col_end)
                })
                .collect()
        })
        .collect()
}

fn block_mean(rows: &[Vec<f64>], col_start: usize, col_end: usize) -> f64 {
    let (sum, count) = rows
        .iter()
        .flat_map(|row| row.iter().take(col_end).skip(col_start))
        .filter(|value| **value != 0.0)
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Mean, median, min and max over the unmasked cells of `grid`.
/// All zero when no cell is unmasked.
pub fn grid_stats(grid: &[Vec<f64>]) -> GridStats {
    let mut valid: Vec<f64> = grid
        .iter()
        .flatten()
        .copied()
        .filter(|value| *value != 0.0)
        .collect();

    if valid.is_empty() {
        return GridStats::default();
    }

    valid.sort_by(f64::total_cmp);
    let n = valid.len();
    let median = if n % 2 == 0 {
        (valid[n / 2 - 1] + valid[n / 2]) / 2.0
    } else {
        valid[n / 2]
    };

    GridStats {
        mean: valid.iter().sum::<f64>() / n as f64,
        median,
        min: valid[0],
        max: valid[n - 1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_is_always_target_squared() {
        for (rows, cols) in [(0, 0), (1, 1), (3, 7), (64, 64), (130, 97)] {
            let grid = vec![vec![0.5; cols]; rows];
            let out = resample(&grid, 64);
            assert_eq!(out.len(), 64);
            assert!(out.iter().all(|row| row.len() == 64));
        }
    }

    #[test]
    fn test_same_size_is_identity() {
        let grid: Grid = (0..4)
            .map(|r| (0..4).map(|c| (r * 4 + c) as f64 + 1.0).collect())
            .collect();
        assert_eq!(resample(&grid, 4), grid);
    }

    #[test]
    fn test_block_average_skips_masked_cells() {
        let grid = vec![
            vec![0.2, 0.0, 0.6, 0.6],
            vec![0.4, 0.0, 0.6, 0.6],
            vec![0.0, 0.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0],
        ];
        let out = resample(&grid, 2);
        assert!((out[0][0] - 0.3).abs() < 1e-12);
        assert!((out[0][1] - 0.6).abs() < 1e-12);
        assert_eq!(out[1][0], 0.0);
        assert_eq!(out[1][1], 1.0);
    }

    #[test]
    fn test_small_input_repeats_trailing_cells() {
        let grid = vec![vec![0.1, 0.2], vec![0.3, 0.4]];
        let out = resample(&grid, 4);
        assert_eq!(out[0], vec![0.1, 0.2, 0.2, 0.2]);
        assert_eq!(out[3], vec![0.3, 0.4, 0.4, 0.4]);
    }

    #[test]
    fn test_all_zero_input_gives_all_zero_output() {
        let out = resample(&vec![vec![0.0; 10]; 10], 3);
        assert!(out.iter().flatten().all(|v| *v == 0.0));
    }

    #[test]
    fn test_ragged_rows_treat_missing_cells_as_masked() {
        let grid = vec![vec![1.0, 1.0, 1.0, 1.0], vec![3.0]];
        let out = resample(&grid, 1);
        assert_eq!(out, vec![vec![1.4]]);
    }

    #[test]
    fn test_stats_ignore_masked_cells() {
        let grid = vec![vec![0.0, 0.2, 0.4], vec![0.8, 0.0, 0.6]];
        let stats = grid_stats(&grid);
        assert!((stats.mean - 0.5).abs() < 1e-12);
        assert!((stats.median - 0.5).abs() < 1e-12);
        assert_eq!(stats.min, 0.2);
        assert_eq!(stats.max, 0.8);
    }

    #[test]
    fn test_stats_of_fully_masked_grid() {
        assert_eq!(grid_stats(&[vec![0.0, 0.0]]), GridStats::default());
    }
}
