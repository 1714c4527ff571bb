//! Two-row parameter grids for batch template creation.

use serde::{Deserialize, Serialize};

/// `num` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num)
                .map(|i| if i == num - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Columns of `(p1, p2)` parameter pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterGrid {
    pub first: Vec<f64>,
    pub second: Vec<f64>,
}

impl ParameterGrid {
    /// Pairs taken directly from two equally long rows.
    pub fn new(first: Vec<f64>, second: Vec<f64>) -> Option<Self> {
        (first.len() == second.len()).then_some(Self { first, second })
    }

    /// Every combination, `a` varying slowest.
    pub fn cartesian(a: &[f64], b: &[f64]) -> Self {
        let mut grid = Self::default();
        for &x in a {
            for &y in b {
                grid.first.push(x);
                grid.second.push(y);
            }
        }
        grid
    }

    /// Element-wise pairs, truncated to the shorter row.
    pub fn zipped(a: &[f64], b: &[f64]) -> Self {
        let (first, second) = a.iter().zip(b).map(|(&x, &y)| (x, y)).unzip();
        Self { first, second }
    }

    pub fn len(&self) -> usize {
        self.first.len().min(self.second.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.first.iter().copied().zip(self.second.iter().copied())
    }

    /// Whether both rows have the same length and only finite values.
    pub fn is_well_formed(&self) -> bool {
        self.first.len() == self.second.len()
            && self.first.iter().chain(&self.second).all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_both_ends() {
        assert_eq!(linspace(10.0, 20.0, 3), vec![10.0, 15.0, 20.0]);
        assert_eq!(linspace(5.0, 9.0, 1), vec![5.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn cartesian_varies_second_fastest() {
        let grid = ParameterGrid::cartesian(&[1.0, 2.0], &[3.0, 4.0]);
        let pairs: Vec<_> = grid.pairs().collect();
        assert_eq!(pairs, vec![(1.0, 3.0), (1.0, 4.0), (2.0, 3.0), (2.0, 4.0)]);
    }

    #[test]
    fn zipped_truncates_to_shorter_row() {
        let grid = ParameterGrid::zipped(&[1.0, 2.0, 3.0], &[4.0, 5.0]);
        assert_eq!(grid.len(), 2);
        assert!(grid.is_well_formed());
        assert!(ParameterGrid::new(vec![1.0], vec![]).is_none());
    }
}
