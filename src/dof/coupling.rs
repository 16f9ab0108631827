//! Variable-to-variable coupling restriction.

use serde::{Deserialize, Serialize};

/// Square boolean matrix over variables: entry `(i, j)` set means variable
/// `i` on one element couples to variable `j` on the other.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CouplingMatrix {
    n: usize,
    entries: Vec<bool>,
}

impl CouplingMatrix {
    /// Empty `n × n` matrix.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            entries: vec![false; n * n],
        }
    }

    /// Matrix with every entry set.
    pub fn full(n: usize) -> Self {
        Self {
            n,
            entries: vec![true; n * n],
        }
    }

    /// Diagonal matrix: each variable couples only to itself.
    pub fn diagonal(n: usize) -> Self {
        let mut m = Self::new(n);
        for i in 0..n {
            m.set(i, i);
        }
        m
    }

    /// Build from `(i, j)` pairs; the size is the largest index plus one,
    /// or `n` if larger.
    pub fn from_pairs(n: usize, pairs: &[(usize, usize)]) -> Self {
        let n = pairs
            .iter()
            .map(|&(i, j)| i.max(j) + 1)
            .max()
            .unwrap_or(0)
            .max(n);
        let mut m = Self::new(n);
        for &(i, j) in pairs {
            m.set(i, j);
        }
        m
    }

    pub fn n_vars(&self) -> usize {
        self.n
    }

    pub fn set(&mut self, i: usize, j: usize) {
        if i < self.n && j < self.n {
            self.entries[i * self.n + j] = true;
        }
    }

    /// Out-of-range entries read as unset.
    pub fn get(&self, i: usize, j: usize) -> bool {
        i < self.n && j < self.n && self.entries[i * self.n + j]
    }

    pub fn n_set(&self) -> usize {
        self.entries.iter().filter(|&&b| b).count()
    }

    /// Entry-wise union; the result has the larger of the two sizes.
    pub fn union(&self, other: &CouplingMatrix) -> CouplingMatrix {
        let n = self.n.max(other.n);
        let mut out = CouplingMatrix::new(n);
        for i in 0..n {
            for j in 0..n {
                if self.get(i, j) || other.get(i, j) {
                    out.set(i, j);
                }
            }
        }
        out
    }

    /// True if every entry set in `other` is set here.
    pub fn is_superset_of(&self, other: &CouplingMatrix) -> bool {
        (0..other.n).all(|i| (0..other.n).all(|j| !other.get(i, j) || self.get(i, j)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_grows_to_larger_size() {
        let a = CouplingMatrix::diagonal(2);
        let b = CouplingMatrix::from_pairs(3, &[(0, 2)]);
        let u = a.union(&b);
        assert_eq!(u.n_vars(), 3);
        assert!(u.get(0, 0) && u.get(1, 1) && u.get(0, 2));
        assert!(!u.get(2, 2));
        assert!(u.is_superset_of(&a) && u.is_superset_of(&b));
        assert!(!a.is_superset_of(&b));
    }

    #[test]
    fn out_of_range_is_unset() {
        let m = CouplingMatrix::full(2);
        assert!(!m.get(2, 0));
        assert_eq!(m.n_set(), 4);
    }
}
