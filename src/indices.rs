use crate::basis::BasisError;
use ndarray::Array2;
use std::collections::HashMap;

/// Number of multi-indices of length `dim` with total degree at most `degree`,
/// i.e. `C(degree + dim, dim)`.
pub fn index_set_size(degree: usize, dim: usize) -> usize {
    // Multiplicative form keeps every intermediate an exact binomial.
    let mut count = 1usize;
    for i in 1..=dim {
        count = count * (degree + i) / i;
    }
    count
}

/// Enumerates the total-degree index set; shorthand for
/// [`IndexSet::total_degree`].
pub fn index_set(degree: usize, dim: usize) -> Result<IndexSet, BasisError> {
    IndexSet::total_degree(degree, dim)
}

/// Ordered set of total-degree multi-indices.
///
/// Row order is the column order of every basis matrix built from it:
/// shells of increasing total degree, each shell enumerated
/// lexicographically, and every row reversed afterwards. Two sets built with
/// the same `(degree, dim)` are identical row for row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSet {
    dim: usize,
    degree: usize,
    rows: Vec<Vec<usize>>,
    lookup: HashMap<Vec<usize>, usize>,
}

impl IndexSet {
    /// Enumerates every multi-index of length `dim` whose entries sum to at
    /// most `degree`.
    pub fn total_degree(degree: usize, dim: usize) -> Result<Self, BasisError> {
        if dim == 0 {
            return Err(BasisError::InvalidDimension(dim));
        }

        let mut rows = Vec::with_capacity(index_set_size(degree, dim));
        rows.push(vec![0; dim]);
        for shell in 1..=degree {
            push_compositions(shell, dim, &mut rows);
        }
        for row in rows.iter_mut() {
            row.reverse();
        }

        let lookup = rows
            .iter()
            .enumerate()
            .map(|(pos, row)| (row.clone(), pos))
            .collect();

        Ok(Self {
            dim,
            degree,
            rows,
            lookup,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&[usize]> {
        self.rows.get(pos).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[usize]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Column position of `alpha`, if it belongs to the set.
    pub fn position(&self, alpha: &[usize]) -> Option<usize> {
        self.lookup.get(alpha).copied()
    }

    /// Column position of `alpha` with coordinate `axis` lowered by one.
    /// `None` when that entry is already zero.
    pub fn lowered(&self, alpha: &[usize], axis: usize) -> Option<usize> {
        if alpha[axis] == 0 {
            return None;
        }
        let mut lowered = alpha.to_vec();
        lowered[axis] -= 1;
        self.position(&lowered)
    }

    /// Dense `(len, dim)` copy of the rows.
    pub fn to_array(&self) -> Array2<usize> {
        let mut out = Array2::<usize>::zeros((self.len(), self.dim));
        for (i, row) in self.rows.iter().enumerate() {
            for (k, &entry) in row.iter().enumerate() {
                out[[i, k]] = entry;
            }
        }
        out
    }
}

/// Appends all compositions of `total` into `parts` non-negative parts in
/// lexicographic order (first coordinate slowest).
fn push_compositions(total: usize, parts: usize, out: &mut Vec<Vec<usize>>) {
    let last = parts - 1;
    let mut current = vec![0; parts];
    current[last] = total;
    loop {
        out.push(current.clone());

        // Rightmost position that still has budget to its right.
        let mut pivot = None;
        let mut tail = 0usize;
        for p in (0..last).rev() {
            tail += current[p + 1];
            if tail > 0 {
                pivot = Some(p);
                break;
            }
        }
        let Some(p) = pivot else {
            break;
        };

        current[p] += 1;
        let used: usize = current[..=p].iter().sum();
        for entry in current[p + 1..].iter_mut() {
            *entry = 0;
        }
        current[last] = total - used;
    }
}
