//! Lazy subset enumeration over an inventory snapshot.
//!
//! Subsets are produced from the largest size down to singletons so that
//! rich combinations surface early in a time-boxed run. Within a size the
//! order is standard lexicographic index order over the snapshot, which
//! makes two runs over the same inventory byte-identical. A global cap
//! bounds worst-case blow-up (n=20 alone has C(20,7)=77,520 size-7 subsets).

use upcycle_common::{Material, MaterialSubset};

/// Binomial coefficient C(n, k), saturating on overflow.
pub fn binomial(n: usize, k: usize) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u64 = 1;
    for i in 0..k {
        // Multiply before divide keeps the intermediate an exact integer.
        result = result.saturating_mul((n - i) as u64) / (i as u64 + 1);
    }
    result
}

/// Total subsets of size 1..=max_size drawn from n elements, saturating.
pub fn total_subsets(n: usize, max_size: usize) -> u64 {
    (1..=max_size.min(n)).fold(0u64, |acc, k| acc.saturating_add(binomial(n, k)))
}

/// Lexicographic k-combinations of indices 0..n.
#[derive(Debug, Clone)]
pub struct IndexCombinations {
    n: usize,
    k: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl IndexCombinations {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            k,
            indices: (0..k).collect(),
            started: false,
            done: k == 0 || k > n,
        }
    }

    /// Advance `indices` to the next combination. Returns false when exhausted.
    fn advance(&mut self) -> bool {
        // Find rightmost index that can still move right.
        let mut i = self.k;
        while i > 0 {
            i -= 1;
            if self.indices[i] < self.n - (self.k - i) {
                self.indices[i] += 1;
                for j in i + 1..self.k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                return true;
            }
        }
        false
    }
}

impl Iterator for IndexCombinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }
        if self.advance() {
            Some(self.indices.clone())
        } else {
            self.done = true;
            None
        }
    }
}

/// Lazy stream of material subsets: sizes descending, lexicographic within a
/// size, truncated at `cap` total emissions.
pub struct SubsetStream {
    snapshot: Vec<Material>,
    current: Option<IndexCombinations>,
    size: usize,
    cap: u64,
    emitted: u64,
}

impl SubsetStream {
    pub fn new(materials: &[Material], max_size: usize, cap: u64) -> Self {
        let n = materials.len();
        let size = max_size.min(n);
        let current = (size > 0).then(|| IndexCombinations::new(n, size));
        Self {
            snapshot: materials.to_vec(),
            current,
            size,
            cap,
            emitted: 0,
        }
    }

    /// Subsets emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl Iterator for SubsetStream {
    type Item = MaterialSubset;

    fn next(&mut self) -> Option<MaterialSubset> {
        if self.emitted >= self.cap {
            return None;
        }
        loop {
            let combos = self.current.as_mut()?;
            if let Some(indices) = combos.next() {
                self.emitted += 1;
                let materials = indices.iter().map(|&i| self.snapshot[i].clone()).collect();
                return Some(MaterialSubset::new(materials));
            }
            // Current size exhausted; step down to the next smaller size.
            if self.size <= 1 {
                self.current = None;
                return None;
            }
            self.size -= 1;
            self.current = Some(IndexCombinations::new(self.snapshot.len(), self.size));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use upcycle_common::{MaterialCondition, MaterialType};

    fn inventory(n: usize) -> Vec<Material> {
        (0..n)
            .map(|i| {
                Material::new(
                    format!("material-{i}"),
                    MaterialType::Plastic,
                    1.0,
                    "pieces",
                    MaterialCondition::Good,
                    50,
                    50,
                )
            })
            .collect()
    }

    #[test]
    fn test_binomial_known_values() {
        assert_eq!(binomial(5, 0), 1);
        assert_eq!(binomial(5, 2), 10);
        assert_eq!(binomial(20, 7), 77_520);
        assert_eq!(binomial(3, 4), 0);
    }

    #[test]
    fn test_total_subsets_small() {
        // 3 singletons + 3 pairs + 1 triple
        assert_eq!(total_subsets(3, 3), 7);
        // Clamped max size
        assert_eq!(total_subsets(3, 7), 7);
    }

    #[test]
    fn test_emits_exactly_choose_n_k_per_size() {
        let materials = inventory(6);
        let stream = SubsetStream::new(&materials, 4, u64::MAX);
        let mut per_size = [0u64; 5];
        for subset in stream {
            per_size[subset.len()] += 1;
        }
        assert_eq!(per_size[4], binomial(6, 4));
        assert_eq!(per_size[3], binomial(6, 3));
        assert_eq!(per_size[2], binomial(6, 2));
        assert_eq!(per_size[1], binomial(6, 1));
    }

    #[test]
    fn test_no_duplicate_ids_within_subset() {
        let materials = inventory(5);
        for subset in SubsetStream::new(&materials, 5, u64::MAX) {
            let ids: HashSet<_> = subset.materials.iter().map(|m| m.id).collect();
            assert_eq!(ids.len(), subset.len());
        }
    }

    #[test]
    fn test_elements_stay_within_snapshot() {
        let materials = inventory(4);
        let known: HashSet<_> = materials.iter().map(|m| m.id).collect();
        for subset in SubsetStream::new(&materials, 4, u64::MAX) {
            assert!(subset.materials.iter().all(|m| known.contains(&m.id)));
        }
    }

    #[test]
    fn test_sizes_strictly_descending() {
        let materials = inventory(5);
        let sizes: Vec<usize> = SubsetStream::new(&materials, 5, u64::MAX)
            .map(|s| s.len())
            .collect();
        let mut sorted = sizes.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(sizes, sorted);
        assert_eq!(sizes.first(), Some(&5));
        assert_eq!(sizes.last(), Some(&1));
    }

    #[test]
    fn test_deterministic_order() {
        let materials = inventory(6);
        let a: Vec<Vec<_>> = SubsetStream::new(&materials, 4, 50)
            .map(|s| s.materials.iter().map(|m| m.id).collect())
            .collect();
        let b: Vec<Vec<_>> = SubsetStream::new(&materials, 4, 50)
            .map(|s| s.materials.iter().map(|m| m.id).collect())
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cap_truncates_from_largest_sizes() {
        let materials = inventory(10);
        let subsets: Vec<_> = SubsetStream::new(&materials, 7, 5).collect();
        assert_eq!(subsets.len(), 5);
        // C(10,7) = 120 > 5, so every emitted subset is size 7.
        assert!(subsets.iter().all(|s| s.len() == 7));
    }

    #[test]
    fn test_max_size_clamps_to_inventory() {
        let materials = inventory(3);
        let count = SubsetStream::new(&materials, 7, u64::MAX).count();
        assert_eq!(count as u64, total_subsets(3, 3));
    }

    #[test]
    fn test_empty_inventory_yields_nothing() {
        let stream = SubsetStream::new(&[], 7, 350);
        assert_eq!(stream.count(), 0);
    }

    #[test]
    fn test_singletons_cover_inventory() {
        let materials = inventory(4);
        let singles: Vec<_> = SubsetStream::new(&materials, 1, u64::MAX).collect();
        assert_eq!(singles.len(), 4);
        for (i, subset) in singles.iter().enumerate() {
            assert_eq!(subset.materials[0].id, materials[i].id);
        }
    }
}
