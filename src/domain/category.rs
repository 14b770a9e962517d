// ============================================================
// Layer 3 — Category Hierarchy
// ============================================================
// Category ids are four-character codes like "0103": the first
// two characters name the level-1 (coarse) category, the full
// code names the level-2 (fine) category. The classifier is
// trained on level-2 indices, i.e. the position of the code in
// the category list.
//
// Example list: 0101 0102 0201 0202 0203
//   lv2_index("0201") = 2
//   lv1_index("0201") = 1          ("02" is the second prefix)
//   lv1_offsets()     = [0, 2, 5]  (where each lv1 block starts)
//
// The map is built once at startup and shared read-only.

use std::{collections::HashMap, fs, path::Path};

use crate::error::{PipelineError, Result};

/// Number of leading characters that form the level-1 code
const LV1_PREFIX_LEN: usize = 2;

#[derive(Debug, Clone)]
pub struct CategoryMap {
    /// Category ids in list order
    ids: Vec<String>,
    /// id → level-2 index
    lv2: HashMap<String, usize>,
    /// level-1 prefix → level-1 index
    lv1: HashMap<String, usize>,
    /// Cumulative level-2 counts per level-1 block
    offsets: Vec<usize>,
}

impl CategoryMap {
    /// Build from category ids in their canonical order.
    /// Duplicate ids are rejected.
    pub fn from_ids<I, S>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();

        let mut lv2 = HashMap::with_capacity(ids.len());
        for (idx, id) in ids.iter().enumerate() {
            if lv2.insert(id.clone(), idx).is_some() {
                return Err(PipelineError::CategoryList {
                    reason: format!("duplicate category id '{id}'"),
                });
            }
        }

        // Count lv2 ids per lv1 prefix, keeping first-seen order
        let mut prefixes: Vec<(String, usize)> = Vec::new();
        let mut lv1: HashMap<String, usize> = HashMap::new();
        for id in &ids {
            let prefix = lv1_prefix(id);
            match lv1.get(prefix) {
                Some(&idx) => prefixes[idx].1 += 1,
                None => {
                    lv1.insert(prefix.to_string(), prefixes.len());
                    prefixes.push((prefix.to_string(), 1));
                }
            }
        }

        let mut offsets = Vec::with_capacity(prefixes.len() + 1);
        offsets.push(0);
        for (_, count) in &prefixes {
            let last = offsets[offsets.len() - 1];
            offsets.push(last + count);
        }

        Ok(Self { ids, lv2, lv1, offsets })
    }

    /// Read a category list file: one id per line, blank lines ignored.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let ids: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        if ids.is_empty() {
            return Err(PipelineError::CategoryList {
                reason: format!("'{}' contains no category ids", path.display()),
            });
        }

        let map = Self::from_ids(ids)?;
        tracing::info!(
            "Loaded {} categories ({} level-1 groups) from '{}'",
            map.num_lv2(),
            map.num_lv1(),
            path.display()
        );
        Ok(map)
    }

    /// Fine-grained class index used as the training label
    pub fn lv2_index(&self, category_id: &str) -> Result<usize> {
        self.lv2
            .get(category_id)
            .copied()
            .ok_or_else(|| PipelineError::UnknownCategory {
                category_id: category_id.to_string(),
            })
    }

    /// Coarse class index of the id's level-1 prefix
    pub fn lv1_index(&self, category_id: &str) -> Result<usize> {
        // Only ids from the list are valid, even if the prefix is known
        self.lv2_index(category_id)?;
        Ok(self.lv1[lv1_prefix(category_id)])
    }

    /// Start of each level-1 block in level-2 index space,
    /// with the total count as the final entry
    pub fn lv1_offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn num_lv1(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn num_lv2(&self) -> usize {
        self.ids.len()
    }
}

fn lv1_prefix(id: &str) -> &str {
    match id.char_indices().nth(LV1_PREFIX_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}
