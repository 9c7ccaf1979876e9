use crate::domain::model::ListingId;
use std::collections::HashSet;

/// 在一次執行中累積所有見過的識別碼；只增不減
#[derive(Debug, Clone, Default)]
pub struct IdAggregator {
    seen: HashSet<ListingId>,
}

impl IdAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合併新的識別碼，回傳先前沒出現過的部分（保留輸入順序，不重複）
    pub fn merge<I>(&mut self, new_ids: I) -> Vec<ListingId>
    where
        I: IntoIterator<Item = ListingId>,
    {
        new_ids
            .into_iter()
            .filter(|id| self.seen.insert(*id))
            .collect()
    }

    pub fn contains(&self, id: ListingId) -> bool {
        self.seen.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn sorted_ids(&self) -> Vec<ListingId> {
        let mut ids: Vec<ListingId> = self.seen.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}
