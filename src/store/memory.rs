//! In-memory stores (no persistence)

use std::collections::BTreeMap;

use crate::common::errors::Result;
use crate::common::traits::{StateStore, SubscriberStore};
use crate::common::types::SubscriberId;
use crate::paper::account::SubscriberAccount;
use crate::scheduler::state::SchedulerState;

#[derive(Debug, Clone, Default)]
pub struct MemorySubscriberStore {
    accounts: BTreeMap<SubscriberId, SubscriberAccount>,
}

impl MemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert for fixtures
    pub fn with_account(mut self, id: SubscriberId, account: SubscriberAccount) -> Self {
        self.accounts.insert(id, account);
        self
    }
}

impl SubscriberStore for MemorySubscriberStore {
    fn list_ids(&self) -> Result<Vec<SubscriberId>> {
        Ok(self.accounts.keys().cloned().collect())
    }

    fn load(&self, id: &SubscriberId) -> Result<Option<SubscriberAccount>> {
        Ok(self.accounts.get(id).cloned())
    }

    fn save(&mut self, id: &SubscriberId, account: &SubscriberAccount) -> Result<()> {
        self.accounts.insert(id.clone(), account.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    state: SchedulerState,
    /// Number of successful saves
    pub saves: usize,
}

impl MemoryStateStore {
    pub fn new(state: SchedulerState) -> Self {
        Self { state, saves: 0 }
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<SchedulerState> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &SchedulerState) -> Result<()> {
        self.state = state.clone();
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_memory_subscriber_store() {
        let id = SubscriberId::new("1");
        let mut store = MemorySubscriberStore::new()
            .with_account(id.clone(), SubscriberAccount::new("0x1", "0x01", dec!(10), 1));
        assert_eq!(store.list_ids().unwrap(), vec![id.clone()]);

        let mut account = store.load(&id).unwrap().unwrap();
        account.paper_balance = dec!(5);
        store.save(&id, &account).unwrap();
        assert_eq!(store.load(&id).unwrap().unwrap().paper_balance, dec!(5));
    }

    #[test]
    fn test_memory_state_store_counts_saves() {
        let mut store = MemoryStateStore::default();
        store.save(&SchedulerState::default()).unwrap();
        store.save(&SchedulerState::default()).unwrap();
        assert_eq!(store.saves, 2);
    }
}
