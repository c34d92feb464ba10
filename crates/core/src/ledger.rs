//! Favorites and watch-later lists.
//!
//! Each list keeps insertion order for persistence and a set for membership,
//! so duplicates cannot be introduced.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::library::ItemId;
use crate::store::{StorageBudget, FAVORITES_KEY, WATCH_LATER_KEY};

/// Which ledger list an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListName {
    Favorites,
    WatchLater,
}

impl ListName {
    /// Store key the list is persisted under.
    pub fn store_key(&self) -> &'static str {
        match self {
            ListName::Favorites => FAVORITES_KEY,
            ListName::WatchLater => WATCH_LATER_KEY,
        }
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListName::Favorites => write!(f, "favorites"),
            ListName::WatchLater => write!(f, "watch later"),
        }
    }
}

#[derive(Debug, Default)]
struct IdList {
    order: Vec<ItemId>,
    members: HashSet<ItemId>,
}

impl IdList {
    fn from_ids(ids: Vec<ItemId>) -> Self {
        let mut list = Self::default();
        for id in ids {
            if list.members.insert(id) {
                list.order.push(id);
            }
        }
        list
    }

    fn toggle(&mut self, id: ItemId) -> bool {
        if self.members.remove(&id) {
            self.order.retain(|existing| *existing != id);
            false
        } else {
            self.members.insert(id);
            self.order.push(id);
            true
        }
    }
}

#[derive(Debug, Default)]
struct Lists {
    favorites: IdList,
    watch_later: IdList,
}

impl Lists {
    fn get(&self, list: ListName) -> &IdList {
        match list {
            ListName::Favorites => &self.favorites,
            ListName::WatchLater => &self.watch_later,
        }
    }

    fn get_mut(&mut self, list: ListName) -> &mut IdList {
        match list {
            ListName::Favorites => &mut self.favorites,
            ListName::WatchLater => &mut self.watch_later,
        }
    }
}

/// Persisted favorites and watch-later id lists.
pub struct Ledger {
    budget: Arc<StorageBudget>,
    lists: Mutex<Lists>,
}

impl Ledger {
    /// Create a ledger and restore both lists from the store.
    pub fn load(budget: Arc<StorageBudget>) -> Self {
        let ledger = Self {
            budget,
            lists: Mutex::new(Lists::default()),
        };
        ledger.reload();
        ledger
    }

    /// Re-read both lists from the store. Unreadable lists load as empty.
    pub fn reload(&self) {
        let favorites = self.read_list(ListName::Favorites);
        let watch_later = self.read_list(ListName::WatchLater);

        let mut lists = self.lists.lock().unwrap();
        lists.favorites = IdList::from_ids(favorites);
        lists.watch_later = IdList::from_ids(watch_later);
    }

    fn read_list(&self, list: ListName) -> Vec<ItemId> {
        let Some(raw) = self.budget.read(list.store_key()) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Ignoring unreadable {} list: {}", list, e);
                Vec::new()
            }
        }
    }

    /// Add the id if absent, remove it if present, then persist the list.
    ///
    /// Returns whether the id is now a member.
    pub fn toggle(&self, list: ListName, id: ItemId) -> bool {
        // Held until the write lands so the store never trails memory.
        let mut lists = self.lists.lock().unwrap();
        let ids = lists.get_mut(list);
        let member = ids.toggle(id);

        match serde_json::to_string(&ids.order) {
            Ok(json) => {
                self.budget.write(list.store_key(), &json);
            }
            Err(e) => warn!("Failed to serialize {} list: {}", list, e),
        }
        debug!("Toggled {} in {}: {}", id, list, member);
        member
    }

    pub fn contains(&self, list: ListName, id: ItemId) -> bool {
        self.lists.lock().unwrap().get(list).members.contains(&id)
    }

    /// Ids in the order they were added.
    pub fn ids(&self, list: ListName) -> Vec<ItemId> {
        self.lists.lock().unwrap().get(list).order.clone()
    }
}
