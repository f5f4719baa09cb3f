use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One release announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub guid: String,
    pub link: String,
    /// Raw headline, e.g. "Frieren #12".
    pub title: String,
    pub pub_date: Option<DateTime<Utc>>,
}

/// A fetched feed, items in publication order as served.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub items: Vec<FeedItem>,
    pub last_build_date: Option<DateTime<Utc>>,
}

impl Feed {
    /// Items of `self` whose guid does not appear in `previous`, in feed order.
    pub fn items_not_in(&self, previous: &Feed) -> Vec<FeedItem> {
        let known: HashSet<&str> = previous.items.iter().map(|i| i.guid.as_str()).collect();
        self.items
            .iter()
            .filter(|item| !known.contains(item.guid.as_str()))
            .cloned()
            .collect()
    }
}
