//! Consistency group accessor.

use tracing::debug;

use crate::client::Client;
use crate::error::{ApiError, Result};
use crate::types::Group;
use crate::urn::is_well_formed_id;

pub const SEARCH_GROUP_URI: &str = "block/consistency-groups/search.json?";

pub fn query_group_path(id: &str) -> String {
    format!("block/consistency-groups/{id}.json")
}

/// Resolves a consistency group by id or, when no usable id is set, by
/// name.
#[derive(Debug, Clone)]
pub struct GroupAccessor {
    client: Client,
    id: String,
    name: String,
}

impl GroupAccessor {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            id: String::new(),
            name: String::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn with_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = id.into();
        self
    }

    pub fn with_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Fetch the group directly when the id is a controller URN, otherwise
    /// search for it by name.
    pub fn query(&mut self) -> Result<Group> {
        if !is_well_formed_id(&self.id) {
            debug!(id = %self.id, group_name = %self.name, "id is not a URN, searching by name");
            let query = format!("name={}", self.name);
            return self.search(&query);
        }
        self.fetch()
    }

    /// Bind to the first group matching `query` and fetch it.
    pub fn search(&mut self, query: &str) -> Result<Group> {
        let path = format!("{SEARCH_GROUP_URI}{query}");
        let first = self
            .client
            .search(&path)?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NoMatch {
                query: query.to_string(),
            })?;

        self.id = first.id;
        // Fetch by id directly; a non-URN hit must not bounce back into a
        // name search.
        self.fetch()
    }

    fn fetch(&self) -> Result<Group> {
        self.client.get(&query_group_path(&self.id))
    }
}
