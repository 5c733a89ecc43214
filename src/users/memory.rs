use axum::async_trait;
use regex::RegexBuilder;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::users::query::UserQuery;
use crate::users::repo::{StoreError, UserStore};
use crate::users::repo_types::{DeleteOutcome, NewUser, UpdateOutcome, User, UserPatch};

/// Process-local store. Insertion order is the default list order.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find(&self, query: &UserQuery) -> Result<Vec<User>, StoreError> {
        let name_re = match &query.filter.name_contains {
            Some(s) => Some(
                RegexBuilder::new(&regex::escape(s))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| StoreError::Backend(e.to_string()))?,
            ),
            None => None,
        };

        let users = self.users.read().await;
        let mut out: Vec<User> = users
            .iter()
            .filter(|u| name_re.as_ref().map_or(true, |re| re.is_match(&u.name)))
            .filter(|u| {
                query
                    .filter
                    .gender
                    .as_deref()
                    .map_or(true, |g| u.gender.as_str() == g)
            })
            .cloned()
            .collect();

        if let Some(sort) = &query.sort {
            out.sort_by(|a, b| sort.compare(a, b));
        }
        Ok(out)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            gender: new_user.gender,
        };
        self.users.write().await.push(user.clone());
        Ok(user)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &UserPatch,
    ) -> Result<Option<UpdateOutcome>, StoreError> {
        let mut users = self.users.write().await;
        let Some(slot) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        let (next, changed) = patch.apply(slot);
        if changed {
            *slot = next.clone();
        }
        Ok(Some(UpdateOutcome {
            matched_count: 1,
            modified_count: u64::from(changed),
            user: next,
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<DeleteOutcome, StoreError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(DeleteOutcome {
            deleted_count: (before - users.len()) as u64,
        })
    }
}
