use tracing::{debug, warn};

use crate::client::api::UsersApi;
use crate::client::state::{reduce, Action, Effect, ViewState};

/// Drives a `ViewState`: applies actions, issues the requests they call for
/// and feeds each outcome back in. Every request yields exactly one follow-up
/// action, success or failure, so loading flags always clear.
///
/// Overlapping list refreshes are not deduplicated; whichever response is
/// dispatched last replaces the list.
pub struct Controller<A> {
    api: A,
    state: ViewState,
}

impl<A: UsersApi> Controller<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: ViewState::default(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Initial load.
    pub async fn mount(&mut self) {
        self.dispatch(Action::Refresh).await;
    }

    pub async fn dispatch(&mut self, action: Action) {
        let mut next = Some(action);
        while let Some(action) = next.take() {
            debug!(?action, "dispatch");
            let effect = reduce(&mut self.state, action);
            next = self.run(effect).await;
        }
    }

    async fn run(&self, effect: Effect) -> Option<Action> {
        match effect {
            Effect::None => None,
            Effect::FetchList(query) => Some(match self.api.list(&query).await {
                Ok(users) => Action::ListFetched(users),
                Err(e) => {
                    warn!(error = %e, "list users failed");
                    Action::ListFailed(e.to_string())
                }
            }),
            Effect::FetchUser(id) => Some(match self.api.get(id).await {
                Ok(user) => Action::ViewFetched(user),
                Err(e) => {
                    warn!(error = %e, %id, "fetch user failed");
                    Action::ViewFailed(id, e.to_string())
                }
            }),
            Effect::Create(req) => Some(match self.api.create(&req).await {
                Ok(user) => Action::Created(user),
                Err(e) => {
                    warn!(error = %e, "create user failed");
                    Action::MutationFailed(e.to_string())
                }
            }),
            Effect::Update(id, req) => Some(match self.api.update(id, &req).await {
                Ok(outcome) => Action::Updated(outcome.user),
                Err(e) => {
                    warn!(error = %e, %id, "update user failed");
                    Action::MutationFailed(e.to_string())
                }
            }),
            Effect::Delete(id) => Some(match self.api.delete(id).await {
                Ok(_) => Action::Deleted(id),
                Err(e) => {
                    warn!(error = %e, %id, "delete user failed");
                    Action::MutationFailed(e.to_string())
                }
            }),
        }
    }
}
