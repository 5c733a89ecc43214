//! View state of the user list screen and the pure transitions applied to it.
//!
//! `reduce` never performs I/O. It mutates the state and hands back the
//! request (if any) the caller must issue; the outcome of that request comes
//! back in as another `Action`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::dto::{CreateUserRequest, ListQuery, UpdateUserRequest};
use crate::users::query::{SortDirective, SortField};
use crate::users::repo_types::{Gender, User};

pub const FIELDS_REQUIRED: &str = "All fields are required";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    pub gender: Option<Gender>,
}

/// Editable fields of the create and edit dialogs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserForm {
    pub name: String,
    pub email: String,
    pub gender: String,
    pub error: Option<String>,
    pub submitting: bool,
}

impl UserForm {
    fn from_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            gender: user.gender.to_string(),
            ..Default::default()
        }
    }

    fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.email.is_empty() && !self.gender.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormField {
    Name,
    Email,
    Gender,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modal {
    #[default]
    Closed,
    Create {
        form: UserForm,
    },
    Edit {
        id: Uuid,
        form: UserForm,
    },
    View {
        id: Uuid,
        user: Option<User>,
        loading: bool,
        error: Option<String>,
    },
}

impl Modal {
    fn form_mut(&mut self) -> Option<&mut UserForm> {
        match self {
            Modal::Create { form } | Modal::Edit { form, .. } => Some(form),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub users: Vec<User>,
    pub loading: bool,
    pub error: Option<String>,
    pub filter: Filter,
    pub sort: Option<SortDirective>,
    pub modal: Modal,
    /// Record awaiting the user's delete confirmation.
    pub pending_delete: Option<Uuid>,
}

impl ViewState {
    /// List request matching the current filter and sort.
    pub fn list_query(&self) -> ListQuery {
        ListQuery {
            name: Some(self.filter.name.clone()).filter(|n| !n.is_empty()),
            gender: self.filter.gender.map(|g| g.to_string()),
            sort: self.sort.map(|s| s.to_string()),
        }
    }

    fn begin_fetch(&mut self) -> Effect {
        self.loading = true;
        self.error = None;
        Effect::FetchList(self.list_query())
    }
}

/// Ascending on a new field, flipping to descending on a second click and
/// back to ascending on a third.
pub fn toggle_sort(current: Option<SortDirective>, field: SortField) -> SortDirective {
    match current {
        Some(d) if d.field == field && !d.is_descending() => SortDirective::desc(field),
        _ => SortDirective::asc(field),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Refresh,
    FilterNameChanged(String),
    FilterGenderChanged(Option<Gender>),
    SortToggled(SortField),
    ListFetched(Vec<User>),
    ListFailed(String),

    OpenCreate,
    OpenEdit(Uuid),
    OpenView(Uuid),
    CloseModal,
    FieldChanged(FormField, String),
    SubmitForm,
    ViewFetched(User),
    ViewFailed(Uuid, String),

    Created(User),
    Updated(User),
    MutationFailed(String),

    DeleteRequested(Uuid),
    DeleteCancelled,
    DeleteConfirmed,
    Deleted(Uuid),
}

/// Request the caller must issue after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    FetchList(ListQuery),
    FetchUser(Uuid),
    Create(CreateUserRequest),
    Update(Uuid, UpdateUserRequest),
    Delete(Uuid),
}

pub fn reduce(state: &mut ViewState, action: Action) -> Effect {
    match action {
        Action::Refresh => state.begin_fetch(),
        Action::FilterNameChanged(name) => {
            state.filter.name = name;
            state.begin_fetch()
        }
        Action::FilterGenderChanged(gender) => {
            state.filter.gender = gender;
            state.begin_fetch()
        }
        Action::SortToggled(field) => {
            state.sort = Some(toggle_sort(state.sort, field));
            state.begin_fetch()
        }
        Action::ListFetched(users) => {
            state.users = users;
            state.loading = false;
            state.error = None;
            Effect::None
        }
        Action::ListFailed(message) => {
            state.loading = false;
            state.error = Some(message);
            Effect::None
        }

        Action::OpenCreate => {
            state.modal = Modal::Create {
                form: UserForm::default(),
            };
            Effect::None
        }
        Action::OpenEdit(id) => {
            if let Some(user) = state.users.iter().find(|u| u.id == id) {
                state.modal = Modal::Edit {
                    id,
                    form: UserForm::from_user(user),
                };
            }
            Effect::None
        }
        Action::OpenView(id) => {
            state.modal = Modal::View {
                id,
                user: None,
                loading: true,
                error: None,
            };
            Effect::FetchUser(id)
        }
        Action::CloseModal => {
            state.modal = Modal::Closed;
            Effect::None
        }
        Action::FieldChanged(field, value) => {
            if let Some(form) = state.modal.form_mut() {
                match field {
                    FormField::Name => form.name = value,
                    FormField::Email => form.email = value,
                    FormField::Gender => form.gender = value,
                }
            }
            Effect::None
        }
        Action::SubmitForm => submit_form(&mut state.modal),
        Action::ViewFetched(fetched) => {
            if let Modal::View {
                id, user, loading, ..
            } = &mut state.modal
            {
                if *id == fetched.id {
                    *user = Some(fetched);
                    *loading = false;
                }
            }
            Effect::None
        }
        Action::ViewFailed(failed_id, message) => {
            if let Modal::View {
                id, loading, error, ..
            } = &mut state.modal
            {
                if *id == failed_id {
                    *loading = false;
                    *error = Some(message);
                }
            }
            Effect::None
        }

        Action::Created(user) => {
            state.users.push(user);
            state.modal = Modal::Closed;
            Effect::None
        }
        Action::Updated(user) => {
            if let Some(slot) = state.users.iter_mut().find(|u| u.id == user.id) {
                *slot = user;
            }
            state.modal = Modal::Closed;
            Effect::None
        }
        Action::MutationFailed(message) => {
            match state.modal.form_mut() {
                Some(form) => {
                    form.submitting = false;
                    form.error = Some(message);
                }
                None => state.error = Some(message),
            }
            Effect::None
        }

        Action::DeleteRequested(id) => {
            state.pending_delete = Some(id);
            Effect::None
        }
        Action::DeleteCancelled => {
            state.pending_delete = None;
            Effect::None
        }
        Action::DeleteConfirmed => match state.pending_delete.take() {
            Some(id) => Effect::Delete(id),
            None => Effect::None,
        },
        Action::Deleted(id) => {
            state.users.retain(|u| u.id != id);
            Effect::None
        }
    }
}

fn submit_form(modal: &mut Modal) -> Effect {
    let (edit_id, form) = match modal {
        Modal::Create { form } => (None, form),
        Modal::Edit { id, form } => (Some(*id), form),
        _ => return Effect::None,
    };
    if form.submitting {
        return Effect::None;
    }
    if !form.is_complete() {
        form.error = Some(FIELDS_REQUIRED.to_string());
        return Effect::None;
    }
    form.error = None;
    form.submitting = true;

    match edit_id {
        None => Effect::Create(CreateUserRequest {
            name: Some(form.name.clone()),
            email: Some(form.email.clone()),
            gender: Some(form.gender.clone()),
        }),
        Some(id) => Effect::Update(
            id,
            UpdateUserRequest {
                name: Some(form.name.clone()),
                email: Some(form.email.clone()),
                gender: Some(form.gender.clone()),
            },
        ),
    }
}
