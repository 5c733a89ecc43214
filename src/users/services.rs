use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::users::dto::{CreateUserRequest, ListQuery, UpdateUserRequest};
use crate::users::query::UserQuery;
use crate::users::repo::UserStore;
use crate::users::repo_types::{DeleteOutcome, Gender, NewUser, UpdateOutcome, User, UserPatch};

fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("{field} is required"))),
    }
}

fn non_empty(field: &str, value: Option<String>) -> Result<Option<String>, ApiError> {
    match value {
        Some(v) if v.trim().is_empty() => {
            Err(ApiError::BadRequest(format!("{field} must not be empty")))
        }
        other => Ok(other),
    }
}

fn parse_gender(raw: &str) -> Result<Gender, ApiError> {
    raw.parse::<Gender>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("invalid user id: {raw}")))
}

pub fn validate_new_user(req: CreateUserRequest) -> Result<NewUser, ApiError> {
    let name = required("name", req.name)?;
    let email = required("email", req.email)?;
    let gender = parse_gender(&required("gender", req.gender)?)?;
    Ok(NewUser {
        name,
        email,
        gender,
    })
}

pub fn validate_patch(req: UpdateUserRequest) -> Result<UserPatch, ApiError> {
    let gender = match non_empty("gender", req.gender)? {
        Some(g) => Some(parse_gender(&g)?),
        None => None,
    };
    Ok(UserPatch {
        name: non_empty("name", req.name)?,
        email: non_empty("email", req.email)?,
        gender,
    })
}

pub async fn list_users(store: &dyn UserStore, params: &ListQuery) -> Result<Vec<User>, ApiError> {
    let query = UserQuery::build(
        params.name.as_deref(),
        params.gender.as_deref(),
        params.sort.as_deref(),
    )
    .map_err(|e| {
        warn!(error = %e, "rejected list query");
        ApiError::from(e)
    })?;

    store.find(&query).await.map_err(|e| {
        error!(error = %e, "list users failed");
        ApiError::from(e)
    })
}

pub async fn get_user(store: &dyn UserStore, raw_id: &str) -> Result<User, ApiError> {
    // An unparseable id cannot name any record, so it reads as not found.
    let Ok(id) = Uuid::parse_str(raw_id) else {
        return Err(ApiError::NotFound("User not found".into()));
    };
    match store.find_by_id(id).await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(ApiError::NotFound("User not found".into())),
        Err(e) => {
            error!(error = %e, %id, "get user failed");
            Err(e.into())
        }
    }
}

pub async fn create_user(
    store: &dyn UserStore,
    req: CreateUserRequest,
) -> Result<User, ApiError> {
    let new_user = validate_new_user(req).map_err(|e| {
        warn!(error = %e, "create user rejected");
        e
    })?;
    let user = store.insert(new_user).await.map_err(|e| {
        error!(error = %e, "insert user failed");
        ApiError::from(e)
    })?;
    info!(user_id = %user.id, "user created");
    Ok(user)
}

pub async fn update_user(
    store: &dyn UserStore,
    raw_id: &str,
    req: UpdateUserRequest,
) -> Result<UpdateOutcome, ApiError> {
    let id = parse_id(raw_id)?;
    let patch = validate_patch(req).map_err(|e| {
        warn!(error = %e, %id, "update user rejected");
        e
    })?;

    // Nothing to write; report the match without touching the store.
    if patch.is_empty() {
        debug!(%id, "empty patch");
        let user = store.find_by_id(id).await.map_err(|e| {
            error!(error = %e, %id, "update user failed");
            ApiError::from(e)
        })?;
        return match user {
            Some(user) => Ok(UpdateOutcome {
                matched_count: 1,
                modified_count: 0,
                user,
            }),
            None => {
                warn!(%id, "update of unknown user");
                Err(ApiError::NotFound("User not found".into()))
            }
        };
    }

    let outcome = store.update(id, &patch).await.map_err(|e| {
        error!(error = %e, %id, "update user failed");
        ApiError::from(e)
    })?;
    match outcome {
        Some(outcome) => {
            info!(user_id = %id, modified = outcome.modified_count, "user updated");
            Ok(outcome)
        }
        None => {
            warn!(%id, "update of unknown user");
            Err(ApiError::NotFound("User not found".into()))
        }
    }
}

pub async fn delete_user(store: &dyn UserStore, raw_id: &str) -> Result<DeleteOutcome, ApiError> {
    let id = parse_id(raw_id)?;
    let outcome = store.delete(id).await.map_err(|e| {
        error!(error = %e, %id, "delete user failed");
        ApiError::from(e)
    })?;
    if outcome.deleted_count == 0 {
        warn!(%id, "delete of unknown user");
        return Err(ApiError::NotFound("User not found".into()));
    }
    info!(user_id = %id, "user deleted");
    Ok(outcome)
}
