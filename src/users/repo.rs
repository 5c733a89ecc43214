use axum::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::users::query::{SortDirection, UserQuery};
use crate::users::repo_types::{
    DeleteOutcome, InvalidGender, NewUser, UpdateOutcome, User, UserPatch, UserRow,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored record is invalid: {0}")]
    Corrupt(#[from] InvalidGender),
    #[error("store failure: {0}")]
    Backend(String),
}

/// Persistent collection of user records keyed by id.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Filtered, optionally ordered scan.
    async fn find(&self, query: &UserQuery) -> Result<Vec<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Inserts the record and assigns it a fresh id.
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError>;
    /// `None` when no record has this id.
    async fn update(&self, id: Uuid, patch: &UserPatch)
        -> Result<Option<UpdateOutcome>, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<DeleteOutcome, StoreError>;
}

/// Escapes LIKE metacharacters so the pattern matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Text columns sort under `COLLATE "C"` so the order is bytewise, as in
/// the in-memory store.
fn select_users(query: &UserQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT id, name, email, gender FROM users WHERE TRUE");
    if let Some(name) = &query.filter.name_contains {
        qb.push(" AND name ILIKE ")
            .push_bind(format!("%{}%", escape_like(name)));
    }
    if let Some(gender) = &query.filter.gender {
        qb.push(" AND gender = ").push_bind(gender.clone());
    }
    if let Some(sort) = &query.sort {
        qb.push(" ORDER BY ").push(sort.field.column());
        if sort.field.is_text() {
            qb.push(r#" COLLATE "C""#);
        }
        qb.push(match sort.direction {
            SortDirection::Asc => " ASC",
            SortDirection::Desc => " DESC",
        });
    }
    qb
}

/// Absent patch fields keep the stored value; `modified` compares the row
/// before and after within the same statement.
const UPDATE_USER: &str = r#"
    WITH old AS (
        SELECT id, name, email, gender
        FROM users
        WHERE id = $1
    )
    UPDATE users u
    SET name = COALESCE($2, u.name),
        email = COALESCE($3, u.email),
        gender = COALESCE($4, u.gender)
    FROM old
    WHERE u.id = old.id
    RETURNING u.id, u.name, u.email, u.gender,
        (old.name, old.email, old.gender) IS DISTINCT FROM (u.name, u.email, u.gender) AS modified
"#;

#[derive(Debug, FromRow)]
struct UpdatedRow {
    #[sqlx(flatten)]
    user: UserRow,
    modified: bool,
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find(&self, query: &UserQuery) -> Result<Vec<User>, StoreError> {
        let mut qb = select_users(query);
        let rows = qb.build_query_as::<UserRow>().fetch_all(&self.db).await?;
        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, gender
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, gender)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, gender
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(new_user.gender.as_str())
        .fetch_one(&self.db)
        .await?;
        Ok(User::try_from(row)?)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &UserPatch,
    ) -> Result<Option<UpdateOutcome>, StoreError> {
        let row = sqlx::query_as::<_, UpdatedRow>(UPDATE_USER)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.email.as_deref())
            .bind(patch.gender.map(|g| g.as_str()))
            .fetch_optional(&self.db)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(UpdateOutcome {
            matched_count: 1,
            modified_count: u64::from(row.modified),
            user: User::try_from(row.user)?,
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<DeleteOutcome, StoreError> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(DeleteOutcome {
            deleted_count: res.rows_affected(),
        })
    }
}
