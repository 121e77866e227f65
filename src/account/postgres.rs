//! PostgreSQL account store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::account::{Account, AccountRepository, LoginId, PasswordHash, StoreError};

const SELECT_ACCOUNT: &str = r#"SELECT
        id,
        login_id,
        password,
        display_name,
        email,
        comment,
        refresh_token,
        role,
        status,
        status_changed_at,
        created_at,
        modified_at,
        version
    FROM accounts"#;

/// Account as saved on database.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: String,
    login_id: String,
    password: String,
    display_name: String,
    email: String,
    comment: Option<String>,
    refresh_token: Option<String>,
    role: String,
    status: String,
    status_changed_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let corrupted = |err: crate::account::AccountError| {
            StoreError::Corrupted(format!("account {}: {err}", row.id))
        };

        Ok(Account {
            login_id: LoginId::parse(&row.login_id).map_err(corrupted)?,
            password: PasswordHash::parse(row.password.clone()).map_err(corrupted)?,
            role: row.role.parse()?,
            status: row.status.parse()?,
            id: row.id,
            display_name: row.display_name,
            email: row.email,
            comment: row.comment,
            refresh_token: row.refresh_token,
            status_changed_at: row.status_changed_at,
            created_at: row.created_at,
            modified_at: row.modified_at,
            version: row.version,
        })
    }
}

/// Account store backed by PostgreSQL.
#[derive(Clone)]
pub struct PostgresAccountRepository {
    pool: Pool<Postgres>,
}

impl PostgresAccountRepository {
    /// Create a new [`PostgresAccountRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn find_by(&self, field: Field, value: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("{SELECT_ACCOUNT} WHERE {field} = $1");

        sqlx::query_as::<_, AccountRow>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .map(Account::try_from)
            .transpose()
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<Account>, StoreError> {
        self.find_by(Field::LoginId, login_id).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, StoreError> {
        self.find_by(Field::Id, id).await
    }

    async fn create(&self, account: &Account) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"INSERT INTO accounts
                (id, login_id, password, display_name, email, comment, refresh_token,
                 role, status, status_changed_at, created_at, modified_at, version)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
        )
        .bind(&account.id)
        .bind(account.login_id.as_str())
        .bind(account.password.as_str())
        .bind(&account.display_name)
        .bind(&account.email)
        .bind(&account.comment)
        .bind(&account.refresh_token)
        .bind(account.role.as_str())
        .bind(account.status.as_str())
        .bind(account.status_changed_at)
        .bind(account.created_at)
        .bind(account.modified_at)
        .bind(account.version)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_database_error()
                    .is_some_and(|e| e.is_unique_violation()) =>
            {
                Err(StoreError::Conflict(account.login_id.to_string()))
            },
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, account: &Account) -> Result<bool, StoreError> {
        // `login_id`, `id` and `created_at` are immutable.
        let result = sqlx::query(
            r#"UPDATE accounts
                SET password = $1, display_name = $2, email = $3, comment = $4,
                    refresh_token = $5, role = $6, status = $7,
                    status_changed_at = $8, modified_at = $9, version = version + 1
                WHERE id = $10 AND version = $11"#,
        )
        .bind(account.password.as_str())
        .bind(&account.display_name)
        .bind(&account.email)
        .bind(&account.comment)
        .bind(&account.refresh_token)
        .bind(account.role.as_str())
        .bind(account.status.as_str())
        .bind(account.status_changed_at)
        .bind(account.modified_at)
        .bind(&account.id)
        .bind(account.version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Id,
    LoginId,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Field::Id => write!(f, "id"),
            Field::LoginId => write!(f, "login_id"),
        }
    }
}
