use uuid::Uuid;

use crate::model::{Account, Role, now_nanos};

use super::{Store, StoreError, StoreResult, parse_id};

type AccountRow = (String, String, Option<String>);

fn account_from_row((id, email, username): AccountRow) -> StoreResult<Account> {
    Ok(Account {
        id: parse_id(&id)?,
        email,
        username,
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Store {
    pub async fn create_account(&self, email: &str, password: &str, username: Option<&str>) -> StoreResult<Account> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(StoreError::Invalid(format!("invalid email address {email:?}")));
        }
        if password.is_empty() {
            return Err(StoreError::Invalid("password must not be empty".to_owned()));
        }

        let password_hash = self.hash_password(password.to_owned()).await?;
        let account = Account {
            id: Uuid::now_v7(),
            email,
            username: username.map(str::to_owned),
        };

        let result = sqlx::query("INSERT INTO accounts (id,email,username,password_hash,created_at) VALUES (?,?,?,?,?)")
            .bind(account.id.to_string())
            .bind(&account.email)
            .bind(&account.username)
            .bind(password_hash)
            .bind(now_nanos())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(account),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::AlreadyRegistered),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        sqlx::query_as::<_, AccountRow>("SELECT id,email,username FROM accounts WHERE email=?")
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?
            .map(account_from_row)
            .transpose()
    }

    /// Email/password sign-in. `None` covers both unknown email and wrong
    /// password.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> StoreResult<Option<Account>> {
        let row: Option<(String, String, Option<String>, String)> =
            sqlx::query_as("SELECT id,email,username,password_hash FROM accounts WHERE email=?")
                .bind(normalize_email(email))
                .fetch_optional(&self.pool)
                .await?;
        let Some((id, email, username, password_hash)) = row else {
            return Ok(None);
        };

        if !self.check_password(password_hash, password.to_owned()).await? {
            return Ok(None);
        }

        account_from_row((id, email, username)).map(Some)
    }

    pub async fn has_role(&self, user_id: Uuid, role: Role) -> StoreResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM user_roles WHERE user_id=? AND role=?")
            .bind(user_id.to_string())
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Returns false when the account already held the role.
    pub async fn grant_role(&self, user_id: Uuid, role: Role) -> StoreResult<bool> {
        let result = sqlx::query("INSERT OR IGNORE INTO user_roles (user_id,role) VALUES (?,?)")
            .bind(user_id.to_string())
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
