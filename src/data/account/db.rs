use mongodb::options::FindOptions;
use mongodb::Database;
use rocket::futures::TryStreamExt;

use super::{Account, NewAccount};
use crate::data::{filter, is_duplicate_key, sequence};
use crate::error::{StoreError, StoreResult};
use crate::middleware::paging::PageState;

pub static ACCOUNT_COLLECTION_NAME: &str = "accounts";

/// Accounts and their per-user role.
#[rocket::async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the username is taken.
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account>;

    async fn get_account(&self, id: i64) -> StoreResult<Option<Account>>;

    async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>>;

    async fn list_accounts(&self, page: PageState) -> StoreResult<Vec<Account>>;

    async fn update_account(&self, account: &Account) -> StoreResult<()>;
}

#[rocket::async_trait]
impl IdentityStore for Database {
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account> {
        let username = account.username.clone();
        let id = sequence::next_id(self, ACCOUNT_COLLECTION_NAME).await?;
        let account = account.into_account(id);

        match self
            .collection::<Account>(ACCOUNT_COLLECTION_NAME)
            .insert_one(&account, None)
            .await
        {
            Ok(_) => Ok(account),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Conflict {
                entity: "username",
                key: username,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_account(&self, id: i64) -> StoreResult<Option<Account>> {
        Ok(self
            .collection::<Account>(ACCOUNT_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await?)
    }

    async fn find_account_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        Ok(self
            .collection::<Account>(ACCOUNT_COLLECTION_NAME)
            .find_one(filter::by_username(username), None)
            .await?)
    }

    async fn list_accounts(&self, page: PageState) -> StoreResult<Vec<Account>> {
        let options = FindOptions::builder()
            .sort(bson::doc! { "_id": 1 })
            .skip(page.skip())
            .limit(page.limit())
            .build();

        Ok(self
            .collection::<Account>(ACCOUNT_COLLECTION_NAME)
            .find(None, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn update_account(&self, account: &Account) -> StoreResult<()> {
        let result = self
            .collection::<Account>(ACCOUNT_COLLECTION_NAME)
            .replace_one(filter::by_id(account.id), account, None)
            .await?;

        if result.matched_count == 0 {
            return Err(StoreError::Vanished {
                entity: "account",
                key: account.id.to_string(),
            });
        }
        Ok(())
    }
}
