//! Fixtures shared by unit and HTTP tests. Nothing here touches MongoDB or
//! the filesystem.

use std::sync::Arc;

use rocket::http::Header;
use rocket::local::asynchronous::Client;

use crate::config::Config;
use crate::data::account::{Account, NewAccount, PasswordHash, Profile};
use crate::data::course::{Course, NewCourse};
use crate::data::memory::MemoryStore;
use crate::data::{CourseDirectory, Db, IdentityStore};
use crate::resp::jwt::{AuthToken, TokenKind};
use crate::role::Role;
use crate::security::{KeySet, Security};

pub const TEST_PASSWORD: &str = "correct horse";
pub const TEST_SALT: [u8; 16] = [7; 16];
/// Lowest cost bcrypt accepts; keeps hashing fast in tests.
pub const TEST_PASSWORD_COST: u32 = 4;

pub fn security() -> Security {
    Security {
        salt: TEST_SALT,
        jwt_keys: KeySet {
            public: include_bytes!("testdata/user_auth.pem.pub").to_vec(),
            private: include_bytes!("testdata/user_auth.pem").to_vec(),
        },
    }
}

pub fn config() -> Config {
    let mut config = Config::default();
    config.password_cost = TEST_PASSWORD_COST;
    config
}

pub async fn seed_account<S>(store: &S, username: &str, role: Option<Role>) -> Account
where
    S: IdentityStore + ?Sized,
{
    store
        .create_account(NewAccount {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: username.to_string(),
            last_name: String::new(),
            pw_hash: PasswordHash::new(TEST_PASSWORD, &TEST_SALT, TEST_PASSWORD_COST),
            profile: role.map(|role| Profile {
                role,
                ..Profile::default()
            }),
        })
        .await
        .expect("seeding an account must succeed")
}

pub async fn seed_course<S>(store: &S, owner: &Account, name: &str) -> Course
where
    S: CourseDirectory + ?Sized,
{
    store
        .create_course(NewCourse {
            name: name.to_string(),
            description: format!("All about {}", name),
            price: 100_000,
            teacher: owner.id,
            category: None,
        })
        .await
        .expect("seeding a course must succeed")
}

/// `Authorization` header carrying a fresh access token for `account`.
pub fn bearer(account: &Account) -> Header<'static> {
    bearer_of_kind(account, TokenKind::Access)
}

pub fn bearer_of_kind(account: &Account, kind: TokenKind) -> Header<'static> {
    let lifetime = match kind {
        TokenKind::Access => config().access_token_lifetime(),
        TokenKind::Refresh => config().refresh_token_lifetime(),
    };
    let token = AuthToken::new(account.id, kind, lifetime)
        .encode_jwt(&security().jwt_keys.private)
        .expect("fixture keys must sign");

    Header::new("Authorization", format!("Bearer {}", token))
}

/// A tracked client over the full API backed by `store`.
pub async fn client(store: Arc<MemoryStore>) -> Client {
    let db: Db = store;
    let rocket = crate::build(config(), security(), db).expect("test rocket must build");

    Client::tracked(rocket)
        .await
        .expect("test rocket must ignite")
}
