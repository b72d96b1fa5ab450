use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use crypto::bcrypt::bcrypt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::role::Role;
use crate::security::Salt;

pub mod db;

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct PasswordHash([u8; 24]);

impl PasswordHash {
    /// SHA-256 first, so bcrypt never sees more than 32 bytes of input.
    pub fn new(password: impl AsRef<str>, salt: &Salt, cost: u32) -> PasswordHash {
        let mut pw_hash: [u8; 24] = [0; 24];

        let mut sha = Sha256::new();
        sha2::Digest::update(&mut sha, password.as_ref().as_bytes());

        bcrypt(
            cost.clamp(MIN_COST, MAX_COST),
            salt,
            sha.finalize().as_slice(),
            &mut pw_hash,
        );

        PasswordHash(pw_hash)
    }

    pub fn verify(&self, password: impl AsRef<str>, salt: &Salt, cost: u32) -> bool {
        *self == PasswordHash::new(password, salt, cost)
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub role: Role,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub pw_hash: PasswordHash,
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date_joined: DateTime<Utc>,
}

impl Account {
    /// `None` when the account never got a profile.
    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|it| it.role)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role() == Some(role)
    }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub pw_hash: PasswordHash,
    pub profile: Option<Profile>,
}

impl NewAccount {
    pub fn into_account(self, id: i64) -> Account {
        Account {
            id,
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            pw_hash: self.pw_hash,
            profile: self.profile,
            date_joined: Utc::now(),
        }
    }
}
