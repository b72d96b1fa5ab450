use rocket::http::{CookieJar, Status};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::Config;
use crate::data::account::{NewAccount, PasswordHash, Profile};
use crate::data::Db;
use crate::middleware::paging::PageState;
use crate::resp::auth::Principal;
use crate::resp::jwt::{auth_problem, AuthToken, TokenKind};
use crate::resp::problem::{problems, Problem};
use crate::role::Role;
use crate::route::view::{AccountView, UserListItem};
use crate::security::{Salt, Security};

const MAX_USERNAME_LENGTH: usize = 150;

pub mod problem {
    use crate::resp::problem::{problems, Problem};
    use rocket::http::Status;

    pub fn bad_username(username: impl ToString, detail: impl ToString) -> Problem {
        problems::bad_request(detail)
            .insert_str("username", username)
            .clone()
    }

    pub fn bad_login() -> Problem {
        Problem::new_untyped(Status::Unauthorized, "Unable to authorize user.")
            .detail("No active account found with the given credentials")
            .clone()
    }
}

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

fn valid_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), Problem> {
        if self.username.is_empty() {
            return Err(problem::bad_username(&self.username, "Username is required."));
        }
        if self.username.chars().count() > MAX_USERNAME_LENGTH {
            return Err(problem::bad_username(
                &self.username,
                format!("Username can't be longer than {} characters.", MAX_USERNAME_LENGTH),
            ));
        }
        if !self.username.chars().all(valid_username_char) {
            return Err(problem::bad_username(
                &self.username,
                "Username may only contain letters, digits and @/./+/-/_ characters.",
            ));
        }
        if self.password.is_empty() {
            return Err(problems::bad_request("Password is required."));
        }
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(problems::bad_request("Enter a valid email address."));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: AccountView,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessToken {
    pub access: String,
}

/// bcrypt is deliberately slow, so it runs on the blocking pool.
pub(crate) async fn hash_password(
    password: String,
    salt: Salt,
    cost: u32,
) -> Result<PasswordHash, Problem> {
    tokio::task::spawn_blocking(move || PasswordHash::new(password, &salt, cost))
        .await
        .map_err(problems::internal)
}

/// Register a new account with its profile
#[utoipa::path(
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid payload or username taken", body = Problem),
    )
)]
#[post("/register", format = "application/json", data = "<register>")]
#[tracing::instrument(skip(db, c, security))]
pub async fn register(
    register: Json<RegisterRequest>,
    db: &State<Db>,
    c: &State<Config>,
    security: &State<Security>,
) -> Result<status::Custom<Json<RegisterResponse>>, Problem> {
    register.validate()?;
    let register = register.into_inner();

    let pw_hash = hash_password(register.password, security.salt, c.password_cost).await?;

    let account = db
        .create_account(NewAccount {
            username: register.username,
            email: register.email,
            first_name: register.first_name,
            last_name: register.last_name,
            pw_hash,
            profile: Some(Profile {
                role: register.role,
                phone_number: register.phone_number,
                description: register.description,
            }),
        })
        .await?;

    tracing::info!("registered {} '{}'", register.role, account.username);

    Ok(status::Custom(
        Status::Created,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: AccountView::from(account),
        }),
    ))
}

/// Exchange credentials for an access/refresh token pair
///
/// The access token is also set as the auth cookie.
#[utoipa::path(
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 401, description = "Bad credentials", body = Problem),
    )
)]
#[post("/login", format = "application/json", data = "<login>")]
#[tracing::instrument(skip(cookies, db, c, security))]
pub async fn login(
    login: Json<LoginRequest>,
    cookies: &CookieJar<'_>,
    db: &State<Db>,
    c: &State<Config>,
    security: &State<Security>,
) -> Result<Json<TokenPair>, Problem> {
    let login = login.into_inner();

    // VULN: no rate limiting of failed attempts per source
    let account = db
        .find_account_by_username(&login.username)
        .await?
        .ok_or_else(problem::bad_login)?;

    let attempt = hash_password(login.password, security.salt, c.password_cost).await?;
    if attempt != account.pw_hash {
        return Err(problem::bad_login());
    }

    let private_key = &security.jwt_keys.private;
    let access = AuthToken::access(&account, c);
    cookies.add(access.cookie(private_key)?);

    Ok(Json(TokenPair {
        access: access.encode_jwt(private_key)?,
        refresh: AuthToken::refresh(&account, c).encode_jwt(private_key)?,
    }))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessToken),
        (status = 401, description = "Invalid, expired or non-refresh token", body = Problem),
    )
)]
#[post("/token/refresh", format = "application/json", data = "<refresh>")]
#[tracing::instrument(skip(db, c, security))]
pub async fn token_refresh(
    refresh: Json<RefreshRequest>,
    db: &State<Db>,
    c: &State<Config>,
    security: &State<Security>,
) -> Result<Json<AccessToken>, Problem> {
    let token = AuthToken::decode_jwt(&refresh.refresh, &security.jwt_keys.public)?;
    if token.kind != TokenKind::Refresh {
        return Err(auth_problem("Token is not a refresh token."));
    }

    let account = db
        .get_account(token.user)
        .await?
        .ok_or_else(|| auth_problem("Account no longer exists."))?;

    Ok(Json(AccessToken {
        access: AuthToken::access(&account, c).encode_jwt(&security.jwt_keys.private)?,
    }))
}

/// List accounts
#[utoipa::path(
    params(
        ("len" = Option<u32>, Query, description = "page length, at most 100"),
        ("page" = Option<u32>, Query, description = "zero based page index"),
    ),
    responses(
        (status = 200, description = "One page of accounts", body = Vec<UserListItem>),
        (status = 401, description = "Missing or expired token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/users")]
#[tracing::instrument(skip(db))]
pub async fn user_list(
    _caller: Principal,
    page: PageState,
    db: &State<Db>,
) -> Result<Json<Vec<UserListItem>>, Problem> {
    let accounts = db.list_accounts(page).await?;

    Ok(Json(accounts.into_iter().map(UserListItem::from).collect()))
}
