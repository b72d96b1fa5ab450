use rocket::outcome::Outcome::{Error, Success};
use rocket::request::{self, FromRequest, Request};

use crate::data::account::Account;
use crate::data::Db;
use crate::resp::jwt::{auth_problem, extract_claims, AuthToken, TokenKind};
use crate::resp::problem::{problems, Problem};
use crate::role::Role;
use crate::security::Security;

/// The authenticated caller, resolved from the access token and the
/// identity store on every request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub account: Account,
    pub token: AuthToken,
}

/// Why the last [`Principal`] guard failed; read back by the catcher.
pub struct AuthFailure(pub Option<Problem>);

impl Principal {
    pub fn id(&self) -> i64 {
        self.account.id
    }

    pub fn role(&self) -> Option<Role> {
        self.account.role()
    }

    /// Callers without a profile get a 400, callers with another role a 403.
    pub fn require(&self, role: Role) -> Result<(), Problem> {
        match self.role() {
            Some(actual) if actual == role => Ok(()),
            Some(_) => Err(problems::forbidden(format!(
                "Only {} accounts are allowed.",
                role
            ))),
            None => Err(problems::bad_request("User profile not found.")),
        }
    }
}

async fn resolve(req: &Request<'_>) -> Result<Principal, Problem> {
    let security = req
        .rocket()
        .state::<Security>()
        .ok_or_else(|| problems::internal("security state isn't managed"))?;
    let db = req
        .rocket()
        .state::<Db>()
        .ok_or_else(|| problems::internal("store isn't managed"))?;

    let token = extract_claims(req, &security.jwt_keys.public)?;
    if token.kind != TokenKind::Access {
        return Err(auth_problem("Refresh tokens can't authorize requests."));
    }

    let account = db
        .get_account(token.user)
        .await?
        .ok_or_else(|| auth_problem("Account no longer exists."))?;

    Ok(Principal { account, token })
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Principal {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        tracing::trace!("resolving principal from request");
        match resolve(req).await {
            Ok(principal) => Success(principal),
            Err(problem) => {
                tracing::debug!("unable to resolve principal: {}", problem);
                req.local_cache(|| AuthFailure(Some(problem.clone())));
                Error((problem.status, problem))
            }
        }
    }
}
