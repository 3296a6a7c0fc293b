use rocket::request::{FromRequest, Outcome, Request};

use crate::config::Config;

pub const ACTING_USER_HEADER: &str = "X-Acting-User";

/// The user a write is attributed to.
///
/// Read from the `X-Acting-User` header. Requests without a usable header
/// are attributed to the configured system user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser(pub i64);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ActingUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let fallback = request
            .rocket()
            .state::<Config>()
            .map(|c| c.cascade.system_user_id)
            .unwrap_or(0);

        let id = request
            .headers()
            .get_one(ACTING_USER_HEADER)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(fallback);

        Outcome::Success(ActingUser(id))
    }
}
