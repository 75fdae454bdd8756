//! Caller identity extraction
//!
//! Authentication happens upstream; the gateway forwards the resolved user as
//! `x-user-id`, `x-user-name` and `x-user-role` headers.

use super::error::Problem;
use crate::contract::{Actor, RecordId};
use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve the acting user from forwarded identity headers
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Problem> {
    let raw_id = header(headers, USER_ID_HEADER)
        .ok_or_else(|| Problem::unauthorized(format!("missing {USER_ID_HEADER} header")))?;
    let user_id: RecordId = raw_id
        .parse()
        .map_err(|_| Problem::unauthorized(format!("malformed {USER_ID_HEADER} header")))?;
    let name = header(headers, USER_NAME_HEADER).unwrap_or_default();

    Ok(match header(headers, USER_ROLE_HEADER) {
        Some(role) if role.eq_ignore_ascii_case("admin") => Actor::admin(user_id, name),
        _ => Actor::agent(user_id, name),
    })
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn admin_role_is_case_insensitive() {
        let actor = actor_from_headers(&headers(&[
            (USER_ID_HEADER, "3"),
            (USER_NAME_HEADER, "Dana"),
            (USER_ROLE_HEADER, "Admin"),
        ]))
        .unwrap();
        assert_eq!(actor.user_id, 3);
        assert_eq!(actor.name, "Dana");
        assert!(actor.is_admin);
    }

    #[test]
    fn other_roles_are_agents() {
        let actor =
            actor_from_headers(&headers(&[(USER_ID_HEADER, "9"), (USER_ROLE_HEADER, "agent")]))
                .unwrap();
        assert!(!actor.is_admin);
        assert_eq!(actor.name, "");
    }

    #[test]
    fn missing_or_bad_id_is_unauthorized() {
        assert_eq!(actor_from_headers(&HeaderMap::new()).unwrap_err().status, 401);
        assert_eq!(
            actor_from_headers(&headers(&[(USER_ID_HEADER, "abc")]))
                .unwrap_err()
                .status,
            401
        );
    }
}
