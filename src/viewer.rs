use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use uuid::Uuid;

/// Header the upstream gateway fills in after authenticating the caller.
/// Login itself lives entirely on that side; this service only trusts the
/// forwarded id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The identity a request acts for. Handlers take this and pass the inner
/// id down explicitly; nothing below the router reads ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer(pub Uuid);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing x-user-id header"))?;

        let id = Uuid::parse_str(raw)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "malformed x-user-id header"))?;

        Ok(Viewer(id))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn request_parts(header: Option<&str>) -> Parts {
        let mut req = Request::builder();
        if let Some(value) = header {
            req = req.header(USER_ID_HEADER, value);
        }
        req.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn requests_without_an_identity_are_rejected() {
        let rejection = Viewer::from_request_parts(&mut request_parts(None), &())
            .await
            .unwrap_err();
        assert_eq!(rejection, (StatusCode::UNAUTHORIZED, "missing x-user-id header"));

        let rejection = Viewer::from_request_parts(&mut request_parts(Some("not-a-uuid")), &())
            .await
            .unwrap_err();
        assert_eq!(rejection, (StatusCode::UNAUTHORIZED, "malformed x-user-id header"));
    }

    #[tokio::test]
    async fn a_forwarded_id_becomes_the_viewer() {
        let id = Uuid::now_v7();
        let viewer = Viewer::from_request_parts(&mut request_parts(Some(&id.to_string())), &())
            .await
            .unwrap();
        assert_eq!(viewer, Viewer(id));
    }
}
