use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{dto::identity::Caller, error::AppError};

pub(crate) const USER_ID_HEADER: &str = "x-user-id";
pub(crate) const USER_NAME_HEADER: &str = "x-user-name";

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER).ok_or_else(|| {
            AppError::Unauthorized("missing caller identity header `X-User-Id`".into())
        })?;
        let display_name = header(parts, USER_NAME_HEADER).unwrap_or(user_id);

        Ok(Caller::new(user_id, display_name))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<Caller, AppError> {
        let (mut parts, _) = request.into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_identity_headers() {
        let request = Request::builder()
            .header("X-User-Id", "u-1")
            .header("X-User-Name", "Asha")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap(), Caller::new("u-1", "Asha"));
    }

    #[tokio::test]
    async fn display_name_falls_back_to_id() {
        let request = Request::builder()
            .header("X-User-Id", "u-2")
            .body(())
            .unwrap();
        assert_eq!(extract(request).await.unwrap().display_name, "u-2");
    }

    #[tokio::test]
    async fn missing_identity_is_rejected() {
        let request = Request::builder().body(()).unwrap();
        assert!(matches!(
            extract(request).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
