use crate::models::Actor;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;

/// Header carrying the id of the acting user, set by the calling frontend.
pub const ACTOR_HEADER: &str = "x-user-id";

/// Acting user for audit fields.
///
/// Identity is trusted as sent; requests without the header act as
/// [`Actor::anonymous`].
#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = match parts.headers.get(ACTOR_HEADER) {
            Some(value) => {
                let id = value.to_str().map_err(|_| {
                    AppError::BadRequest(anyhow::anyhow!("{} header is not valid text", ACTOR_HEADER))
                })?;
                let id = id.trim();
                if id.is_empty() {
                    Actor::anonymous()
                } else {
                    Actor::new(id)
                }
            }
            None => Actor::anonymous(),
        };

        Ok(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<Actor, AppError> {
        let mut builder = Request::builder();
        if let Some(value) = header {
            builder = builder.header(ACTOR_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_actor_from_header() {
        let actor = extract(Some("  alice ")).await.unwrap();
        assert_eq!(actor.id(), "alice");
    }

    #[tokio::test]
    async fn missing_or_blank_header_acts_anonymously() {
        let anonymous = Actor::anonymous();
        assert_eq!(extract(None).await.unwrap().id(), anonymous.id());
        assert_eq!(extract(Some("   ")).await.unwrap().id(), anonymous.id());
    }

    #[tokio::test]
    async fn non_text_header_is_rejected() {
        let mut parts = Request::builder().body(()).unwrap().into_parts().0;
        parts.headers.insert(
            ACTOR_HEADER,
            axum::http::HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap(),
        );
        let err = Actor::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
