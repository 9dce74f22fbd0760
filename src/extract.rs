use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// JSON body that never rejects on shape: an empty, malformed or non-object
/// body yields `T::default()`, and the handler's own validation reports what
/// is missing.
#[derive(Debug, Clone, Default)]
pub struct Payload<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(format!("요청 본문을 읽을 수 없습니다. ({})", e.body_text())))?;

        Ok(Payload(parse_lenient(&bytes)))
    }
}

pub fn parse_lenient<T: DeserializeOwned + Default>(bytes: &[u8]) -> T {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return T::default();
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(e) => {
            debug!("Ignoring unparsable request body: {}", e);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Body {
        name: Option<String>,
    }

    #[test]
    fn test_lenient_parsing() {
        assert_eq!(parse_lenient::<Body>(r#"{"name":"합격"}"#.as_bytes()).name.as_deref(), Some("합격"));
        assert_eq!(parse_lenient::<Body>(b""), Body::default());
        assert_eq!(parse_lenient::<Body>(b"  \n"), Body::default());
        assert_eq!(parse_lenient::<Body>(b"{not json"), Body::default());
        assert_eq!(parse_lenient::<Body>(b"[1,2]"), Body::default());
    }
}
