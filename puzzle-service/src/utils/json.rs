use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use service_core::error::AppError;

pub const MAX_BODY_BYTES: usize = 1_048_576;

/// JSON body extractor that accepts exactly one value of `T` and explains
/// what is wrong with anything else as a 400.
///
/// Combine with `#[serde(deny_unknown_fields)]` on `T` to reject stray keys.
pub struct StrictJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for StrictJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|_| {
            AppError::BadRequest(format!("body must not be larger than {} bytes", MAX_BODY_BYTES))
        })?;

        decode(&bytes).map(StrictJson)
    }
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    if bytes.len() > MAX_BODY_BYTES {
        return Err(AppError::BadRequest(format!(
            "body must not be larger than {} bytes",
            MAX_BODY_BYTES
        )));
    }
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::BadRequest("body must not be empty".to_string()));
    }

    let mut de = serde_json::Deserializer::from_slice(bytes);
    let value = T::deserialize(&mut de).map_err(describe)?;
    de.end()
        .map_err(|_| AppError::BadRequest("body must only contain a single JSON value".to_string()))?;

    Ok(value)
}

fn describe(err: serde_json::Error) -> AppError {
    let message = match err.classify() {
        Category::Syntax => format!(
            "body contains badly-formed JSON (at line {}, column {})",
            err.line(),
            err.column()
        ),
        Category::Eof => "body contains badly-formed JSON".to_string(),
        Category::Data => format!("body contains incorrect JSON: {}", err),
        Category::Io => "body could not be read".to_string(),
    };
    AppError::BadRequest(message)
}
