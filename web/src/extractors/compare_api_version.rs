use crate::extractors::RejectionType;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use semver::Version;
use service::config::ApiVersion;

/// Asserts that the request carries an `x-version` header matching the API
/// version this server exposes. Keeps old clients from silently talking to
/// an incompatible endpoint set.
pub(crate) struct CompareApiVersion(pub Version);

#[async_trait]
impl<S> FromRequestParts<S> for CompareApiVersion
where
    S: Send + Sync,
{
    type Rejection = RejectionType;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(ApiVersion::field_name())
            .and_then(|value| value.to_str().ok())
            .ok_or((
                StatusCode::BAD_REQUEST,
                format!("Missing {} header", ApiVersion::field_name()),
            ))?;

        let requested = Version::parse(header_value).map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                format!("Invalid {} header", ApiVersion::field_name()),
            )
        })?;

        let supported = ApiVersion::new(ApiVersion::default_version()).version;

        if requested != supported {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Unsupported API version {requested}; supported: {supported}"),
            ));
        }

        Ok(CompareApiVersion(requested))
    }
}
