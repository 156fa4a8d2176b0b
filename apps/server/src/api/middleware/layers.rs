//! Layer factories for middleware

use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
};

/// CORS middleware. No origins configured means no CORS headers.
pub fn cors(origins: &[String]) -> CorsLayer {
    let header_values: Vec<_> = origins
        .iter()
        .filter_map(|origin| match axum::http::HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if header_values.is_empty() {
        return CorsLayer::new();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(header_values))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn compression() -> CompressionLayer {
    CompressionLayer::new()
}
