use bukukami_shared::http::{HttpRequest, Method};
use url::Origin;

/// Caching policy a request is handled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// GET to the story service: network-first, cache-fallback.
    ApiRead,
    /// Any other method to the story service: never cached.
    ApiPassthrough,
    /// Everything else: cache-first, network-fallback.
    Static,
}

pub fn classify(request: &HttpRequest, api_origin: &Origin) -> RouteClass {
    if &request.url.origin() != api_origin {
        return RouteClass::Static;
    }
    match request.method {
        Method::Get => RouteClass::ApiRead,
        _ => RouteClass::ApiPassthrough,
    }
}
