//! Maps request paths to async handlers.
//!
//! | Pattern                                  | Example match                             | Captured params      |
//! |------------------------------------------|-------------------------------------------|----------------------|
//! | `/api/holidays/shared`                   | `/api/holidays/shared`                    | *(none)*             |
//! | `/api/holidays/last-celebrated/:country` | `/api/holidays/last-celebrated/DE`        | `country → "DE"`     |
//!
//! Trailing slashes are normalized on both patterns and incoming paths, so `/health/` and
//! `/health` are treated as equivalent.
//!
//! Routes are matched in registration order; the first route whose method and pattern both
//! match the incoming request wins. A path that matches only under another method yields
//! `405 Method Not Allowed`; anything else goes to the fallback handler.

use std::borrow::Cow;
use std::pin::Pin;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::info;

use crate::context::{Context, PathParams};
use crate::{Method, Request, Response, StatusCode};

/// Type-erased, heap-allocated async handler that processes a [`Context`] and returns a
/// [`Response`].
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = Response> + Send` that is also
/// `Send + Sync + 'static` implements this trait automatically via the blanket impl
/// below.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(ctx))
    }
}

fn erase(handler: impl IntoHandler) -> Handler {
    Arc::new(move |ctx| handler.call(ctx))
}

// A single path segment, either a literal string or a named capture (`:name`).
#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Parameter(String),
}

// Compiled representation of a route pattern string.
#[derive(Debug, Clone)]
enum Pattern {
    Exact(String),
    Parameterized { segments: Vec<Segment> },
}

fn trim_trailing_slash(path: &str) -> &str {
    if path != "/" && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    }
}

// Captured values are percent-decoded like query values; a segment that does
// not decode to UTF-8 is passed through untouched.
fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| segment.to_owned())
}

impl Pattern {
    // Patterns containing `:` capture; everything else must match literally.
    fn parse(pattern: &str) -> Self {
        let pattern = trim_trailing_slash(pattern);

        if pattern.contains(':') {
            let segments = pattern
                .split('/')
                .filter(|s| !s.is_empty())
                .map(|s| match s.strip_prefix(':') {
                    Some(name) => Segment::Parameter(name.to_owned()),
                    None => Segment::Static(s.to_owned()),
                })
                .collect();
            return Pattern::Parameterized { segments };
        }

        Pattern::Exact(pattern.to_owned())
    }

    fn matches(&self, path: &str) -> Option<PathParams> {
        let path = trim_trailing_slash(path);

        match self {
            Pattern::Exact(p) => (p == path).then(PathParams::new),
            Pattern::Parameterized { segments } => {
                let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
                if segments.len() != path_segments.len() {
                    return None;
                }

                let mut params = PathParams::new();
                for (seg, path_seg) in segments.iter().zip(path_segments) {
                    match seg {
                        Segment::Static(s) if s != path_seg => return None,
                        Segment::Static(_) => {}
                        Segment::Parameter(name) => params.insert(name.clone(), decode_segment(path_seg)),
                    }
                }
                Some(params)
            }
        }
    }
}

struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
}

/// HTTP request router that dispatches requests to registered handler functions.
///
/// # Examples
///
/// ```rust,no_run
/// use holiday_lens::context::Context;
/// use holiday_lens::{Router, Response, StatusCode};
///
/// let mut router = Router::new();
///
/// router.get("/api/holidays/health", |_ctx| async {
///     Response::new(StatusCode::Ok).body("Holiday API is running")
/// });
///
/// router.get("/api/holidays/last-celebrated/:countryCode", |ctx: Context| async move {
///     let code = ctx.params().get("countryCode").unwrap_or_default().to_owned();
///     Response::new(StatusCode::Ok).body(code)
/// });
/// ```
pub struct Router {
    routes: Vec<Route>,
    fallback: Handler,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create a new, empty `Router` whose fallback answers `404 Not Found`.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            fallback: erase(|_ctx: Context| async { Response::new(StatusCode::NotFound) }),
        }
    }

    /// Register a handler for `GET` requests matching `path`.
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) {
        self.routes.push(Route {
            method: Method::Get,
            pattern: Pattern::parse(path),
            handler: erase(handler),
        });
    }

    /// Replace the handler used when no route matches the request path.
    pub fn fallback(&mut self, handler: impl IntoHandler) {
        self.fallback = erase(handler);
    }

    /// Return the number of routes registered in this router.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Return `true` if no routes have been registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Dispatch `request` to the first matching route and return its response.
    ///
    /// Emits one `info` line per request with method, path, status, and elapsed time.
    pub async fn route(&self, request: Request) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.path().to_owned();

        let response = self.dispatch(request).await;

        info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed = ?start.elapsed(),
            "request served"
        );
        response
    }

    async fn dispatch(&self, request: Request) -> Response {
        let mut path_known = false;

        for route in &self.routes {
            let Some(params) = route.pattern.matches(request.path()) else {
                continue;
            };
            if &route.method == request.method() {
                let ctx = Context::with_params(request, params);
                return (route.handler)(ctx).await;
            }
            path_known = true;
        }

        if path_known {
            return Response::new(StatusCode::MethodNotAllowed).header("Allow", "GET");
        }
        (self.fallback)(Context::new(request)).await
    }
}
