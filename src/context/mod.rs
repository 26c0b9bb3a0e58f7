//! Per-request context handed to route handlers.

use std::collections::HashMap;

use crate::Request;

/// Named path segments captured by the matched route, e.g. `:countryCode`.
#[derive(Default, Debug, Clone)]
pub struct PathParams {
    map: HashMap<String, String>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.map.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The request being served plus whatever the router extracted from its path.
pub struct Context {
    request: Request,
    params: PathParams,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self::with_params(request, PathParams::new())
    }

    pub fn with_params(request: Request, params: PathParams) -> Self {
        Self { request, params }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Shorthand for [`Request::query_param`].
    pub fn query(&self, key: &str) -> Option<&str> {
        self.request.query_param(key)
    }

    /// Shorthand for [`Request::query_params`].
    pub fn query_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.request.query_params(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_path_and_query_values() {
        let raw = b"GET /api/holidays/last-celebrated/us?x=1&x=2 HTTP/1.1\r\nHost: a\r\n\r\n";
        let (request, _) = Request::parse(raw).unwrap();
        let mut params = PathParams::new();
        params.insert("countryCode".to_owned(), "us".to_owned());

        let ctx = Context::with_params(request, params);
        assert_eq!(ctx.params().get("countryCode"), Some("us"));
        assert_eq!(ctx.query("x"), Some("1"));
        assert_eq!(ctx.query_all("x").count(), 2);
        assert_eq!(ctx.request().path(), "/api/holidays/last-celebrated/us");
    }
}
