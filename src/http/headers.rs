//! Header fields of a request or response.

/// Ordered list of header fields with ASCII case-insensitive names.
///
/// Repeated names are kept as separate fields; [`get`](Headers::get) answers
/// with the first one. [`set`](Headers::set) replaces every earlier field of
/// the same name, which is what a response wants for `Connection` or
/// `Content-Type`.
///
/// ```
/// use holiday_lens::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Content-Type", "text/plain");
/// headers.set("content-type", "application/json");
///
/// assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
/// assert_eq!(headers.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Appends a field, keeping any existing ones with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Replaces all fields named `name` with a single one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.fields.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.fields.push((name, value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.iter()
            .find_map(|(n, v)| n.eq_ignore_ascii_case(name).then_some(v))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of fields, counting repeats.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.insert("Content-Length", "12");
        assert_eq!(headers.get("content-length"), Some("12"));
        assert!(headers.contains("CONTENT-LENGTH"));
        assert!(!headers.contains("content-type"));
    }

    #[test]
    fn insert_keeps_repeats_and_get_sees_the_first() {
        let mut headers = Headers::new();
        headers.insert("Accept", "application/json");
        headers.insert("accept", "text/plain");
        assert_eq!(headers.get("ACCEPT"), Some("application/json"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn set_replaces_every_earlier_field() {
        let mut headers = Headers::new();
        headers.insert("Connection", "keep-alive");
        headers.insert("connection", "upgrade");
        headers.insert("Host", "localhost");
        headers.set("Connection", "close");

        let fields: Vec<_> = headers.iter().collect();
        assert_eq!(fields, [("Host", "localhost"), ("Connection", "close")]);
    }
}
