use bytes::Bytes;
use hyper::{Method, Uri, header::CONTENT_TYPE, http::request::Parts};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;

/// Wrapper type for route parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams(HashMap<String, String>);

impl RouteParams {
    /// Returns a parameter by key as `Option<&str>`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns `true` if the specified key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<matchit::Params<'_, '_>> for RouteParams {
    fn from(params: matchit::Params<'_, '_>) -> Self {
        params.iter().map(|(k, v)| (k, decode_path(v))).collect()
    }
}

/// Percent-decodes a path or path segment. `+` stays as is; invalid UTF-8
/// is replaced.
pub(crate) fn decode_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Decoded form fields, in the order they were read.
///
/// Lookups return the first value for a key, so fields from the request body
/// shadow query parameters with the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues(Vec<(String, String)>);

impl FormValues {
    /// Parses the url-encoded body (when the method and content type allow it)
    /// followed by the query string.
    pub(crate) fn parse(parts: &Parts, body: &Bytes) -> Self {
        let mut pairs = Vec::new();

        if carries_form_body(parts) {
            pairs.extend(form_urlencoded::parse(body).into_owned());
        }

        if let Some(query) = parts.uri.query() {
            pairs.extend(form_urlencoded::parse(query.as_bytes()).into_owned());
        }

        Self(pairs)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value bound to `key`.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn carries_form_body(parts: &Parts) -> bool {
    if !matches!(parts.method, Method::POST | Method::PUT | Method::PATCH) {
        return false;
    }

    parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| {
            mime.trim()
                .eq_ignore_ascii_case("application/x-www-form-urlencoded")
        })
}

/// Looks a key up in the query string of `uri`.
pub(crate) fn query_value(uri: &Uri, key: &str) -> Option<String> {
    form_urlencoded::parse(uri.query()?.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Request;

    fn parts(method: Method, uri: &str, content_type: Option<&str>) -> Parts {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn body_fields_shadow_query_fields() {
        let parts = parts(
            Method::POST,
            "/submit?name=query&page=2",
            Some("application/x-www-form-urlencoded; charset=utf-8"),
        );
        let form = FormValues::parse(&parts, &Bytes::from_static(b"name=body&tag=a&tag=b"));

        assert_eq!(form.get("name"), Some("body"));
        assert_eq!(form.get("page"), Some("2"));
        assert_eq!(form.get_all("tag").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(form.get_all("name").count(), 2);
    }

    #[test]
    fn body_ignored_without_form_content_type() {
        let parts = parts(Method::POST, "/submit", Some("application/json"));
        let form = FormValues::parse(&parts, &Bytes::from_static(b"name=body"));

        assert!(form.is_empty());
    }

    #[test]
    fn body_ignored_for_get() {
        let parts = parts(
            Method::GET,
            "/submit?x=1",
            Some("application/x-www-form-urlencoded"),
        );
        let form = FormValues::parse(&parts, &Bytes::from_static(b"name=body"));

        assert_eq!(form.get("name"), None);
        assert_eq!(form.get("x"), Some("1"));
    }

    #[test]
    fn query_values_are_percent_decoded() {
        let uri: Uri = "/search?q=hello%20world&lang=en+US".parse().unwrap();

        assert_eq!(query_value(&uri, "q").as_deref(), Some("hello world"));
        assert_eq!(query_value(&uri, "lang").as_deref(), Some("en US"));
        assert_eq!(query_value(&uri, "missing"), None);
    }

    #[test]
    fn path_decoding_keeps_plus() {
        assert_eq!(decode_path("ada%20lovelace"), "ada lovelace");
        assert_eq!(decode_path("a+b%2Fc"), "a+b/c");
        assert_eq!(decode_path("plain"), "plain");
    }

    #[test]
    fn route_params_lookup() {
        let params: RouteParams = [("id", "42")].into_iter().collect();

        assert_eq!(params.get("id"), Some("42"));
        assert!(params.contains("id"));
        assert_eq!(params.get("name"), None);
        assert_eq!(params.len(), 1);
    }
}
