//! Cache Key Module
//!
//! Derives deterministic cache keys from the shape of a request.

use url::form_urlencoded;

/// Namespace used when a route does not supply one.
pub const DEFAULT_NAMESPACE: &str = "api";

// == Key Request ==
/// Everything about a request that influences its cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRequest {
    pub method: String,
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    /// Route parameters captured by the router
    pub params: Vec<(String, String)>,
    /// Authenticated caller, if any
    pub caller: Option<String>,
    pub namespace: Option<String>,
}

impl KeyRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    // == Derive ==
    /// Builds the cache key.
    ///
    /// Layout: `{namespace}:{METHOD}:{path}[?{query}][:params:{params}][:user:{caller}]`.
    /// Query pairs and params are sorted by name and form-encoded, so the
    /// order a client sends them in does not matter.
    pub fn derive(&self) -> String {
        let namespace = self
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE);

        let mut key = format!(
            "{}:{}:{}",
            namespace,
            self.method.to_ascii_uppercase(),
            self.path
        );

        if let Some(query) = self.query.as_deref() {
            let query = canonical_query(query);
            if !query.is_empty() {
                key.push('?');
                key.push_str(&query);
            }
        }

        if !self.params.is_empty() {
            key.push_str(":params:");
            key.push_str(&encode_sorted(self.params.clone()));
        }

        if let Some(caller) = self.caller.as_deref() {
            key.push(':');
            key.push_str(&caller_segment(caller));
        }

        key
    }
}

/// Segment appended to keys of requests made by `caller`.
///
/// Also used to build `user:<id>` invalidation patterns.
pub fn caller_segment(caller: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(caller.as_bytes()).collect();
    format!("user:{encoded}")
}

/// Re-encodes a query string with pairs sorted by name.
///
/// The sort is stable, so repeated names keep their relative order.
pub fn canonical_query(raw: &str) -> String {
    let pairs: Vec<(String, String)> = form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect();
    encode_sorted(pairs)
}

fn encode_sorted(mut pairs: Vec<(String, String)>) -> String {
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
