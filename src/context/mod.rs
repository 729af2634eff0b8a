//! Per-request context handed to handlers and middleware.
//!
//! A [`Context`] owns the [`Request`], the path parameters bound by the router
//! for this request, and a type-keyed [`Extensions`] map that middleware can
//! use to pass values further down the chain. Nothing here outlives the
//! request it was created for.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use crate::Request;

/// Type-erased request extensions, keyed by type.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value`, returning the previous value of the same type.
    pub fn insert<T>(&mut self, value: T) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn remove<T>(&mut self) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }
}

/// Parameter and wildcard bindings captured while matching a route.
///
/// Always present on a [`Context`]: a request that bound nothing, including
/// one served by the not-found handler, sees an empty map.
///
/// # Examples
///
/// ```
/// use kami::context::Params;
///
/// let mut params = Params::new();
/// params.insert("uid", "alice");
/// assert_eq!(params.get("uid"), Some("alice"));
/// assert_eq!(params.get("pid"), None);
/// ```
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Params {
    map: HashMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.map.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Borrows the bindings as a plain map.
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.map
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Per-request state passed by value through the middleware chain to the handler.
pub struct Context {
    request: Request,
    params: Params,
    extensions: Extensions,
}

impl Context {
    /// Wraps a request with no bound parameters.
    pub fn new(request: Request) -> Self {
        Self::with_params(request, Params::new())
    }

    pub fn with_params(request: Request, params: Params) -> Self {
        Self {
            request,
            params,
            extensions: Extensions::new(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the bindings captured by the router for this request.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Shorthand for `ctx.params().get(name)`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Deserializes the request body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body_bytes())
    }

    /// Consumes the context, returning the request it wrapped.
    pub fn into_request(self) -> Request {
        self.request
    }
}
