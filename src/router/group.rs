use super::{RouteError, Router, path};
use crate::{Method, handler::IntoHandler};

/// A registrar that prepends a fixed prefix to every pattern.
///
/// Routes land in the parent [`Router`]'s table, so a grouped route is found
/// by the same lookup as any other and shares the router's middleware and
/// not-found handler. Groups nest: `router.group("/api")?.group("/v1")?`
/// registers under `/api/v1`.
pub struct Group<'r> {
    router: &'r mut Router,
    prefix: String,
}

impl<'r> Group<'r> {
    pub(super) fn new(router: &'r mut Router, prefix: &str) -> Result<Self, RouteError> {
        let prefix = normalize_prefix(prefix)?;
        Ok(Self { router, prefix })
    }

    /// The prefix routes in this group are registered under, without a
    /// trailing slash. The root group's prefix is empty.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registers `handler` for `method` on `prefix + path`.
    ///
    /// # Errors
    ///
    /// See [`Router::add`]. Errors name the full, prefixed pattern.
    pub fn add(&mut self, method: Method, path: &str, handler: impl IntoHandler) -> Result<(), RouteError> {
        let full = join(&self.prefix, path);
        self.router.add(method, &full, handler)
    }

    method_routes! {
        get => Get,
        post => Post,
        put => Put,
        patch => Patch,
        delete => Delete,
        head => Head,
        options => Options,
        connect => Connect,
        trace => Trace,
    }

    /// Opens a nested group under `self.prefix() + prefix`.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPrefix`] under the same rules as [`Router::group`].
    pub fn group(&mut self, prefix: &str) -> Result<Group<'_>, RouteError> {
        let nested = normalize_prefix(prefix)?;
        Ok(Group {
            prefix: format!("{}{nested}", self.prefix),
            router: &mut *self.router,
        })
    }
}

fn normalize_prefix(prefix: &str) -> Result<String, RouteError> {
    let invalid = |reason| RouteError::InvalidPrefix {
        prefix: prefix.to_owned(),
        reason,
    };

    if prefix.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if !prefix.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    let trimmed = prefix.trim_end_matches('/');
    let last_is_wildcard = path::split(trimmed)
        .last()
        .is_some_and(|seg| seg.starts_with(path::WILDCARD_MARKER));
    if trimmed.ends_with(path::WILDCARD_MARKER) || last_is_wildcard {
        return Err(invalid("must not end in a wildcard"));
    }
    Ok(trimmed.to_owned())
}

fn join(prefix: &str, path: &str) -> String {
    format!("{prefix}/{}", path.trim_start_matches('/'))
}
