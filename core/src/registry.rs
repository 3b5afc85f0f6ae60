//! Name-keyed store of materialized requests and their decoding types.
//!
//! Each entry pairs a request with the decoder for the type it was
//! registered with, so the two can never disagree. Once built into a client
//! the registry is only ever read.

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;

use crate::decode::{decode_fn, DecodeFn};
use crate::http::HttpRequest;

pub(crate) struct Registration {
    pub(crate) request: HttpRequest,
    pub(crate) decode: DecodeFn,
    pub(crate) type_name: &'static str,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("request", &self.request)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    entries: HashMap<String, Registration>,
}

impl Registry {
    /// Store `request` under `name`, decoding responses as `T`. Replaces any
    /// earlier registration with the same name.
    pub(crate) fn insert<T>(&mut self, name: String, request: HttpRequest) -> Option<Registration>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.entries.insert(
            name,
            Registration {
                request,
                decode: decode_fn::<T>(),
                type_name: type_name::<T>(),
            },
        )
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Registration> {
        self.entries.get(name)
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
