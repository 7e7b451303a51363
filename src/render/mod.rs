//! Renderers turn the values views return into responses.
//!
//! # Example
//! ```
//! use jbweb::prelude::*;
//! use jbweb::render::{self, UTF8};
//!
//! let view = render::bind(UTF8, |_: &Request, _: Args| -> Result<String, Error> {
//!     Ok("שלום".to_string())
//! });
//! let response = view.respond(&Request::new(Url::from_path("/")), Args::new()).unwrap();
//! assert_eq!(response.content, "שלום".as_bytes().to_vec());
//! ```
use std::marker::PhantomData;

use thiserror::Error;

use crate::request::Request;
use crate::response::Response;
use crate::view::{Args, View};
use crate::Error;

#[cfg(feature = "json")]
pub mod json;

#[cfg(feature = "json")]
pub use json::{Json, SimpleJson};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{character:?} at byte {position} cannot be encoded as {encoding}")]
    Encode {
        encoding: Encoding,
        character: char,
        position: usize,
    },
    #[cfg(feature = "json")]
    #[error("cannot serialize to JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Converts a view's value into a response.
///
/// The error hooks are optional: when a hook returns a response, it
/// replaces the failure; otherwise the error is returned to the caller.
pub trait Renderer<T>: Send + Sync {
    fn render(&self, request: &Request, value: &T) -> Result<Response, Error>;

    /// Called when the view itself fails.
    fn view_error(&self, _request: &Request, _error: &Error) -> Option<Response> {
        None
    }

    /// Called when rendering the view's value fails.
    fn render_error(&self, _request: &Request, _value: &T, _error: &Error) -> Option<Response> {
        None
    }
}

/// A view whose value is passed through a renderer.
pub struct Rendered<R, F, T> {
    renderer: R,
    view: F,
    // fn() -> T keeps Rendered Send + Sync whatever T is.
    phantom: PhantomData<fn() -> T>,
}

impl<R, F, T> Rendered<R, F, T>
where
    R: Renderer<T>,
    F: Fn(&Request, Args) -> Result<T, Error> + Send + Sync,
{
    pub fn new(renderer: R, view: F) -> Self {
        Self {
            renderer,
            view,
            phantom: PhantomData,
        }
    }
}

impl<R, F, T> View for Rendered<R, F, T>
where
    R: Renderer<T>,
    F: Fn(&Request, Args) -> Result<T, Error> + Send + Sync,
{
    fn respond(&self, request: &Request, args: Args) -> Result<Response, Error> {
        let value = match (self.view)(request, args) {
            Ok(value) => value,
            Err(error) => {
                return match self.renderer.view_error(request, &error) {
                    Some(response) => Ok(response),
                    None => Err(error),
                }
            }
        };
        match self.renderer.render(request, &value) {
            Ok(response) => Ok(response),
            Err(error) => match self.renderer.render_error(request, &value, &error) {
                Some(response) => Ok(response),
                None => Err(error),
            },
        }
    }
}

/// Bind a renderer to a view.
pub fn bind<T, R, F>(renderer: R, view: F) -> Rendered<R, F, T>
where
    R: Renderer<T>,
    F: Fn(&Request, Args) -> Result<T, Error> + Send + Sync,
{
    Rendered::new(renderer, view)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Ascii,
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Utf8 => f.write_str("utf-8"),
            Self::Ascii => f.write_str("ascii"),
        }
    }
}

/// What to do with characters the encoding cannot represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errors {
    Strict,
    Ignore,
}

/// Renders text in the given encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unicode {
    pub encoding: Encoding,
    pub errors: Errors,
}

pub const UTF8: Unicode = Unicode {
    encoding: Encoding::Utf8,
    errors: Errors::Strict,
};

impl Unicode {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            errors: Errors::Strict,
        }
    }

    pub fn ignoring_errors(mut self) -> Self {
        self.errors = Errors::Ignore;
        self
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u8>, RenderError> {
        match self.encoding {
            Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
            Encoding::Ascii => {
                let mut bytes = Vec::with_capacity(text.len());
                for (position, character) in text.char_indices() {
                    if character.is_ascii() {
                        bytes.push(character as u8);
                    } else if self.errors == Errors::Strict {
                        return Err(RenderError::Encode {
                            encoding: self.encoding,
                            character,
                            position,
                        });
                    }
                }
                Ok(bytes)
            }
        }
    }
}

impl<T: AsRef<str>> Renderer<T> for Unicode {
    fn render(&self, _: &Request, value: &T) -> Result<Response, Error> {
        Ok(Response::new(self.encode(value.as_ref())?))
    }
}
