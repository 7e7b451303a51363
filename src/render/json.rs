//! JSON renderers for types implementing [`serde::Serialize`].
use crate::content::mediatypes::ApplicationJson;
use crate::content::{MediaType, Range};
use crate::render::{RenderError, Renderer};
use crate::request::Request;
use crate::response::Response;
use crate::Error;

/// Renders JSON with `Content-Type: application/json`.
///
/// Clients whose most preferred media type is exactly `application/json`
/// get compact output. Everyone else (browsers, `curl`, no Accept header)
/// gets it indented by two spaces, with object keys sorted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Json {
    fn wants_compact(request: &Request) -> Result<bool, Error> {
        let preferred = request.accept()?.preferred();
        Ok(preferred.media_type == Range::exact(&ApplicationJson::mime_type())
            && preferred.subtype == Range::exact(&ApplicationJson::mime_subtype()))
    }
}

impl<T: serde::Serialize> Renderer<T> for Json {
    fn render(&self, request: &Request, value: &T) -> Result<Response, Error> {
        let content = if Self::wants_compact(request)? {
            serde_json::to_vec(value).map_err(RenderError::from)?
        } else {
            // Objects in a Value are ordered by key.
            let value = serde_json::to_value(value).map_err(RenderError::from)?;
            serde_json::to_vec_pretty(&value).map_err(RenderError::from)?
        };
        Ok(Response::new(content).with_header("Content-Type", &ApplicationJson::media_type()))
    }
}

/// Renders compact JSON, without setting a content type.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleJson;

impl<T: serde::Serialize> Renderer<T> for SimpleJson {
    fn render(&self, _: &Request, value: &T) -> Result<Response, Error> {
        Ok(Response::new(
            serde_json::to_vec(value).map_err(RenderError::from)?,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::url::Url;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Entry {
        title: &'static str,
        id: u32,
    }

    fn request(accept: Option<&str>) -> Request {
        let request = Request::new(Url::from_path("/"));
        match accept {
            Some(accept) => request.with_header("Accept", accept),
            None => request,
        }
    }

    fn content_type(response: &Response) -> Option<&str> {
        response.headers.get_first("content-type")
    }

    #[test]
    fn test_pretty_for_humans() {
        let content = vec!["a", "b", "c"];
        for accept in [Some("*/*"), None, Some("text/html, application/json;q=0.9")].iter() {
            let response = Json.render(&request(*accept), &content).unwrap();
            assert_eq!(response, Response::new("[\n  \"a\",\n  \"b\",\n  \"c\"\n]"));
            assert_eq!(content_type(&response), Some("application/json"));
        }
    }

    #[test]
    fn test_compact_for_machines() {
        let content = vec!["a", "b", "c"];
        let response = Json.render(&request(Some("application/json")), &content).unwrap();
        assert_eq!(response, Response::new("[\"a\",\"b\",\"c\"]"));
        assert_eq!(content_type(&response), Some("application/json"));
    }

    #[test]
    fn test_sorted_keys() {
        let entry = Entry { title: "hi", id: 1 };
        let response = Json.render(&request(None), &entry).unwrap();
        assert_eq!(response, Response::new("{\n  \"id\": 1,\n  \"title\": \"hi\"\n}"));

        let response = Json.render(&request(Some("application/json")), &entry).unwrap();
        assert_eq!(response, Response::new("{\"title\":\"hi\",\"id\":1}"));
    }

    #[test]
    fn test_invalid_accept() {
        assert!(Json.render(&request(Some("application/json;q=2")), &1).is_err());
    }

    #[test]
    fn test_simple_json() {
        let entry = Entry { title: "hi", id: 1 };
        let response = SimpleJson.render(&request(None), &entry).unwrap();
        assert_eq!(response, Response::new("{\"title\":\"hi\",\"id\":1}"));
        assert!(response.headers.is_empty());
    }
}
