//! Common media types.
use crate::media_type;

media_type!(ApplicationJson, "application", "json");
media_type!(ApplicationOctetStream, "application", "octet-stream");
media_type!(TextHtml, "text", "html");
media_type!(TextPlain, "text", "plain");
