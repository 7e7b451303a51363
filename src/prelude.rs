pub use crate::app::Application;
pub use crate::config::Config;
pub use crate::content::mediatypes::*;
pub use crate::content::{Accept, MediaType};
pub use crate::header::{Headers, MutableHeaders};
pub use crate::manager::Manager;
pub use crate::media_type;
pub use crate::request::{Method, Request};
pub use crate::resource::Bin;
pub use crate::response::Response;
pub use crate::routing::{Mapper, PatternMapper, RouteOptions, Router, SimpleMapper};
pub use crate::url::{Query, Url};
pub use crate::view::{self, Args, View};
pub use crate::Error;
