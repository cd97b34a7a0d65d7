pub mod app;
pub mod config;
pub mod controller;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod invoke;
pub mod registry;
pub mod request;
pub mod view;

// lets macro expansions inside this crate refer to `mmg_dispatch::...`
extern crate self as mmg_dispatch;

pub mod prelude {
    pub use crate::app::App;
    pub use crate::dispatcher::Dispatcher;
    pub use crate::error::{DispatchError, Result};
    pub use crate::request::{Request, RequestContext};
    pub use crate::view::View;
    pub use http::Method;
}

pub use dispatch_macros::*;
pub use http::Method;

#[doc(hidden)]
pub use inventory;
