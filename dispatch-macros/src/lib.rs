use proc_macro::TokenStream;

mod codegen;

/// Declares a controller.
///
/// On a struct it records the route variable, the application-default flag and
/// the interceptors wrapping every action: `#[controller]`, `#[controller("index")]`,
/// `#[controller(route = "index", default, interceptors(Audit, Auth))]`.
/// The struct must implement `Default`; that is how instances are created.
///
/// On an impl block it collects the methods tagged with the role attributes below,
/// generates one invocation handle per method and registers the class for discovery.
#[proc_macro_attribute]
pub fn controller(args: TokenStream, input: TokenStream) -> TokenStream {
    codegen::entrypoint(codegen::Kind::Controller, args, input)
}

/// Declares an interceptor: `#[interceptor]` on a `Default` struct and on its impl
/// block, whose `#[before_action]` / `#[after_action]` methods then wrap the
/// actions of every controller listing it in `interceptors(...)`. Not discovered
/// on its own.
#[proc_macro_attribute]
pub fn interceptor(args: TokenStream, input: TokenStream) -> TokenStream {
    codegen::entrypoint(codegen::Kind::Interceptor, args, input)
}

// Role markers: the method is left as is; the `#[controller]` impl expansion reads them.

/// `#[action]`, `#[action("name")]`, `#[action(name = "n", verbs(GET, TRACE))]`.
#[proc_macro_attribute]
pub fn action(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}

/// `#[verb_action(TRACE)]`: unnamed action answering exactly that verb.
#[proc_macro_attribute]
pub fn verb_action(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}

#[proc_macro_attribute]
pub fn default_action(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}

/// Runs before the action; returning a view skips the action.
#[proc_macro_attribute]
pub fn before_action(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}

/// Runs after the action; returning a view replaces the result.
#[proc_macro_attribute]
pub fn after_action(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}

/// Called once on each fresh instance, before any hook.
#[proc_macro_attribute]
pub fn init(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}
