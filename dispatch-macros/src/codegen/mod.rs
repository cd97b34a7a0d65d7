mod analyze;
mod emit;
mod msgs;
mod parse;

use proc_macro::TokenStream;
use syn::{parse_macro_input, Item};

use analyze::collect_methods;
use emit::{controller_for_impl, controller_for_struct, interceptor_for_struct};
use msgs::{
    ERR_CONTROLLER_ARG, ERR_CONTROLLER_GENERIC, ERR_CONTROLLER_TARGET, ERR_CONTROLLER_TRAIT_IMPL,
    ERR_INTERCEPTOR_ARG,
};
use parse::parse_controller_args;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Controller,
    /// Same method handling, no route arguments and no discovery.
    Interceptor,
}

pub fn entrypoint(kind: Kind, args: TokenStream, input: TokenStream) -> TokenStream {
    let args_ts = proc_macro2::TokenStream::from(args);
    let item_any = parse_macro_input!(input as Item);
    match item_any {
        Item::Struct(item) => {
            if !item.generics.params.is_empty() {
                return syn::Error::new_spanned(&item.generics, ERR_CONTROLLER_GENERIC)
                    .to_compile_error()
                    .into();
            }
            if kind == Kind::Interceptor {
                if !args_ts.is_empty() {
                    let err = syn::Error::new_spanned(args_ts, ERR_INTERCEPTOR_ARG).to_compile_error();
                    return quote::quote! { #item #err }.into();
                }
                return interceptor_for_struct(&item).into();
            }
            match parse_controller_args(args_ts) {
                Ok(args) => controller_for_struct(&item, &args).into(),
                Err(e) => {
                    let err = e.to_compile_error();
                    quote::quote! { #item #err }.into()
                }
            }
        }
        Item::Impl(item) => {
            if !args_ts.is_empty() {
                let msg = match kind {
                    Kind::Controller => ERR_CONTROLLER_ARG,
                    Kind::Interceptor => ERR_INTERCEPTOR_ARG,
                };
                return syn::Error::new_spanned(args_ts, msg).to_compile_error().into();
            }
            if let Some((_, path, _)) = &item.trait_ {
                return syn::Error::new_spanned(path, ERR_CONTROLLER_TRAIT_IMPL)
                    .to_compile_error()
                    .into();
            }
            if !item.generics.params.is_empty() {
                return syn::Error::new_spanned(&item.generics, ERR_CONTROLLER_GENERIC)
                    .to_compile_error()
                    .into();
            }
            let (methods, errs) = collect_methods(&item);
            let mut compile_errors = proc_macro2::TokenStream::new();
            for e in errs {
                compile_errors.extend(e.to_compile_error());
            }
            controller_for_impl(&item, &methods, kind == Kind::Controller, compile_errors).into()
        }
        other => syn::Error::new_spanned(other, ERR_CONTROLLER_TARGET)
            .to_compile_error()
            .into(),
    }
}
