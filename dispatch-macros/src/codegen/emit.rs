use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{ItemImpl, ItemStruct, LitStr};

use super::analyze::{ArgSpec, MethodSpec};
use super::parse::{ControllerArgs, RoleAttr};

pub fn controller_for_struct(item: &ItemStruct, args: &ControllerArgs) -> TokenStream {
    let ident = &item.ident;
    let route = match &args.route {
        Some(r) => quote! { ::core::option::Option::Some(#r) },
        None => quote! { ::core::option::Option::None },
    };
    let app_default = args.app_default;
    let interceptors = if args.interceptors.is_empty() {
        quote! {}
    } else {
        let list = &args.interceptors;
        quote! {
            fn interceptors() -> ::std::vec::Vec<mmg_dispatch::controller::InterceptorClass> {
                ::std::vec![ #( mmg_dispatch::controller::InterceptorClass::of::<#list>() ),* ]
            }
        }
    };
    quote! {
        #item
        impl mmg_dispatch::controller::ControllerType for #ident {
            fn route_variable() -> ::core::option::Option<&'static str> { #route }
            fn is_application_default() -> bool { #app_default }
            fn instantiate() -> mmg_dispatch::invoke::Instance {
                ::std::boxed::Box::new(<#ident as ::core::default::Default>::default())
            }
            #interceptors
        }
    }
}

pub fn interceptor_for_struct(item: &ItemStruct) -> TokenStream {
    let ident = &item.ident;
    quote! {
        #item
        impl mmg_dispatch::controller::InterceptorType for #ident {
            fn instantiate() -> mmg_dispatch::invoke::Instance {
                ::std::boxed::Box::new(<#ident as ::core::default::Default>::default())
            }
        }
    }
}

fn role_tokens(role: &RoleAttr) -> TokenStream {
    match role {
        RoleAttr::Action { name, verbs } => {
            let name = match name {
                Some(n) => quote! { ::core::option::Option::Some(::std::string::String::from(#n)) },
                None => quote! { ::core::option::Option::None },
            };
            quote! {
                mmg_dispatch::controller::Role::Action {
                    name: #name,
                    verbs: ::std::vec![ #( mmg_dispatch::Method::#verbs ),* ],
                }
            }
        }
        RoleAttr::VerbAction(v) => quote! { mmg_dispatch::controller::Role::VerbAction(mmg_dispatch::Method::#v) },
        RoleAttr::DefaultAction => quote! { mmg_dispatch::controller::Role::DefaultAction },
        RoleAttr::BeforeHook => quote! { mmg_dispatch::controller::Role::BeforeHook },
        RoleAttr::AfterHook => quote! { mmg_dispatch::controller::Role::AfterHook },
        RoleAttr::Init => quote! { mmg_dispatch::controller::Role::Init },
    }
}

/// `MethodMeta` expression with the invocation handle defined inline.
fn method_meta(self_ty: &syn::Type, m: &MethodSpec) -> TokenStream {
    let ident = &m.ident;
    let ident_str = LitStr::new(&ident.to_string(), ident.span());
    let mut takes = Vec::new();
    let mut call_args = Vec::new();
    let mut idx = 0usize;
    for a in &m.args {
        match a {
            ArgSpec::Ctx { mutable: true } => call_args.push(quote! { &mut *__ctx }),
            ArgSpec::Ctx { mutable: false } => call_args.push(quote! { &*__ctx }),
            ArgSpec::Param { ty, .. } => {
                let var = format_ident!("__a{}", idx);
                takes.push(quote! { let #var = __args.take::<#ty>(#idx)?; });
                call_args.push(quote! { #var });
                idx += 1;
            }
        }
    }
    let await_tok = if m.is_async { quote! { .await } } else { quote! {} };
    let roles = m.roles.iter().map(role_tokens);
    let params = m.params().map(|(name, ty)| {
        quote! { .param(mmg_dispatch::invoke::ParamSpec::of::<#ty>(#name)) }
    });
    quote! {
        mmg_dispatch::controller::MethodMeta::new(#ident_str, {
            #[allow(unused_mut, unused_variables)]
            fn __invoke<'a>(
                __target: &'a mut (dyn ::std::any::Any + ::core::marker::Send),
                __ctx: &'a mut mmg_dispatch::request::RequestContext,
                mut __args: mmg_dispatch::invoke::Args,
            ) -> mmg_dispatch::invoke::InvokeFuture<'a> {
                ::std::boxed::Box::pin(async move {
                    let __this = mmg_dispatch::invoke::__downcast::<#self_ty>(__target)?;
                    #( #takes )*
                    mmg_dispatch::invoke::IntoOutcome::into_outcome(__this.#ident( #( #call_args ),* ) #await_tok)
                })
            }
            __invoke
        })
        #( .role(#roles) )*
        #( #params )*
    }
}

/// `register`: submit the class for discovery (controllers only).
pub fn controller_for_impl(
    item: &ItemImpl,
    methods: &[MethodSpec],
    register: bool,
    errors: TokenStream,
) -> TokenStream {
    let self_ty = &item.self_ty;
    let metas = methods.iter().map(|m| method_meta(self_ty, m));
    let registration = if register {
        quote! {
            #[doc(hidden)]
            const _: () = {
                fn __class() -> mmg_dispatch::controller::ControllerClass {
                    mmg_dispatch::controller::ControllerClass::of::<#self_ty>()
                }
                mmg_dispatch::inventory::submit! { mmg_dispatch::controller::ControllerRegistration { class: __class } }
            };
        }
    } else {
        quote! {}
    };
    quote! {
        #item
        impl mmg_dispatch::controller::ControllerMethods for #self_ty {
            fn methods() -> ::std::vec::Vec<mmg_dispatch::controller::MethodMeta> {
                ::std::vec![ #( #metas ),* ]
            }
        }
        #registration
        #errors
    }
}
