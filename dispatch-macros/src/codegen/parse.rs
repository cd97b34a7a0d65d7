use syn::{
    ext::IdentExt,
    parse::{ParseStream, Parser},
    punctuated::Punctuated,
    Attribute, Ident, LitStr, Path, Token,
};

use super::msgs::{
    ERR_ACTION_ARG, ERR_ACTION_NAME_DUP, ERR_CONTROLLER_ARG, ERR_CONTROLLER_ROUTE_DUP, ERR_NO_ARGS,
    ERR_UNKNOWN_VERB, ERR_VERB_ACTION_ARG,
};

const VERBS: &[&str] = &[
    "GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "CONNECT", "PATCH", "TRACE",
];

#[derive(Default)]
pub struct ControllerArgs {
    pub route: Option<LitStr>,
    pub app_default: bool,
    pub interceptors: Vec<Path>,
}

pub fn parse_controller_args(args: proc_macro2::TokenStream) -> syn::Result<ControllerArgs> {
    let parser = |input: ParseStream| {
        let mut out = ControllerArgs::default();
        while !input.is_empty() {
            let route = if input.peek(LitStr) {
                Some(input.parse::<LitStr>()?)
            } else {
                let key: Ident = input.call(Ident::parse_any)?;
                if key == "route" {
                    input.parse::<Token![=]>()?;
                    Some(input.parse::<LitStr>()?)
                } else if key == "default" {
                    out.app_default = true;
                    None
                } else if key == "interceptors" {
                    let content;
                    syn::parenthesized!(content in input);
                    out.interceptors
                        .extend(Punctuated::<Path, Token![,]>::parse_terminated(&content)?);
                    None
                } else {
                    return Err(syn::Error::new_spanned(key, ERR_CONTROLLER_ARG));
                }
            };
            if let Some(r) = route {
                if out.route.is_some() {
                    return Err(syn::Error::new_spanned(r, ERR_CONTROLLER_ROUTE_DUP));
                }
                out.route = Some(r);
            }
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(out)
    };
    parser.parse2(args)
}

/// Role attribute as written on a method, verbs still unresolved.
pub enum RoleAttr {
    Action { name: Option<LitStr>, verbs: Vec<Ident> },
    VerbAction(Ident),
    DefaultAction,
    BeforeHook,
    AfterHook,
    Init,
}

fn last_ident(a: &Attribute) -> String {
    a.path()
        .segments
        .last()
        .map(|s| s.ident.to_string())
        .unwrap_or_default()
}

/// `None` when `a` is not one of the role markers.
pub fn parse_role_attr(a: &Attribute) -> Option<syn::Result<RoleAttr>> {
    let role = match last_ident(a).as_str() {
        "action" => parse_action_attr(a),
        "verb_action" => a
            .parse_args_with(Punctuated::<Ident, Token![,]>::parse_terminated)
            .map_err(|e| syn::Error::new(e.span(), ERR_VERB_ACTION_ARG))
            .and_then(|list| {
                if list.len() != 1 {
                    return Err(syn::Error::new_spanned(a, ERR_VERB_ACTION_ARG));
                }
                let verb = list.into_iter().next().ok_or_else(|| syn::Error::new_spanned(a, ERR_VERB_ACTION_ARG))?;
                check_verb(&verb)?;
                Ok(RoleAttr::VerbAction(verb))
            }),
        "default_action" => path_only(a).map(|_| RoleAttr::DefaultAction),
        "before_action" => path_only(a).map(|_| RoleAttr::BeforeHook),
        "after_action" => path_only(a).map(|_| RoleAttr::AfterHook),
        "init" => path_only(a).map(|_| RoleAttr::Init),
        _ => return None,
    };
    Some(role)
}

fn path_only(a: &Attribute) -> syn::Result<()> {
    a.meta
        .require_path_only()
        .map(|_| ())
        .map_err(|_| syn::Error::new_spanned(a, ERR_NO_ARGS))
}

fn parse_action_attr(a: &Attribute) -> syn::Result<RoleAttr> {
    let mut name: Option<LitStr> = None;
    let mut verbs = Vec::new();
    if let syn::Meta::Path(_) = a.meta {
        return Ok(RoleAttr::Action { name, verbs });
    }
    a.parse_args_with(|input: ParseStream| {
        while !input.is_empty() {
            if input.peek(LitStr) {
                let lit: LitStr = input.parse()?;
                if name.replace(lit.clone()).is_some() {
                    return Err(syn::Error::new_spanned(lit, ERR_ACTION_NAME_DUP));
                }
            } else {
                let key: Ident = input.call(Ident::parse_any)?;
                if key == "name" {
                    input.parse::<Token![=]>()?;
                    let lit: LitStr = input.parse()?;
                    if name.replace(lit.clone()).is_some() {
                        return Err(syn::Error::new_spanned(lit, ERR_ACTION_NAME_DUP));
                    }
                } else if key == "verbs" {
                    let content;
                    syn::parenthesized!(content in input);
                    for v in Punctuated::<Ident, Token![,]>::parse_terminated(&content)? {
                        check_verb(&v)?;
                        verbs.push(v);
                    }
                } else {
                    return Err(syn::Error::new_spanned(key, ERR_ACTION_ARG));
                }
            }
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(())
    })?;
    Ok(RoleAttr::Action { name, verbs })
}

fn check_verb(v: &Ident) -> syn::Result<()> {
    if VERBS.contains(&v.to_string().as_str()) {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(v, ERR_UNKNOWN_VERB))
    }
}

/// `Some(is_mut)` for `&RequestContext` / `&mut RequestContext`.
#[inline]
pub fn ctx_ref_mutability(ty: &syn::Type) -> Option<bool> {
    if let syn::Type::Reference(r) = ty {
        if let syn::Type::Path(tp) = &*r.elem {
            if tp
                .path
                .segments
                .last()
                .is_some_and(|s| s.ident == "RequestContext")
            {
                return Some(r.mutability.is_some());
            }
        }
    }
    None
}
