use syn::{ext::IdentExt, FnArg, ImplItem, ImplItemFn, ItemImpl, Pat, Type};

use super::msgs::{ERR_CTX_DUP, ERR_PARAM_PAT, ERR_PARAM_REF, ERR_RECEIVER};
use super::parse::{ctx_ref_mutability, parse_role_attr, RoleAttr};

/// One argument of the user method, in declared order.
pub enum ArgSpec {
    Ctx { mutable: bool },
    Param { name: String, ty: Type },
}

pub struct MethodSpec {
    pub ident: syn::Ident,
    pub is_async: bool,
    pub roles: Vec<RoleAttr>,
    pub args: Vec<ArgSpec>,
}

impl MethodSpec {
    pub fn params(&self) -> impl Iterator<Item = (&str, &Type)> {
        self.args.iter().filter_map(|a| match a {
            ArgSpec::Param { name, ty } => Some((name.as_str(), ty)),
            ArgSpec::Ctx { .. } => None,
        })
    }
}

/// Methods carrying at least one role marker. Untagged methods are skipped.
pub fn collect_methods(item: &ItemImpl) -> (Vec<MethodSpec>, Vec<syn::Error>) {
    let mut out = Vec::new();
    let mut errs = Vec::new();
    for it in &item.items {
        let ImplItem::Fn(f) = it else { continue };
        let mut roles = Vec::new();
        for a in &f.attrs {
            match parse_role_attr(a) {
                Some(Ok(r)) => roles.push(r),
                Some(Err(e)) => errs.push(e),
                None => {}
            }
        }
        if roles.is_empty() {
            continue;
        }
        match analyze_signature(f) {
            Ok(args) => out.push(MethodSpec {
                ident: f.sig.ident.clone(),
                is_async: f.sig.asyncness.is_some(),
                roles,
                args,
            }),
            Err(e) => errs.push(e),
        }
    }
    (out, errs)
}

fn analyze_signature(f: &ImplItemFn) -> syn::Result<Vec<ArgSpec>> {
    let mut inputs = f.sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(r)) if r.reference.is_some() => {}
        Some(other) => return Err(syn::Error::new_spanned(other, ERR_RECEIVER)),
        None => return Err(syn::Error::new_spanned(&f.sig, ERR_RECEIVER)),
    }
    let mut args = Vec::new();
    let mut saw_ctx = false;
    for input in inputs {
        let FnArg::Typed(pt) = input else {
            return Err(syn::Error::new_spanned(input, ERR_RECEIVER));
        };
        if let Some(mutable) = ctx_ref_mutability(&pt.ty) {
            if saw_ctx {
                return Err(syn::Error::new_spanned(pt, ERR_CTX_DUP));
            }
            saw_ctx = true;
            args.push(ArgSpec::Ctx { mutable });
            continue;
        }
        if let Type::Reference(_) = &*pt.ty {
            return Err(syn::Error::new_spanned(&pt.ty, ERR_PARAM_REF));
        }
        let Pat::Ident(pi) = &*pt.pat else {
            return Err(syn::Error::new_spanned(&pt.pat, ERR_PARAM_PAT));
        };
        let name = pi.ident.unraw().to_string();
        args.push(ArgSpec::Param {
            name: name.trim_start_matches('_').to_string(),
            ty: (*pt.ty).clone(),
        });
    }
    Ok(args)
}
