//! `#[injectable]` attribute implementation.
//!
//! Reads the constructors of an inherent impl block and emits a descriptor
//! into the inventory, plus one `Upcast` impl per implemented trait.

use darling::FromMeta;
use darling::ast::NestedMeta;
use darling::util::{Flag, PathList};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, quote_spanned};
use syn::{FnArg, ImplItem, ImplItemFn, ItemImpl, ReturnType, Type, Visibility, parse_macro_input};

use crate::types::{arc_inner, is_self, result_ok};

/// Arguments of `#[injectable(...)]`.
#[derive(Debug, Default, FromMeta)]
struct InjectableArgs {
    /// Traits the type is requested as: `implements(Greeter, store::Repository)`.
    #[darling(default)]
    implements: PathList,
    /// The type is described but never instantiated.
    #[darling(default)]
    abstract_type: Flag,
}

/// How a constructor hands back its value.
enum Returns {
    Value,
    Fallible,
}

struct ConstructorDecl {
    name: syn::Ident,
    public: bool,
    manual: bool,
    returns: Returns,
    params: Vec<Type>,
}

pub fn injectable(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = match NestedMeta::parse_meta_list(args.into()) {
        Ok(args) => args,
        Err(err) => return darling::Error::from(err).write_errors().into(),
    };
    let args = match InjectableArgs::from_list(&args) {
        Ok(args) => args,
        Err(err) => return err.write_errors().into(),
    };

    let mut item = parse_macro_input!(input as ItemImpl);
    match expand(&args, &mut item) {
        Ok(generated) => quote! {
            #item
            #generated
        }
        .into(),
        Err(err) => {
            strip_markers(&mut item);
            let err = err.write_errors();
            quote! {
                #item
                #err
            }
            .into()
        }
    }
}

fn expand(args: &InjectableArgs, item: &mut ItemImpl) -> darling::Result<TokenStream2> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(darling::Error::custom(
            "#[injectable] goes on an inherent impl block, not a trait impl",
        )
        .with_span(path));
    }
    if !item.generics.params.is_empty() {
        return Err(
            darling::Error::custom("#[injectable] types cannot be generic").with_span(&item.generics)
        );
    }

    let self_ty = (*item.self_ty).clone();
    let mut errors = darling::Error::accumulator();
    let mut constructors = Vec::new();

    for impl_item in &mut item.items {
        let ImplItem::Fn(func) = impl_item else {
            continue;
        };
        let manual = take_manual(func);
        if let Some(decl) = errors.handle(constructor(func, &self_ty, manual)).flatten() {
            constructors.push(decl);
        }
    }
    errors.finish()?;

    let constructors = constructors.iter().map(|decl| describe_constructor(decl, &self_ty));
    let abstract_type = args
        .abstract_type
        .is_present()
        .then(|| quote!(.abstract_type()));

    let upcasts = args.implements.iter().map(|interface| {
        quote! {
            impl ::cacodi::__private::Upcast<dyn #interface> for #self_ty {
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<dyn #interface> {
                    self
                }
            }
        }
    });

    Ok(quote! {
        const _: () = {
            fn describe() -> ::cacodi::__private::TypeMetadata {
                ::cacodi::__private::TypeMetadata::of::<#self_ty>()
                    #abstract_type
                    #(.constructor(#constructors))*
            }

            ::cacodi::__private::inventory::submit! {
                ::cacodi::__private::MetadataSource::new(describe)
            }
        };

        #(#upcasts)*
    })
}

/// Removes `#[manual]` from `func`, reporting whether it was there.
fn take_manual(func: &mut ImplItemFn) -> bool {
    let before = func.attrs.len();
    func.attrs.retain(|attr| !attr.path().is_ident("manual"));
    func.attrs.len() != before
}

fn strip_markers(item: &mut ItemImpl) {
    for impl_item in &mut item.items {
        if let ImplItem::Fn(func) = impl_item {
            take_manual(func);
        }
    }
}

/// Reads `func` as a constructor. `Ok(None)` for associated fns that are
/// not constructors.
fn constructor(
    func: &ImplItemFn,
    self_ty: &Type,
    manual: bool,
) -> darling::Result<Option<ConstructorDecl>> {
    let sig = &func.sig;
    let has_receiver = sig.inputs.iter().any(|arg| matches!(arg, FnArg::Receiver(_)));

    let returns = match &sig.output {
        ReturnType::Type(_, ty) if is_self(ty, self_ty) => Some(Returns::Value),
        ReturnType::Type(_, ty) => result_ok(ty)
            .filter(|ok| is_self(ok, self_ty))
            .map(|_| Returns::Fallible),
        ReturnType::Default => None,
    };

    let Some(returns) = returns.filter(|_| !has_receiver) else {
        if manual {
            return Err(darling::Error::custom(
                "#[manual] marks a constructor: an associated fn without receiver returning Self",
            )
            .with_span(&sig.ident));
        }
        return Ok(None);
    };

    if !sig.generics.params.is_empty() || sig.asyncness.is_some() {
        if manual {
            return Ok(Some(ConstructorDecl {
                name: sig.ident.clone(),
                public: callable(&func.vis),
                manual,
                returns,
                params: Vec::new(),
            }));
        }
        return Err(darling::Error::custom(
            "constructors cannot be generic or async; mark it #[manual] to keep it out of resolution",
        )
        .with_span(&sig.ident));
    }

    let mut errors = darling::Error::accumulator();
    let mut params = Vec::new();
    for input in &sig.inputs {
        let FnArg::Typed(typed) = input else {
            continue;
        };
        match arc_inner(&typed.ty) {
            Some(inner) => params.push(inner.clone()),
            None if manual => {}
            None => errors.push(
                darling::Error::custom(
                    "constructor parameters must be Arc<T>; mark the constructor #[manual] to skip it",
                )
                .with_span(&typed.ty),
            ),
        }
    }
    errors.finish()?;

    Ok(Some(ConstructorDecl {
        name: sig.ident.clone(),
        public: callable(&func.vis),
        manual,
        returns,
        params,
    }))
}

/// Any `pub`, restricted forms included: the generated code sits next to
/// the impl block and can reach them.
fn callable(vis: &Visibility) -> bool {
    !matches!(vis, Visibility::Inherited)
}

fn describe_constructor(decl: &ConstructorDecl, self_ty: &Type) -> TokenStream2 {
    let name = &decl.name;
    let name_str = name.to_string();
    let visibility = if decl.public {
        quote!(::cacodi::__private::Visibility::Public)
    } else {
        quote!(::cacodi::__private::Visibility::Private)
    };
    let keys = decl
        .params
        .iter()
        .map(|ty| quote!(::cacodi::__private::TypeKey::of::<#ty>()));
    let declared_at = quote_spanned! {name.span()=>
        .declared_at(::core::line!(), ::core::column!())
    };

    if decl.manual {
        return quote! {
            ::cacodi::__private::Constructor::opaque(#name_str, #visibility, ::std::vec![#(#keys),*])
                #declared_at
        };
    }

    let args = decl
        .params
        .iter()
        .enumerate()
        .map(|(index, ty)| quote!(_args.get::<#ty>(#index)?));
    let call = quote!(<#self_ty>::#name(#(#args),*));
    let body = match decl.returns {
        Returns::Value => quote!(::core::result::Result::Ok(#call)),
        Returns::Fallible => quote!(#call.map_err(::core::convert::Into::into)),
    };

    quote! {
        ::cacodi::__private::Constructor::new(
            #name_str,
            #visibility,
            ::std::vec![#(#keys),*],
            |_args: &::cacodi::__private::Arguments| -> ::core::result::Result<#self_ty, ::cacodi::__private::BoxError> {
                #body
            },
        )
        #declared_at
    }
}
