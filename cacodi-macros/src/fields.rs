//! `#[derive(Inject)]` implementation.
//!
//! Emits a descriptor holding the struct's injectable fields and, when one
//! field is marked `#[parent]`, the link to the embedded ancestor.

use darling::ast::Data;
use darling::util::Ignored;
use darling::{FromDeriveInput, FromField};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, DeriveInput, Generics, Ident, Type, parse_macro_input};

use crate::types::option_arc_inner;

#[derive(FromDeriveInput)]
#[darling(supports(struct_named))]
struct InjectInput {
    ident: Ident,
    generics: Generics,
    data: Data<Ignored, InjectField>,
}

#[derive(FromField)]
#[darling(forward_attrs(inject, parent))]
struct InjectField {
    ident: Option<Ident>,
    ty: Type,
    attrs: Vec<Attribute>,
}

impl InjectField {
    fn marked(&self, marker: &str) -> bool {
        self.attrs.iter().any(|attr| attr.path().is_ident(marker))
    }
}

pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let input = match InjectInput::from_derive_input(&input) {
        Ok(input) => input,
        Err(err) => return err.write_errors().into(),
    };

    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.write_errors().into(),
    }
}

fn expand(input: &InjectInput) -> darling::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(
            darling::Error::custom("Inject cannot be derived for generic types")
                .with_span(&input.generics),
        );
    }

    let Data::Struct(fields) = &input.data else {
        return Err(darling::Error::unsupported_shape("enum").with_span(&input.ident));
    };

    let self_ty = &input.ident;
    let mut errors = darling::Error::accumulator();
    let mut injectors = Vec::new();
    let mut parent: Option<TokenStream2> = None;

    for field in fields.iter() {
        let Some(ident) = &field.ident else {
            continue;
        };

        if field.marked("inject") {
            match option_arc_inner(&field.ty) {
                Some(inner) => injectors.push(field_injector(self_ty, ident, inner)),
                None => errors.push(
                    darling::Error::custom("#[inject] fields must be Option<Arc<T>>")
                        .with_span(&field.ty),
                ),
            }
        }

        if field.marked("parent") {
            if parent.is_some() {
                errors.push(
                    darling::Error::custom("only one field can be marked #[parent]")
                        .with_span(ident),
                );
                continue;
            }
            let ancestor = &field.ty;
            parent = Some(quote! {
                .parent::<#self_ty, #ancestor, _>(|this: &mut #self_ty| &mut this.#ident)
            });
        }
    }
    errors.finish()?;

    Ok(quote! {
        const _: () = {
            fn describe() -> ::cacodi::__private::TypeMetadata {
                ::cacodi::__private::TypeMetadata::of::<#self_ty>()
                    #(.field(#injectors))*
                    #parent
            }

            ::cacodi::__private::inventory::submit! {
                ::cacodi::__private::MetadataSource::new(describe)
            }
        };
    })
}

fn field_injector(self_ty: &Ident, field: &Ident, value: &Type) -> TokenStream2 {
    let name = field.to_string();
    quote! {
        ::cacodi::__private::FieldInjector::new::<#self_ty, #value, _>(
            #name,
            |this: &mut #self_ty, value: ::std::sync::Arc<#value>| {
                this.#field = ::core::option::Option::Some(value);
            },
        )
    }
}
