//! Type-shape helpers shared by the macros.

use syn::{GenericArgument, PathArguments, Type};

/// The single generic argument of `ty` when its last path segment is `name`.
fn single_argument<'a>(ty: &'a Type, name: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }

    let segment = path.path.segments.last()?;
    if segment.ident != name {
        return None;
    }

    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    let mut types = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    });

    let first = types.next()?;
    types.next().is_none().then_some(first)
}

/// `T` for `Arc<T>`.
pub fn arc_inner(ty: &Type) -> Option<&Type> {
    single_argument(ty, "Arc")
}

/// `T` for `Option<Arc<T>>`.
pub fn option_arc_inner(ty: &Type) -> Option<&Type> {
    single_argument(ty, "Option").and_then(arc_inner)
}

/// Whether `ty` names the implementing type itself: `Self` or `self_ty`.
pub fn is_self(ty: &Type, self_ty: &Type) -> bool {
    if let Type::Path(path) = ty
        && path.qself.is_none()
        && path.path.is_ident("Self")
    {
        return true;
    }
    ty == self_ty
}

/// `T` for a return type `Result<T, E>`.
pub fn result_ok(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Result" {
        return None;
    }

    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}
