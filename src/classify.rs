use log::warn;
use quote::ToTokens;
use std::collections::HashSet;
use syn::{GenericArgument, PathArguments, PathSegment, Type, TypePath};

use crate::index::{Category, SystemIndex};

/// Wrapper names with dedicated dispatch rules. These never register as
/// identifiers themselves.
const WRAPPERS: [&str; 10] = [
    "Query",
    "Local",
    "Res",
    "ResMut",
    "NonSendMut",
    "EventReader",
    "EventWriter",
    "Option",
    "With",
    "Without",
];

/// Classifies every parameter type of a system declaration, emitting
/// (category, identifier) facts through the index insertion API. Generic
/// placeholders declared on the function are excluded from every category.
/// A parameter shape the dispatch rules do not cover is skipped with a
/// diagnostic; it never aborts the remaining parameters.
pub fn classify_params(
    index: &mut SystemIndex,
    system: &str,
    generics: &HashSet<String>,
    params: &[Type],
) {
    let mut classifier = Classifier {
        index,
        system,
        generics,
    };
    for param in params {
        classifier.classify_type(param);
    }
}

struct Classifier<'a> {
    index: &'a mut SystemIndex,
    system: &'a str,
    generics: &'a HashSet<String>,
}

impl Classifier<'_> {
    /// Top-level dispatch: bare identifier or generic application.
    fn classify_type(&mut self, ty: &Type) {
        let Type::Path(path) = ty else {
            self.skip(ty);
            return;
        };
        let Some(segment) = last_segment(path) else {
            self.skip(ty);
            return;
        };

        match &segment.arguments {
            PathArguments::None => self.emit(Category::Direct, &segment.ident.to_string()),
            PathArguments::AngleBracketed(_) => {
                self.classify_application(&segment.ident.to_string(), &type_args(segment));
            }
            PathArguments::Parenthesized(_) => self.skip(ty),
        }
    }

    /// Dispatch on a generic application's outer name. An unrecognized name
    /// is simultaneously a direct identifier and a holder of further
    /// component types, so both facts are emitted.
    fn classify_application(&mut self, name: &str, args: &[&Type]) {
        match name {
            "Query" | "Local" => {
                for arg in args {
                    self.classify_query_element(arg);
                }
            }
            "Res" => self.classify_target(args.first().copied(), Category::Res),
            "ResMut" | "NonSendMut" => {
                self.classify_target(args.first().copied(), Category::MutRes)
            }
            "EventReader" => self.classify_target(args.first().copied(), Category::EventRead),
            "EventWriter" => self.classify_target(args.first().copied(), Category::EventWrite),
            "With" => {
                for arg in args {
                    self.emit_outer_ident(arg, Category::With);
                }
            }
            "Without" => {
                for arg in args {
                    self.emit_outer_ident(arg, Category::Without);
                }
            }
            "Option" => {
                if let Some(inner) = args.first() {
                    self.classify_type(inner);
                }
            }
            _ => {
                self.emit(Category::Direct, name);
                for arg in args {
                    self.classify_type(arg);
                }
            }
        }
    }

    /// One element of a `Query`/`Local` argument. Tuples flatten to their
    /// elements; references carry the query mutability.
    fn classify_query_element(&mut self, ty: &Type) {
        match ty {
            Type::Tuple(tuple) => {
                for elem in &tuple.elems {
                    self.classify_query_element(elem);
                }
            }
            Type::Reference(reference) => match outer_ident(&reference.elem) {
                Some(ident) => {
                    let category = if reference.mutability.is_some() {
                        Category::MutQuery
                    } else {
                        Category::Query
                    };
                    self.emit(category, &ident);
                }
                None => self.skip(ty),
            },
            Type::Path(path) => match last_segment(path) {
                Some(segment) if matches!(segment.arguments, PathArguments::None) => {
                    self.emit(Category::Direct, &segment.ident.to_string());
                }
                Some(segment) => {
                    self.classify_application(&segment.ident.to_string(), &type_args(segment));
                }
                None => self.skip(ty),
            },
            _ => self.skip(ty),
        }
    }

    /// The acted-upon type of a `Res`/`ResMut`/`NonSendMut`/`EventReader`/
    /// `EventWriter` wrapper. A recognized wrapper inside recurses; any
    /// other application registers its outer name under the target category
    /// and its arguments independently.
    fn classify_target(&mut self, ty: Option<&Type>, category: Category) {
        let Some(ty) = ty else {
            return;
        };
        let Type::Path(path) = ty else {
            self.skip(ty);
            return;
        };
        let Some(segment) = last_segment(path) else {
            self.skip(ty);
            return;
        };
        let name = segment.ident.to_string();

        match &segment.arguments {
            PathArguments::None => self.emit(category, &name),
            PathArguments::AngleBracketed(_) if WRAPPERS.contains(&name.as_str()) => {
                self.classify_application(&name, &type_args(segment));
            }
            PathArguments::AngleBracketed(_) => {
                self.emit(category, &name);
                for arg in type_args(segment) {
                    self.classify_type(arg);
                }
            }
            PathArguments::Parenthesized(_) => self.skip(ty),
        }
    }

    fn emit_outer_ident(&mut self, ty: &Type, category: Category) {
        match outer_ident(ty) {
            Some(ident) => self.emit(category, &ident),
            None => self.skip(ty),
        }
    }

    fn emit(&mut self, category: Category, ident: &str) {
        if self.generics.contains(ident) {
            return;
        }
        self.index.insert(self.system, category, ident);
    }

    fn skip(&mut self, ty: &Type) {
        warn!(
            "{}: unrecognized parameter type shape `{}`, skipping",
            self.system,
            ty.to_token_stream()
        );
    }
}

fn last_segment(path: &TypePath) -> Option<&PathSegment> {
    path.path.segments.last()
}

/// The outer identifier of a type, ignoring any generic arguments.
fn outer_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) => last_segment(path).map(|segment| segment.ident.to_string()),
        _ => None,
    }
}

fn type_args(segment: &PathSegment) -> Vec<&Type> {
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
