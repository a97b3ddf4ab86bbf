use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use syn::spanned::Spanned;
use syn::{FnArg, Item, ItemFn, Type};

use crate::index::Location;

/// One function declaration as handed to the classifier: the parser's job
/// ends here, the access semantics are the classifier's.
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    /// Generic type-parameter names declared on the function itself.
    pub generics: HashSet<String>,
    pub params: Vec<Type>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub decls: Vec<FnDecl>,
}

/// Extracts the function declarations of one source file: top-level `fn`
/// items plus `fn` items one level inside an inline `mod` block. Deeper
/// nesting and `impl` methods are not searched.
pub fn parse_source(path: &Path, source: &str) -> Result<ParsedFile> {
    let file = syn::parse_file(source)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let mut decls = Vec::new();
    for item in &file.items {
        match item {
            Item::Fn(item_fn) => decls.push(fn_decl(path, item_fn)),
            Item::Mod(item_mod) => {
                if let Some((_, items)) = &item_mod.content {
                    for inner in items {
                        if let Item::Fn(item_fn) = inner {
                            decls.push(fn_decl(path, item_fn));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Ok(ParsedFile {
        path: path.to_path_buf(),
        decls,
    })
}

fn fn_decl(path: &Path, item: &ItemFn) -> FnDecl {
    let generics = item
        .sig
        .generics
        .type_params()
        .map(|param| param.ident.to_string())
        .collect();

    let params = item
        .sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(pat) => Some((*pat.ty).clone()),
            FnArg::Receiver(_) => None,
        })
        .collect();

    FnDecl {
        name: item.sig.ident.to_string(),
        generics,
        params,
        location: location_of(path, item.span()),
    }
}

fn location_of(path: &Path, span: proc_macro2::Span) -> Location {
    let bytes = span.byte_range();
    Location {
        file: path.to_path_buf(),
        start_byte: bytes.start,
        end_byte: bytes.end,
        start_line: span.start().line,
        end_line: span.end().line,
    }
}
