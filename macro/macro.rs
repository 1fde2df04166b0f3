//! A proc-macro parser for rule-language programs.
//!
//! Render Rust tokens back into program text, parse it,
//! and (if successful) emit Rust code that constructs
//! the corresponding knowledge base.

use proc_macro::{Delimiter, Spacing, TokenStream, TokenTree};
use quote::{quote, quote_spanned};

use aspify_syntax::parse_program;

/// Joint punctuation (e.g., `:-`) is glued together; everything else is
/// separated by a space, which the parser ignores.
fn render(input: TokenStream, text: &mut String) {
    for tt in input {
        match tt {
            TokenTree::Group(g) => {
                let (open, close) = match g.delimiter() {
                    Delimiter::Parenthesis => ("(", ")"),
                    Delimiter::Bracket => ("[", "]"),
                    Delimiter::Brace => ("{", "}"),
                    Delimiter::None => ("", ""),
                };
                text.push_str(open);
                render(g.stream(), text);
                text.push_str(close);
                text.push(' ');
            }
            TokenTree::Punct(p) => {
                text.push(p.as_char());
                if p.spacing() == Spacing::Alone {
                    text.push(' ');
                }
            }
            TokenTree::Ident(i) => {
                text.push_str(&i.to_string());
                text.push(' ');
            }
            // Integers and strings print the way the lexer reads them.
            TokenTree::Literal(l) => {
                text.push_str(&l.to_string());
                text.push(' ');
            }
        }
    }
}

/// Parse `input` as a program at Rust compile time, and expand
/// to an expression of type `aspify_syntax::KnowledgeBase`.
#[proc_macro]
pub fn program(input: TokenStream) -> TokenStream {
    let span = proc_macro2::Span::call_site();
    let mut text = String::new();
    render(input, &mut text);
    match parse_program(&text) {
        Ok(kb) => quote!(#kb).into(),
        Err(e) => {
            let msg = format!("program parsing failed: {e}");
            quote_spanned!(span=> compile_error!(#msg)).into()
        }
    }
}
