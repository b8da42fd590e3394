//! Macros for meal planner tests.

use proc_macro::TokenStream;
use proc_macro2::Span;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{ext::IdentExt, parse_macro_input, punctuated::Punctuated, Ident, ItemFn, Stmt, Token};

/// Create an in-memory and a store file `#[test]` that each invoke `$fname`
/// with a `Connection`.
///
/// The store has the current schema unless the `nomigrate` option is given,
/// in which case it is completely empty.
#[proc_macro_attribute]
pub fn mealplan_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let input: TokenStream2 = input.into();
    let mut func: ItemFn = match syn::parse2(input) {
        Ok(func) => func,
        Err(e) => return e.to_compile_error().into(),
    };
    let fname = func.sig.ident.to_string();

    // Handle arguments
    let options: Vec<TestOption> =
        parse_macro_input!(args with Punctuated::<TestOption, Token![,]>::parse_terminated)
            .into_iter()
            .collect();
    let migrate = !options.contains(&TestOption::NoMigrate);

    let prelude: Stmts = match syn::parse2(quote!(
        #[allow(unused_imports)]
        use mealplan_core::ConnectionMethods;
    )) {
        Ok(stmts) => stmts,
        Err(e) => return e.to_compile_error().into(),
    };
    func.block.stmts = prelude.into_iter().chain(func.block.stmts).collect();

    let tests = [
        ("memory", "MemoryTestInstance"),
        ("file", "FileTestInstance"),
    ]
    .into_iter()
    .map(|(store, instance)| make_test(&fname, store, instance, migrate));

    quote! {
        #[cfg(test)]
        #func
        #(#tests)*
    }
    .into()
}

fn make_test(
    fname_base: &str,
    store_name: &str,
    instance_name: &str,
    migrate: bool,
) -> TokenStream2 {
    let fname_full = make_ident(&format!("{fname_base}_{store_name}"));
    let fname = make_ident(fname_base);
    let instance_ident = make_ident(instance_name);
    quote! {
        #[test]
        pub fn #fname_full () {
            use mealplan_test_helper::*;
            #instance_ident::run_test(#fname, #migrate);
        }
    }
}

fn make_ident(name: &str) -> Ident {
    Ident::new(name, Span::call_site())
}

/// Options for mealplan_test.
#[derive(PartialEq, Eq)]
enum TestOption {
    NoMigrate,
}

impl Parse for TestOption {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let lookahead = input.lookahead1();
        if lookahead.peek(<Ident as IdentExt>::peek_any) {
            let name: Ident = input.call(IdentExt::parse_any)?;
            if name == "nomigrate" {
                Ok(TestOption::NoMigrate)
            } else {
                Err(syn::Error::new(
                    name.span(),
                    "Unknown option for mealplan_test",
                ))
            }
        } else {
            Err(lookahead.error())
        }
    }
}

struct Stmts {
    stmts: Vec<Stmt>,
}

impl Parse for Stmts {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut stmts = Vec::new();
        while !input.is_empty() {
            stmts.push(input.parse()?);
        }
        Ok(Self { stmts })
    }
}

impl IntoIterator for Stmts {
    type Item = Stmt;
    type IntoIter = std::vec::IntoIter<Self::Item>;
    fn into_iter(self) -> Self::IntoIter {
        self.stmts.into_iter()
    }
}
