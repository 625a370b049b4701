use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject a
/// [`rocket::local::asynchronous::Client`] for a freshly built server.
///
/// Every test gets its own server, so no election, credential or ledger
/// state is shared between tests.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    if !args.is_empty() {
        let args = proc_macro2::TokenStream::from(args);
        return syn::Error::new(args.span(), "`backend_test` takes no arguments")
            .into_compile_error()
            .into();
    }
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Reject invalid function signatures.
    let client_arg = match check_sig(&item_fn.sig) {
        Ok(arg) => arg,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let call = match client_arg {
        Some(_) => quote! { #new_name(rocket_client).await; },
        None => quote! {
            drop(rocket_client);
            #new_name().await;
        },
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            log4rs_test_utils::test_logging::init_logging_once_for(
                ["votechain"],
                None,
                None,
            );

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let rocket_client =
                    rocket::local::asynchronous::Client::tracked(crate::rocket_for_tests())
                        .await
                        .unwrap();
                #call
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async and takes at most a single `Client`.
fn check_sig(sig: &Signature) -> Result<Option<Ident>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut client = None;
    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(pat_ident), Type::Path(type_path)) =
                (&*pat_type.pat, &*pat_type.ty)
            {
                let is_client = type_path
                    .path
                    .segments
                    .last()
                    .map_or(false, |segment| segment.ident == "Client");
                if is_client {
                    if client.is_some() {
                        return Err(syn::Error::new(
                            input.span(),
                            "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                        ));
                    }
                    client = Some(pat_ident.ident.clone());
                    continue;
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected no parameters or `client_ident: Client`",
        ));
    }

    Ok(client)
}
