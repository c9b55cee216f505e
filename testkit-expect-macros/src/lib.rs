//! Procedural macros for testkit-expect
//!
//! This crate provides the `#[testkit_expect::test]` attribute macro, which
//! sets the polling defaults for one test and can inject a virtual clock.
//!
//! # Example
//!
//! ```rust,ignore
//! use testkit_expect::prelude::*;
//!
//! #[testkit_expect::test(timeout_ms = 200)]
//! fn eventually_ready() {
//!     expect(|| 1).to_eventually(equal(1));
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, FnArg, Ident, ItemFn, Lit, Pat, Token, Type,
};

/// Configuration options for the test macro.
#[derive(Default)]
struct TestConfig {
    /// Polling timeout in milliseconds
    timeout_ms: Option<u64>,
    /// Polling interval in milliseconds
    poll_interval_ms: Option<u64>,
    /// Initial time for the mock clock, in milliseconds
    start_time_ms: Option<u64>,
    /// Whether the injected clock advances itself when polled
    auto_advance: bool,
    /// Flavor for tokio runtime ("current_thread" or "multi_thread")
    flavor: Option<String>,
}

fn int_value(lit: &Lit) -> syn::Result<u64> {
    match lit {
        Lit::Int(i) => i.base10_parse(),
        other => Err(syn::Error::new_spanned(other, "expected an integer")),
    }
}

impl Parse for TestConfig {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut config = TestConfig::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let lit: Lit = input.parse()?;

            match ident.to_string().as_str() {
                "timeout_ms" => config.timeout_ms = Some(int_value(&lit)?),
                "poll_interval_ms" => config.poll_interval_ms = Some(int_value(&lit)?),
                "start_time_ms" => config.start_time_ms = Some(int_value(&lit)?),
                "auto_advance" => match lit {
                    Lit::Bool(b) => config.auto_advance = b.value(),
                    other => return Err(syn::Error::new_spanned(other, "expected a boolean")),
                },
                "flavor" => match lit {
                    Lit::Str(s) => config.flavor = Some(s.value()),
                    other => return Err(syn::Error::new_spanned(other, "expected a string")),
                },
                _ => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {ident}"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(config)
    }
}

/// Determines if a function parameter is requesting a MockClock.
fn is_clock_param(arg: &FnArg) -> bool {
    if let FnArg::Typed(pat_type) = arg {
        if let Type::Path(type_path) = &*pat_type.ty {
            if let Some(segment) = type_path.path.segments.last() {
                return segment.ident == "MockClock";
            }
        }
    }
    false
}

/// Extracts the parameter name from a function argument.
fn get_param_name(arg: &FnArg) -> Option<&Pat> {
    if let FnArg::Typed(pat_type) = arg {
        Some(&pat_type.pat)
    } else {
        None
    }
}

/// Test attribute macro for expectation-heavy tests.
///
/// Works on both plain and async functions: plain functions become `#[test]`
/// functions, async ones run under `#[tokio::test]`.
///
/// # Polling Defaults
///
/// `timeout_ms` and `poll_interval_ms` override the polling defaults for
/// the duration of the test, on the test's thread only:
///
/// ```rust,ignore
/// #[testkit_expect::test(timeout_ms = 50, poll_interval_ms = 5)]
/// fn quick_poll() {
///     expect(|| 0).to_never(equal(1));
/// }
/// ```
///
/// # With MockClock Injection
///
/// Add a `clock: MockClock` parameter to receive a virtual clock. Use it with
/// a [`Poller`](https://docs.rs/testkit-expect) to poll in virtual time:
///
/// ```rust,ignore
/// #[testkit_expect::test(auto_advance = true)]
/// fn virtual_time(clock: MockClock) {
///     let poller = Poller::current().with_clock(clock.clone());
///     expect(|| 0).using(poller).to_never(equal(1));
///     assert_eq!(clock.now(), Duration::from_secs(1));
/// }
/// ```
///
/// # Configuration Options
///
/// - `timeout_ms = 200` - Polling timeout
/// - `poll_interval_ms = 5` - Polling interval
/// - `start_time_ms = 1000` - Start time of the injected clock
/// - `auto_advance = true` - The injected clock advances itself while polled
/// - `flavor = "multi_thread"` - Tokio runtime flavor for async tests
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = parse_macro_input!(attr as TestConfig);
    let input = parse_macro_input!(item as ItemFn);

    expand_test(&config, &input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_test(config: &TestConfig, input: &ItemFn) -> syn::Result<TokenStream2> {
    let name = &input.sig.ident;
    let output = &input.sig.output;
    let body = &input.block;
    let attrs = &input.attrs;
    let vis = &input.vis;

    if let Some(extra) = input.sig.inputs.iter().find(|arg| !is_clock_param(arg)) {
        return Err(syn::Error::new_spanned(
            extra,
            "test functions may only take a `MockClock` parameter",
        ));
    }

    // Generate clock initialization
    let clock_init = match input.sig.inputs.iter().find_map(get_param_name) {
        Some(clock_name) => {
            let start_time = config.start_time_ms.unwrap_or(0);
            let auto_advance = config.auto_advance;
            quote! {
                let #clock_name = ::testkit_expect::clock::MockClock::with_start_time(
                    ::std::time::Duration::from_millis(#start_time)
                );
                #clock_name.set_auto_advance(#auto_advance);
            }
        }
        None => quote! {},
    };

    // Generate scoped polling defaults
    let timeout = config.timeout_ms.map(|ms| {
        quote! { .with_timeout(::std::time::Duration::from_millis(#ms)) }
    });
    let poll_interval = config.poll_interval_ms.map(|ms| {
        quote! { .with_poll_interval(::std::time::Duration::from_millis(#ms)) }
    });
    let defaults_init = if timeout.is_some() || poll_interval.is_some() {
        quote! {
            let _polling_defaults = ::testkit_expect::polling::PollingDefaults::current()
                #timeout
                #poll_interval
                .scoped();
        }
    } else {
        quote! {}
    };

    if input.sig.asyncness.is_none() {
        return Ok(quote! {
            #[::core::prelude::v1::test]
            #(#attrs)*
            #vis fn #name() #output {
                #defaults_init
                #clock_init
                #body
            }
        });
    }

    let flavor_attr = match config.flavor.as_deref().unwrap_or("current_thread") {
        "multi_thread" => quote! { #[::tokio::test(flavor = "multi_thread")] },
        "current_thread" => quote! { #[::tokio::test] },
        other => {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("unsupported flavor: {other}. Use \"current_thread\" or \"multi_thread\""),
            ));
        }
    };

    Ok(quote! {
        #flavor_attr
        #(#attrs)*
        #vis async fn #name() #output {
            #defaults_init
            #clock_init
            #body
        }
    })
}
