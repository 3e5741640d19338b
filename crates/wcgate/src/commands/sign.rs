//! `wcgate sign` command implementation.
//!
//! Prints the signature base string, target URL and `Authorization` header the
//! gateway would send for a request, for debugging signature mismatches
//! against the upstream API.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use wcgate_config::Config;
use wcgate_oauth::{OAuthSigner, ParameterSet, SignedRequest, normalize};
use wcgate_server::{forwarded_parameters, server_config_from_config, validate_resource};

use crate::error::CliError;
use crate::output::Output;

/// HTTP methods the gateway signs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum SignMethod {
    Get,
    Post,
}

impl SignMethod {
    fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// Arguments for the sign command.
#[derive(Args)]
pub(crate) struct SignArgs {
    /// Path to configuration file (default: auto-discover wcgate.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP method to sign.
    #[arg(short, long, value_enum, default_value = "get")]
    method: SignMethod,

    /// Upstream resource path, e.g. `orders` or `products/42`.
    #[arg(short, long)]
    resource: String,

    /// Query parameter as `key=value` (repeatable, GET only).
    #[arg(short, long = "query", value_name = "KEY=VALUE")]
    queries: Vec<String>,

    /// Fixed nonce instead of a random one.
    #[arg(long, requires = "timestamp")]
    nonce: Option<String>,

    /// Fixed timestamp instead of the current time.
    #[arg(long, requires = "nonce")]
    timestamp: Option<String>,
}

impl SignArgs {
    /// Execute the sign command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the resource or a query
    /// parameter is invalid, or signing fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = Config::load(self.config.as_deref(), None)?;
        let server_config = server_config_from_config(&config);
        let oauth = OAuthSigner::new(server_config.credentials);

        let resource = validate_resource(&self.resource)?;
        let api_root = server_config.api_root.trim_end_matches('/');
        let url = format!("{api_root}/{resource}");

        let pairs = parse_queries(&self.queries)?;
        let params = match self.method {
            SignMethod::Get => forwarded_parameters(pairs),
            SignMethod::Post => {
                if !pairs.is_empty() {
                    output.warning("Query parameters are not signed or forwarded for POST");
                }
                ParameterSet::new()
            }
        };

        let method = self.method.as_str();
        tracing::debug!(method, url = %url, params = params.len(), "Signing request");
        let signed = match (&self.nonce, &self.timestamp) {
            (Some(nonce), Some(timestamp)) => {
                oauth.authorize_with(method, &url, &params, nonce, timestamp)?
            }
            _ => oauth.authorize(method, &url, &params, &mut rand::rng())?,
        };

        print_signed(&output, method, &target_url(&url, &params), &signed);
        Ok(())
    }
}

/// Parse `key=value` arguments. A missing `=` is an error; an empty value is kept.
fn parse_queries(queries: &[String]) -> Result<Vec<(String, String)>, CliError> {
    queries
        .iter()
        .map(|query| {
            query
                .split_once('=')
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .ok_or_else(|| {
                    CliError::Validation(format!("query parameter must be KEY=VALUE: {query}"))
                })
        })
        .collect()
}

/// URL the gateway would call, including the forwarded query string.
fn target_url(url: &str, params: &ParameterSet) -> String {
    if params.is_empty() {
        url.to_owned()
    } else {
        format!("{url}?{}", normalize(params))
    }
}

fn print_signed(output: &Output, method: &str, target: &str, signed: &SignedRequest) {
    output.highlight("Request");
    output.info(&format!("{method} {target}"));
    output.highlight("Signature base string");
    output.info(&signed.base_string);
    output.highlight("Authorization");
    output.result(&signed.header);
}
