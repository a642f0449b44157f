//! Command line definitions

use clap::{Args, Parser, Subcommand};
use localup_inspect_proto::{
    FormatOptions, ParseError, PathPattern, RequestFilters, StatusCodeFilter, TimeWindow,
    DEFAULT_LIST_LIMIT,
};

/// Inspect HTTP requests captured by a running localup tunnel agent
#[derive(Parser, Debug)]
#[command(name = "localup-inspect")]
#[command(about = "Inspect HTTP requests captured by a running localup tunnel agent")]
#[command(version = env!("GIT_TAG"))]
#[command(long_version = concat!(env!("GIT_TAG"), "\nCommit: ", env!("GIT_HASH"), "\nBuilt: ", env!("BUILD_TIME")))]
pub struct Cli {
    /// Inspector base URL (default: http://127.0.0.1:4040)
    #[arg(long, global = true, env = "LOCALUP_INSPECT_URL")]
    pub base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Enable verbose logging (same as --log-level debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective log level after applying `--verbose`
    pub fn effective_log_level(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List recently captured requests as a Markdown report
    #[command(long_about = r#"
List recently captured requests, newest first, as a Markdown report.

Filters are applied locally after fetching. The limit is applied last.

EXAMPLES:
  # Last 20 requests
  localup-inspect list

  # Server errors on the API in the last 5 minutes
  localup-inspect list --status 5xx --path '/api/*' --since 5m

  # Any error, pretty printed bodies cut at 500 characters
  localup-inspect list --errors --pretty --truncate 500

  # Regex path match on one tunnel
  localup-inspect list --path '^/v[0-9]+/users' --tunnel my-api

ENVIRONMENT VARIABLES:
  LOCALUP_INSPECT_URL    Inspector base URL
  RUST_LOG               Log filter (overrides --log-level)
    "#)]
    List(ListArgs),

    /// Show a single captured request
    #[command(long_about = r#"
Show a single captured request by its ID.

EXAMPLES:
  localup-inspect get 548fb5c700000002 --pretty
  localup-inspect get 548fb5c700000002 --headers content-type,host
    "#)]
    Get(GetArgs),

    /// Print new requests as they are captured
    #[command(long_about = r#"
Poll the inspector and print each new matching request once, oldest first.
Requests captured before the command started are not printed. Stop with Ctrl+C.

EXAMPLES:
  # Follow every new request
  localup-inspect tail

  # Follow only failing API calls
  localup-inspect tail --errors --path '/api/*'
    "#)]
    Tail(TailArgs),

    /// Check whether the inspector API is reachable
    Status,
}

/// Record predicates shared by `list` and `tail`
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Status codes or classes, comma separated or repeated (404, 4xx)
    #[arg(short, long, value_delimiter = ',')]
    pub status: Vec<String>,

    /// Only responses with status >= 400
    #[arg(short, long)]
    pub errors: bool,

    /// Path glob (`/api/*`) or regex (`^/v[0-9]+/`)
    #[arg(short, long)]
    pub path: Option<String>,

    /// Exact Host header value
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Tunnel name
    #[arg(short, long)]
    pub tunnel: Option<String>,
}

impl FilterArgs {
    /// Parse into filters; nothing is fetched until this succeeds
    pub fn to_filters(&self) -> Result<RequestFilters, ParseError> {
        let status = if self.status.is_empty() && !self.errors {
            None
        } else {
            Some(StatusCodeFilter::from_tokens(&self.status, self.errors)?)
        };

        let path_pattern = self.path.as_deref().map(PathPattern::parse).transpose()?;

        Ok(RequestFilters {
            limit: None,
            status,
            path_pattern,
            domain: self.domain.clone(),
            tunnel_name: self.tunnel.clone(),
            time_window: None,
        })
    }
}

/// How records are printed
#[derive(Args, Debug, Clone, Default)]
pub struct DisplayArgs {
    /// Re-indent JSON bodies
    #[arg(long)]
    pub pretty: bool,

    /// Cut bodies after this many characters
    #[arg(long, value_name = "CHARS")]
    pub truncate: Option<usize>,

    /// Only show these headers, comma separated
    #[arg(long, value_delimiter = ',', conflicts_with = "no_headers")]
    pub headers: Option<Vec<String>>,

    /// Hide headers
    #[arg(long)]
    pub no_headers: bool,

    /// Show credentials in Authorization, Cookie and similar headers
    #[arg(long)]
    pub no_mask: bool,
}

impl DisplayArgs {
    pub fn to_format_options(&self) -> FormatOptions {
        FormatOptions {
            pretty_print: self.pretty,
            truncate: self.truncate,
            show_headers: !self.no_headers,
            headers_filter: self.headers.clone(),
            mask_sensitive: !self.no_mask,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Maximum number of requests to show
    #[arg(short = 'n', long, default_value_t = DEFAULT_LIST_LIMIT)]
    pub limit: usize,

    /// Only requests newer than this (30s, 5m, 1h)
    #[arg(long)]
    pub since: Option<String>,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub display: DisplayArgs,
}

impl ListArgs {
    pub fn to_filters(&self) -> Result<RequestFilters, ParseError> {
        let time_window = self
            .since
            .as_deref()
            .map(str::parse::<TimeWindow>)
            .transpose()?;

        Ok(RequestFilters {
            limit: Some(self.limit),
            time_window,
            ..self.filters.to_filters()?
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct TailArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    #[command(flatten)]
    pub display: DisplayArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    /// Request ID as shown by `list`
    pub id: String,

    #[command(flatten)]
    pub display: DisplayArgs,
}
