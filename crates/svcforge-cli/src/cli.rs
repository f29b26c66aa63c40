//! CLI command definitions using clap

use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// svcforge - Compose microservices from capabilities
#[derive(Parser)]
#[command(name = "svcforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate a new service project
    New {
        /// Service name (falls back to `service.name` in --config)
        name: Option<String>,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Directory the project directory is created in
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Regenerate into an existing, non-empty project directory
        #[arg(short, long)]
        force: bool,

        /// Directory containing the svcforge-kernel and svcforge-runtime
        /// crates (defaults to this build's workspace)
        #[arg(long, value_name = "DIR")]
        runtime_path: Option<PathBuf>,
    },

    /// Validate a capability selection without generating anything
    Validate {
        /// Service name (falls back to `service.name` in --config)
        name: Option<String>,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Print the resolved model as JSON instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// List the capability catalog
    Capabilities {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compose and run a service in-process until Ctrl-C
    Run {
        /// Service name (falls back to `service.name` in --config)
        name: Option<String>,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Back connect-step capabilities with in-memory providers
        #[arg(long)]
        simulate: bool,
    },
}

/// Flags that describe a capability selection.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Service type (rest, graphql, grpc, websocket, event, scheduled, worker,
    /// gateway, proxy)
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub service_type: Option<String>,

    /// Selection file (YAML, TOML or JSON); flags override its entries
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable a capability, optionally with a provider. Also accepted as
    /// `--with-<capability>[=<provider>]`.
    #[arg(long = "with", value_name = "CAPABILITY[=PROVIDER]")]
    pub with: Vec<String>,

    /// Disable an optional capability
    #[arg(long = "without", value_name = "CAPABILITY")]
    pub without: Vec<String>,

    /// Set a capability option
    #[arg(long = "option", value_name = "CAPABILITY.KEY=VALUE")]
    pub options: Vec<String>,
}

/// Rewrite `--with-<cap>[=<provider>]` into `--with <cap>[=<provider>]`.
///
/// The named form is open-ended over the catalog, so it is folded into the
/// generic flag before clap sees it. Arguments after `--` are left alone.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut normalized = Vec::new();
    let mut passthrough = false;

    for arg in args {
        if passthrough {
            normalized.push(arg);
            continue;
        }
        let rewritten = arg.to_str().and_then(|s| {
            if s == "--" {
                return None;
            }
            let rest = s.strip_prefix("--with-")?;
            (!rest.is_empty()).then(|| rest.to_string())
        });
        match rewritten {
            Some(selection) => {
                normalized.push(OsString::from("--with"));
                normalized.push(OsString::from(selection));
            }
            None => {
                if arg == "--" {
                    passthrough = true;
                }
                normalized.push(arg);
            }
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<OsString> {
        raw.iter().map(OsString::from).collect()
    }

    #[test]
    fn named_with_flags_become_generic() {
        let normalized = normalize_args(args(&[
            "svcforge",
            "new",
            "orders",
            "--with-database=postgres",
            "--with-auth",
            "--without",
            "cache",
        ]));
        assert_eq!(
            normalized,
            args(&[
                "svcforge", "new", "orders", "--with", "database=postgres", "--with", "auth",
                "--without", "cache",
            ])
        );
    }

    #[test]
    fn passthrough_after_double_dash() {
        let normalized = normalize_args(args(&["svcforge", "--", "--with-auth"]));
        assert_eq!(normalized, args(&["svcforge", "--", "--with-auth"]));
    }

    #[test]
    fn parses_selection_flags() {
        let cli = Cli::parse_from(normalize_args(args(&[
            "svcforge",
            "validate",
            "orders",
            "--type",
            "grpc",
            "--with-cache=memcached",
            "--option",
            "cache.servers=a:11211",
        ])));
        let Commands::Validate { name, selection, .. } = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(name.as_deref(), Some("orders"));
        assert_eq!(selection.service_type.as_deref(), Some("grpc"));
        assert_eq!(selection.with, vec!["cache=memcached"]);
        assert_eq!(selection.options, vec!["cache.servers=a:11211"]);
    }
}
