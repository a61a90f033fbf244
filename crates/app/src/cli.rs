use clap::{Parser, Subcommand};
use sentinel_core::app::SortKey;
use std::path::PathBuf;

#[derive(Parser, Debug, PartialEq)]
#[command(name = "sentinel")]
#[command(about = "Watch pull and scan jobs on a Git repository server")]
pub struct CliArgs {
    /// Server base URL (overrides config)
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Action {
    /// List tracked repositories
    List {
        /// Case-insensitive filter on name or path
        #[arg(short, long, default_value = "")]
        query: String,

        /// `name` or `modified` (overrides config)
        #[arg(short, long)]
        sort: Option<SortKey>,
    },

    /// Show live details of a repository
    Show { id: String },

    /// Pull a repository and follow its progress
    Pull {
        id: String,

        /// Only report the outcome, like the list's pull button
        #[arg(long)]
        quick: bool,
    },

    /// Print `git status` of a repository
    Status { id: String },

    /// Throw away all local changes of a repository
    Discard {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Scan a directory for repositories and follow its progress
    Scan {
        /// Directory to scan (defaults to the configured scan path)
        path: Option<String>,

        /// Maximum directory depth (overrides config)
        #[arg(short, long)]
        depth: Option<u32>,

        /// Pick the directory interactively first
        #[arg(short, long, conflicts_with = "path")]
        browse: bool,
    },

    /// Browse the server's directories interactively
    Browse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_list_defaults() {
        let args = CliArgs::parse_from(["sentinel", "list"]);
        assert_eq!(args.action, Action::List { query: String::new(), sort: None });
        assert_eq!(args.server, None);
        assert!(!args.verbose);
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let args = CliArgs::parse_from([
            "sentinel",
            "pull", "_srv_app", "--quick",
            "--server", "http://nas:5000",
            "--config", "/custom/config.toml",
        ]);
        assert_eq!(args.action, Action::Pull { id: "_srv_app".to_string(), quick: true });
        assert_eq!(args.server.as_deref(), Some("http://nas:5000"));
        assert_eq!(args.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_cli_parse_sort_key() {
        let args = CliArgs::parse_from(["sentinel", "list", "--sort", "modified", "-q", "api"]);
        assert_eq!(
            args.action,
            Action::List { query: "api".to_string(), sort: Some(SortKey::Modified) }
        );
        assert!(CliArgs::try_parse_from(["sentinel", "list", "--sort", "size"]).is_err());
    }

    #[test]
    fn test_cli_scan_browse_conflicts_with_path() {
        assert!(CliArgs::try_parse_from(["sentinel", "scan", "/srv", "--browse"]).is_err());
        let args = CliArgs::parse_from(["sentinel", "scan", "--depth", "3"]);
        assert_eq!(args.action, Action::Scan { path: None, depth: Some(3), browse: false });
    }
}
