//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Batch front-end for gallery-dl.
///
/// Drives gallery-dl over per-site URL lists with polite pacing, cooperative
/// Ctrl+C handling, preflight checks and per-run statistics.
#[derive(Parser, Debug)]
#[command(name = "gdl-manager")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manager root directory (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download all URLs of one site
    Run {
        /// Site name (URL-list file stem)
        site: String,
    },
    /// Preflight all sites, then download every runnable one
    RunAll,
    /// Report each site's preflight status without downloading
    Preflight,
    /// List known sites and their pacing settings
    Sites,
    /// Show or change per-site settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Resolve the gallery-dl invocation and check versions
    Tool {
        /// Persist an explicit gallery-dl command line
        #[arg(long)]
        set_path: Option<String>,
    },
    /// Summarize recent run logs
    Logs {
        /// How many runs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Build .url link files from the URL lists
    Links,
    /// Zip settings, URL lists and archives into backups/
    Backup,
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print settings for one site, or for all sites
    Show {
        /// Site name; omit to show every site
        site: Option<String>,
    },
    /// Update settings for one site (unset flags keep current values)
    Set {
        /// Site name
        site: String,
        /// Delay between URLs, seconds
        #[arg(long)]
        delay: Option<u64>,
        /// Randomized pre-attempt sleep base, seconds (0 disables)
        #[arg(long)]
        base_sleep: Option<u64>,
        /// Jitter bound around the base sleep, seconds
        #[arg(long)]
        jitter: Option<f64>,
        /// Extra gallery-dl arguments for this site
        #[arg(long, allow_hyphen_values = true)]
        extra_args: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_run_parses_site_name() {
        let cli = Cli::try_parse_from(["gdl-manager", "run", "pixiv"]).unwrap();
        assert!(matches!(cli.command, Command::Run { site } if site == "pixiv"));
    }

    #[test]
    fn test_cli_run_requires_site() {
        assert!(Cli::try_parse_from(["gdl-manager", "run"]).is_err());
    }

    #[test]
    fn test_cli_verbose_and_quiet_flags() {
        let cli = Cli::try_parse_from(["gdl-manager", "-vv", "preflight"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);

        let cli = Cli::try_parse_from(["gdl-manager", "run-all", "--quiet"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_root_override() {
        let cli = Cli::try_parse_from(["gdl-manager", "--root", "/srv/gdl", "sites"]).unwrap();
        assert_eq!(cli.root.unwrap(), PathBuf::from("/srv/gdl"));
    }

    #[test]
    fn test_cli_config_set_partial_flags() {
        let cli = Cli::try_parse_from([
            "gdl-manager",
            "config",
            "set",
            "pixiv",
            "--delay",
            "12",
            "--extra-args",
            "--no-mtime",
        ])
        .unwrap();
        let Command::Config {
            action:
                ConfigAction::Set {
                    site,
                    delay,
                    base_sleep,
                    jitter,
                    extra_args,
                },
        } = cli.command
        else {
            panic!("expected config set");
        };
        assert_eq!(site, "pixiv");
        assert_eq!(delay, Some(12));
        assert_eq!(base_sleep, None);
        assert_eq!(jitter, None);
        assert_eq!(extra_args.as_deref(), Some("--no-mtime"));
    }

    #[test]
    fn test_cli_logs_default_limit() {
        let cli = Cli::try_parse_from(["gdl-manager", "logs"]).unwrap();
        assert!(matches!(cli.command, Command::Logs { limit: 10 }));
    }

    #[test]
    fn test_cli_tool_set_path() {
        let cli =
            Cli::try_parse_from(["gdl-manager", "tool", "--set-path", "python3 -m gallery_dl"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Command::Tool { set_path: Some(p) } if p == "python3 -m gallery_dl"
        ));
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Cli::try_parse_from(["gdl-manager", "--help"]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["gdl-manager", "frobnicate"]).is_err());
    }
}
