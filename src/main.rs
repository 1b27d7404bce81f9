//! CLI entry point for the gallery-dl manager.

use anyhow::{Context, Result};
use clap::Parser;
use gdl_manager_core::{
    AppSettings, ConsolePrompt, InterruptFlag, JobInvoker, ManagerPaths, RunStats, SiteSettings,
    ToolRunner, find_tool, install_ctrl_c_listener,
    orchestrator::RunnerFactory,
    preflight, sites,
    stats::{self, read_run_log},
    tool,
};
use tracing::{debug, info};

mod cli;

use cli::{Cli, Command, ConfigAction};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Cli::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let paths = ManagerPaths::from_root_arg(args.root.as_deref());
    paths.ensure().context("creating manager directories")?;
    debug!(root = %paths.root.display(), "manager root resolved");

    match args.command {
        Command::Run { site } => cmd_run(&paths, &site).await,
        Command::RunAll => cmd_run_all(&paths).await,
        Command::Preflight => cmd_preflight(&paths).await,
        Command::Sites => cmd_sites(&paths),
        Command::Config { action } => cmd_config(&paths, action),
        Command::Tool { set_path } => cmd_tool(&paths, set_path).await,
        Command::Logs { limit } => cmd_logs(&paths, limit),
        Command::Links => cmd_links(&paths),
        Command::Backup => cmd_backup(&paths),
    }
}

/// Loads everything a download run needs.
fn load_run_context(paths: &ManagerPaths) -> Result<(AppSettings, SiteSettings)> {
    let app = AppSettings::load(paths)?;
    let known = sites::discover_sites(paths)?;
    let site_settings = SiteSettings::load(paths, &known)?;
    Ok((app, site_settings))
}

async fn cmd_run(paths: &ManagerPaths, site_name: &str) -> Result<()> {
    let (app, site_settings) = load_run_context(paths)?;
    let site = sites::load_site(paths, site_name)?;
    if site.urls.is_empty() {
        anyhow::bail!("no URLs for site '{site_name}' (add URL-Lists/{site_name}.txt)");
    }

    let invocation = find_tool(&app)?;
    info!(tool = %invocation.display(), "using gallery-dl invocation");

    let interrupt = InterruptFlag::new();
    install_ctrl_c_listener(interrupt.clone());

    let config = site_settings.get(site_name);
    let runner = ToolRunner::for_site(
        invocation,
        paths,
        site_name,
        &app,
        &config,
        interrupt.clone(),
    );
    let prompt = ConsolePrompt;
    let mut stats = RunStats::new();

    gdl_manager_core::run_site(&site, &config, &runner, &prompt, &interrupt, &mut stats).await;

    let log_path = stats::write_run_log(paths, &stats, site_name)?;
    info!(
        attempted = stats.attempted(),
        ok = stats.succeeded(),
        fail = stats.failed(),
        skipped = stats.skipped(),
        log = %log_path.display(),
        "run finished"
    );
    Ok(())
}

async fn cmd_run_all(paths: &ManagerPaths) -> Result<()> {
    let (app, site_settings) = load_run_context(paths)?;
    let all_sites = sites::load_all_sites(paths)?;
    if all_sites.is_empty() {
        anyhow::bail!("no sites found (add *.txt files under URL-Lists/)");
    }

    println!("Preflight:");
    for (site, status) in preflight::preflight_report(&all_sites).await {
        let mark = if status.is_runnable() { "OK" } else { "!!" };
        println!("  {mark} {site}: {status}");
    }

    let invocation = find_tool(&app)?;
    info!(tool = %invocation.display(), "using gallery-dl invocation");

    let interrupt = InterruptFlag::new();
    install_ctrl_c_listener(interrupt.clone());

    let shared = interrupt.clone();
    let make_runner: Box<RunnerFactory<'_>> = Box::new(move |site, config| {
        Box::new(ToolRunner::for_site(
            invocation.clone(),
            paths,
            &site.name,
            &app,
            config,
            shared.clone(),
        )) as Box<dyn JobInvoker>
    });

    let prompt = ConsolePrompt;
    let stats =
        gdl_manager_core::run_batch(&all_sites, &site_settings, &make_runner, &prompt, &interrupt)
            .await;

    let log_path = stats::write_run_log(paths, &stats, "all")?;
    println!(
        "\nALL DONE. attempted={} ok={} fail={} skipped={}",
        stats.attempted(),
        stats.succeeded(),
        stats.failed(),
        stats.skipped()
    );
    println!("Run log: {}", log_path.display());
    Ok(())
}

async fn cmd_preflight(paths: &ManagerPaths) -> Result<()> {
    let all_sites = sites::load_all_sites(paths)?;
    if all_sites.is_empty() {
        println!("No sites. Add *.txt files to URL-Lists/ first.");
        return Ok(());
    }
    for (site, status) in preflight::preflight_report(&all_sites).await {
        let mark = if status.is_runnable() { "OK" } else { "!!" };
        println!("  {mark} {site}: {status}");
    }
    Ok(())
}

fn cmd_sites(paths: &ManagerPaths) -> Result<()> {
    let (_, site_settings) = load_run_context(paths)?;
    let known = sites::discover_sites(paths)?;
    if known.is_empty() {
        println!("No sites. Add *.txt files to URL-Lists/ first.");
        return Ok(());
    }
    for name in known {
        let cfg = site_settings.get(&name);
        let urls = sites::read_site_urls(paths, &name)?;
        println!(
            "  {name} [{} URLs, delay={}s, sleep={}±{}s]",
            urls.len(),
            cfg.delay_between_urls_secs,
            cfg.base_sleep_secs,
            cfg.jitter_secs
        );
    }
    Ok(())
}

fn cmd_config(paths: &ManagerPaths, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show { site } => {
            let (_, site_settings) = load_run_context(paths)?;
            match site {
                Some(site) => print_site_config(&site, &site_settings.get(&site)),
                None => {
                    for (site, cfg) in site_settings.iter() {
                        print_site_config(site, cfg);
                    }
                }
            }
            Ok(())
        }
        ConfigAction::Set {
            site,
            delay,
            base_sleep,
            jitter,
            extra_args,
        } => {
            let (_, mut site_settings) = load_run_context(paths)?;
            let mut cfg = site_settings.get(&site);
            if let Some(delay) = delay {
                cfg.delay_between_urls_secs = delay;
            }
            if let Some(base_sleep) = base_sleep {
                cfg.base_sleep_secs = base_sleep;
            }
            if let Some(jitter) = jitter {
                cfg.jitter_secs = jitter.max(0.0);
            }
            if let Some(extra_args) = extra_args {
                cfg.extra_args = extra_args;
            }
            site_settings.set(paths, &site, cfg)?;
            print_site_config(&site, &site_settings.get(&site));
            Ok(())
        }
    }
}

fn print_site_config(site: &str, cfg: &gdl_manager_core::SiteConfig) {
    println!(
        "  {site}: delay_between_urls={}s base_sleep={}s jitter={}s extra_args={:?}",
        cfg.delay_between_urls_secs, cfg.base_sleep_secs, cfg.jitter_secs, cfg.extra_args
    );
}

async fn cmd_tool(paths: &ManagerPaths, set_path: Option<String>) -> Result<()> {
    let mut app = AppSettings::load(paths)?;
    if let Some(command_line) = set_path {
        let trimmed = command_line.trim();
        app.tool_path = (!trimmed.is_empty()).then(|| trimmed.to_string());
        app.save(paths)?;
        println!("Tool command set to: {trimmed}");
    }

    match find_tool(&app) {
        Ok(invocation) => {
            println!("Using: {}", invocation.display());
            if let Some(resolved) = &invocation.resolved {
                println!("Resolved path: {}", resolved.display());
            }
            let current = tool::probe_version(&invocation)
                .await
                .unwrap_or_else(|error| format!("(failed: {error})"));
            println!("Current version: {current}");
            if let Some(latest) = tool::latest_published_version().await {
                if current.contains(&latest) {
                    println!("Up to date ({latest})");
                } else {
                    println!("Latest published: {latest}");
                }
            }
        }
        Err(error) => println!("{error}"),
    }
    Ok(())
}

fn cmd_logs(paths: &ManagerPaths, limit: usize) -> Result<()> {
    let logs = stats::list_run_logs(paths)?;
    if logs.is_empty() {
        println!("No run logs yet.");
        return Ok(());
    }
    let start = logs.len().saturating_sub(limit);
    for path in &logs[start..] {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match read_run_log(path) {
            Ok(record) => println!(
                "- {name}: start={} elapsed={}s ok={} fail={} attempted={}",
                record.start, record.elapsed_sec, record.succeeded, record.failed, record.attempted
            ),
            Err(error) => println!("- {name}: unreadable ({error})"),
        }
    }
    Ok(())
}

fn cmd_links(paths: &ManagerPaths) -> Result<()> {
    let all_sites = sites::load_all_sites(paths)?;
    if all_sites.is_empty() {
        println!("No URL-Lists/*.txt found.");
        return Ok(());
    }
    let written = gdl_manager_core::links::build_link_files(paths, &all_sites)?;
    println!("Links built under {} ({written} files)", paths.links.display());
    Ok(())
}

fn cmd_backup(paths: &ManagerPaths) -> Result<()> {
    let out = gdl_manager_core::backup::create_backup(paths)?;
    println!("Backup written: {}", out.display());
    Ok(())
}
