//! nmtv - channel surfing in your terminal
//!
//! Linear TV channels over an on-demand catalog. Leave a channel, come back
//! later, and it kept playing while you were gone.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use nmtv::core::catalog::{CatalogGateway, HttpCatalog, MemoryCatalog};
use nmtv::core::clock::{Clock, SystemClock};
use nmtv::core::player::{Playhead, build_video_url_at};
use nmtv::core::tuner::{TuneResult, Tuner, TunerOptions};
use nmtv::error::{ErrorCode, NmtvError};
use nmtv::storage::cache::YearCache;
use nmtv::storage::config;
use nmtv::storage::last_channel::LastChannel;
use nmtv::storage::playlists::{PlaylistStore, playlists_path};
use nmtv::types::{AppState, Channel};
use nmtv::ui::display::{
    format_channel_label, format_duration, format_item_label, format_source, format_tune_result,
};
use nmtv::ui::selector::Selector;
use nmtv::utils::paths::{
    ensure_app_dirs, get_config_dir, get_last_channel_path, get_year_cache_dir,
};

/// Linear TV channels in your terminal.
#[derive(Parser, Debug)]
#[command(name = "nmtv")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Channel to start on (defaults to the last one watched)
    channel: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Edit the configuration file
    #[arg(short, long)]
    edit: bool,

    /// List channels and exit
    #[arg(short, long)]
    list: bool,

    /// Use the built-in demo lineup instead of the backend
    #[arg(long)]
    offline: bool,
}

fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("nmtv=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nmtv=warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn fetch_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_error(e: &NmtvError) {
    eprintln!("{} {}", "Error:".red(), e);
    match e.code() {
        ErrorCode::NetworkError => {
            eprintln!("{}", "Is the backend running? Try --offline for the demo lineup.".dimmed())
        }
        ErrorCode::EmptyQueue => eprintln!("{}", "Nothing on this channel right now.".dimmed()),
        _ => {}
    }
}

fn print_now_playing(tuner: &Tuner, playhead: &Playhead) {
    let Some(item) = tuner.current() else {
        println!("{}", "Nothing on. Try another channel.".yellow());
        return;
    };
    let position = playhead.position().unwrap_or(0.0);

    println!("{} {}", "▶".green(), format_item_label(item));
    if let Some(source) = format_source(item) {
        println!("  {}", source);
    }
    println!(
        "  {} {}",
        format_duration(position).cyan(),
        build_video_url_at(&item.id, position).dimmed()
    );
    if let Some(next) = tuner.upcoming() {
        println!("  {} {}", "Next:".dimmed(), format_item_label(next));
    }
}

/// Load whatever the tuner settled on and show it
async fn show_tuned(tuner: &mut Tuner, playhead: &mut Playhead, result: &TuneResult) {
    let Some(item) = tuner.current().cloned() else {
        playhead.stop();
        print_now_playing(tuner, playhead);
        return;
    };
    playhead.load(&item, result.start_position());
    tuner.on_playing();
    tuner.enrich_current_year().await;

    println!(
        "\n{}  {}",
        format_channel_label(tuner.channel()).bold(),
        format_tune_result(result).dimmed()
    );
    print_now_playing(tuner, playhead);
}

/// Start the current item from the top after a skip or removal
async fn load_current(tuner: &mut Tuner, playhead: &mut Playhead, start_at: f64) {
    match tuner.current().cloned() {
        Some(item) => {
            playhead.load(&item, start_at);
            tuner.on_playing();
            tuner.enrich_current_year().await;
        }
        None => playhead.stop(),
    }
}

/// Roll the virtual player forward over items that finished while the menu was open
async fn catch_up(tuner: &mut Tuner, playhead: &mut Playhead) {
    while playhead.finished() {
        let carry = playhead.overrun();
        if tuner.advance().await.is_none() {
            playhead.stop();
            break;
        }
        load_current(tuner, playhead, carry).await;
    }
}

async fn switch(tuner: &mut Tuner, playhead: &mut Playhead, to: Channel) {
    let report = playhead.report();
    let spinner = fetch_spinner(format!("Tuning to {}...", format_channel_label(to)));
    let result = tuner.switch_channel(to, report).await;
    spinner.finish_and_clear();

    match result {
        Ok(result) => show_tuned(tuner, playhead, &result).await,
        Err(e) => {
            playhead.stop();
            print_error(&e);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Ensure app directories exist
    ensure_app_dirs().await?;

    // Handle --edit flag
    if cli.edit {
        let cfg = config::load_config().await?;
        config::edit_config(&cfg.editor).await?;
        return Ok(());
    }

    if cli.list {
        for channel in Channel::ALL {
            println!("{}  {}", format_channel_label(channel), channel.as_str().dimmed());
        }
        return Ok(());
    }

    let cfg = config::load_config().await?;

    let gateway: Arc<dyn CatalogGateway> = if cli.offline {
        Arc::new(MemoryCatalog::demo())
    } else {
        Arc::new(HttpCatalog::new(&cfg.backend_url))
    };
    let playlists = Arc::new(PlaylistStore::load(&playlists_path(&get_config_dir())).await?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let last_channel = LastChannel::new(&get_last_channel_path());

    let start = match &cli.channel {
        Some(name) => name.parse::<Channel>()?,
        None => last_channel.load(cfg.default_channel).await,
    };

    let mut tuner = Tuner::new(gateway, playlists, clock.clone(), TunerOptions::from(&cfg))
        .with_year_cache(YearCache::new(&get_year_cache_dir()))
        .with_last_channel(last_channel);
    let mut playhead = Playhead::new(clock);
    let selector = Selector::new();

    switch(&mut tuner, &mut playhead, start).await;

    // State machine
    let mut state = AppState::Menu;
    while state != AppState::Exit {
        catch_up(&mut tuner, &mut playhead).await;

        state = match state {
            AppState::Menu => selector.select_action(tuner.channel()),

            AppState::NowPlaying => {
                print_now_playing(&tuner, &playhead);
                AppState::Menu
            }

            AppState::Next => {
                tuner.advance().await;
                load_current(&mut tuner, &mut playhead, 0.0).await;
                print_now_playing(&tuner, &playhead);
                AppState::Menu
            }

            AppState::Surf { up } => {
                let to = tuner.channel().surf(up);
                switch(&mut tuner, &mut playhead, to).await;
                AppState::Menu
            }

            AppState::TuneTo => {
                if let Some(to) = selector.select_channel() {
                    switch(&mut tuner, &mut playhead, to).await;
                }
                AppState::Menu
            }

            AppState::ReportUnavailable => {
                if let Some(id) = tuner.current().map(|item| item.id.clone()) {
                    tuner.mark_unavailable(&id, None);
                    if tuner.current().is_none() {
                        tuner.advance().await;
                    }
                    println!("{}", "Removed. Thanks for the report.".dimmed());
                    load_current(&mut tuner, &mut playhead, 0.0).await;
                    print_now_playing(&tuner, &playhead);
                }
                AppState::Menu
            }

            AppState::Exit => break,
        };
    }

    println!("👋 Thanks for watching.");
    Ok(())
}
