use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use albumgrid_core::{
    Grid, GridArgs, GridItem, ThumbnailState,
    config::GridConfig,
    grouping::ALBUM_KEY_SEPARATOR,
    source::MemoryLibrary,
    state::{Group, GroupingMode, SortMode},
    thumbnail::ImageThumbnailer,
    thumbnail_cache::CacheStats,
    titleformat::PatternFormatter,
    util::{bytes_to_human_string, seconds_to_hms_string},
    virtualizer::Viewport,
};
use anyhow::Context as _;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

mod art;
mod library;

/// Groups a music directory into album grid cells and lays them out
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing music files
    directory: PathBuf,

    /// How to group tracks into cells (album, artist, folder, year, genre, custom, ...)
    #[arg(long)]
    group_by: Option<GroupingMode>,

    /// How to order the cells (title, artist, year, size, track_count, custom, ...)
    #[arg(long)]
    sort: Option<SortMode>,

    /// Sort in descending order
    #[arg(long)]
    descending: bool,

    /// Only show cells whose key, title or subtitle contains this text
    #[arg(long)]
    filter: Option<String>,

    /// Title-formatting expression for custom grouping, e.g. "%genre%[ / %year%]"
    #[arg(long)]
    pattern: Option<String>,

    /// Title-formatting expression for custom sorting
    #[arg(long)]
    sort_pattern: Option<String>,

    /// Number of columns (0 fits as many as the width allows)
    #[arg(long)]
    columns: Option<u32>,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Vertical scroll offset in pixels
    #[arg(long, default_value_t = 0)]
    scroll: u32,

    /// Configuration file to read settings from
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective settings back to the configuration file
    #[arg(long)]
    save_config: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Decode artwork for the visible cells and report cache statistics
    #[arg(long)]
    load_art: bool,
}

#[derive(Serialize)]
struct OutputGroup {
    key: String,
    title: String,
    subtitle: String,
    track_count: usize,
    size: u64,
    duration: u64,
    tracks: Vec<String>,
}
impl From<&Group> for OutputGroup {
    fn from(group: &Group) -> Self {
        Self {
            key: group.key.to_string(),
            title: group.display_title.clone(),
            subtitle: group.display_subtitle.clone(),
            track_count: group.track_count,
            size: group.aggregate_size,
            duration: group.total_duration,
            tracks: group.tracks.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Serialize)]
struct OutputArt {
    index: usize,
    key: String,
    /// `ready`, `loading` or `unavailable`
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<u32>,
}
impl From<&GridItem> for OutputArt {
    fn from(item: &GridItem) -> Self {
        let (state, size) = match &item.thumbnail {
            ThumbnailState::Ready(t) => ("ready", Some((t.width, t.height))),
            ThumbnailState::Loading => ("loading", None),
            ThumbnailState::Unavailable => ("unavailable", None),
        };
        Self {
            index: item.index,
            key: item.group.key.to_string(),
            state,
            width: size.map(|(w, _)| w),
            height: size.map(|(_, h)| h),
        }
    }
}

#[derive(Serialize)]
struct Output {
    groups: Vec<OutputGroup>,
    columns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    visible: Option<(usize, usize)>,
    scroll_labels: Vec<(String, f32)>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    art: Vec<OutputArt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache: Option<CacheStats>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("albumgrid=info")),
        )
        .init();

    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(GridConfig::FILENAME));
    let mut config = GridConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(mode) = args.group_by {
        config.grouping = mode;
    }
    if let Some(mode) = args.sort {
        config.sort = mode;
    }
    if args.descending {
        config.descending = true;
    }
    if let Some(pattern) = &args.pattern {
        config.grouping_pattern = pattern.clone();
    }
    if let Some(pattern) = &args.sort_pattern {
        config.sort_pattern = pattern.clone();
    }
    if let Some(columns) = args.columns {
        config.columns = columns;
    }
    let config = config.validated();
    if args.save_config {
        config
            .save(&config_path)
            .with_context(|| format!("Failed to save config to {}", config_path.display()))?;
    }

    let library = Arc::new(MemoryLibrary::from_tracks(library::scan(&args.directory)?));
    let mut grid = Grid::new(GridArgs {
        source: library.clone(),
        events: Some(library.subscribe()),
        formatter: Arc::new(PatternFormatter::default()),
        provider: Arc::new(ImageThumbnailer::new(art::EmbeddedArtSource::default())),
        config,
    });
    if let Some(filter) = &args.filter {
        grid.set_filter(filter);
    }

    let viewport = grid.viewport(args.width, args.height, args.scroll);
    let art = if args.load_art {
        load_visible_art(&mut grid, &viewport)
    } else {
        vec![]
    };

    let snapshot = grid.snapshot();
    let output = Output {
        groups: snapshot.iter().map(|group| OutputGroup::from(&**group)).collect(),
        columns: viewport.column_count(),
        visible: viewport
            .visible_range()
            .map(|range| (*range.start(), *range.end())),
        scroll_labels: grid.scroll_indicator(&viewport),
        art: art.iter().map(OutputArt::from).collect(),
        cache: args.load_art.then(|| grid.cache().stats()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_text(&output);
    }

    Ok(())
}

/// Requests art for the visible cells and waits for it to load.
fn load_visible_art(grid: &mut Grid, viewport: &Viewport) -> Vec<GridItem> {
    const TIMEOUT: Duration = Duration::from_secs(60);

    let start = Instant::now();
    grid.visible_items(viewport);
    while grid.pending_count() > 0 {
        if start.elapsed() > TIMEOUT {
            tracing::warn!(
                "Gave up waiting for {} thumbnails after {TIMEOUT:?}",
                grid.pending_count()
            );
            break;
        }
        grid.update();
        std::thread::sleep(Duration::from_millis(10));
    }
    tracing::info!("Loaded visible artwork in {:?}", start.elapsed());
    grid.visible_items(viewport)
}

fn print_text(output: &Output) {
    let total_tracks: usize = output.groups.iter().map(|g| g.track_count).sum();
    println!(
        "{} groups, {total_tracks} tracks, {} columns",
        output.groups.len(),
        output.columns
    );
    println!();

    for (index, group) in output.groups.iter().enumerate() {
        let subtitle = if group.subtitle.is_empty() {
            String::new()
        } else {
            format!(" - {}", group.subtitle)
        };
        println!(
            "{index:>5}  {}{subtitle}  ({} tracks, {}, {})",
            group.title,
            group.track_count,
            bytes_to_human_string(group.size),
            seconds_to_hms_string(group.duration)
        );
    }

    if let Some((first, last)) = output.visible {
        println!();
        println!("Visible: {first}..={last}");
    }
    if !output.scroll_labels.is_empty() {
        let labels = output
            .scroll_labels
            .iter()
            .map(|(label, position)| format!("{label}@{:.0}%", position * 100.0))
            .collect::<Vec<_>>()
            .join(" ");
        println!("Scroll labels: {labels}");
    }

    if !output.art.is_empty() {
        println!();
        for art in &output.art {
            let key = art.key.replace(ALBUM_KEY_SEPARATOR, " / ");
            match (art.width, art.height) {
                (Some(width), Some(height)) => {
                    println!("{:>5}  {key}: {width}x{height}", art.index)
                }
                _ => println!("{:>5}  {key}: {}", art.index, art.state),
            }
        }
    }
    if let Some(stats) = &output.cache {
        println!();
        println!(
            "Cache: {} entries, {} of {} used; {} hits, {} misses, {} evictions, {} rejected",
            stats.entries,
            bytes_to_human_string(stats.used_bytes as u64),
            bytes_to_human_string(stats.budget_bytes as u64),
            stats.hits,
            stats.misses,
            stats.evictions,
            stats.rejections
        );
    }
}
