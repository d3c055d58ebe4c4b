use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use perch::listing::{post_description, Listing, ListingOrchestrator, PagedQuery, PostFilter};
use perch::render::{crumbs_template, page_bar_template, render_to_string};
use perch::taxonomy::{
    resolve_path, JsonTaxonomyStore, TaxonomyCache, TaxonomyId, TaxonomyTree, TaxonomyType,
    Visibility,
};
use perch::{AbsoluteUrls, SiteConfig};
use serde::Deserialize;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{info, warn};

#[derive(Parser)]
#[command(about = "Browse a blog's taxonomies and post listings")]
struct Args {
    /// The directory holding `site.toml`, `taxonomies.json`, and `posts.json`.
    #[arg(long, default_value = "demos/blog")]
    site: PathBuf,

    /// Include hidden taxonomies and private posts.
    #[arg(long)]
    admin: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the taxonomy tree.
    Tree {
        #[arg(long, value_enum, default_value = "category")]
        kind: Kind,
    },
    /// Print the breadcrumbs of a taxonomy.
    Crumbs {
        slug: String,

        #[arg(long, value_enum, default_value = "category")]
        kind: Kind,
    },
    /// Print a page of posts.
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,

        #[command(subcommand)]
        listing: ListingCommand,
    },
    /// Rebuild the taxonomy tree whenever the snapshot changes.
    Watch,
}

#[derive(Subcommand)]
enum ListingCommand {
    Home {
        #[arg(long)]
        keyword: Option<String>,
    },
    Category {
        slug: String,
    },
    Tag {
        slug: String,
    },
    Archive {
        year: i32,
        month: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Category,
    Tag,
    Link,
}

impl From<Kind> for TaxonomyType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Category => TaxonomyType::Post,
            Kind::Tag => TaxonomyType::Tag,
            Kind::Link => TaxonomyType::Link,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = SiteConfig::from_path(args.site.join("site.toml"))?;
    let cache = TaxonomyCache::new(JsonTaxonomyStore::new(args.site.join("taxonomies.json")));
    let visibility = Visibility::for_admin(args.admin);

    match args.command {
        Command::Tree { kind } => {
            let tree = cache.snapshot()?;

            for (depth, node) in tree.walk(kind.into(), visibility) {
                println!(
                    "{}{} ({}) [{}]",
                    "  ".repeat(depth),
                    node.name,
                    node.slug,
                    node.count
                );
            }
        }
        Command::Crumbs { slug, kind } => {
            let tree = cache.snapshot()?;
            let node = tree
                .get_by_slug(kind.into(), &slug)
                .with_context(|| format!("no taxonomy with slug '{slug}'"))?;
            let crumbs = resolve_path(&tree, &node.id, &AbsoluteUrls(&config))?;

            for crumb in crumbs.iter() {
                println!("{} -> {}", crumb.label, crumb.url);
            }
            println!("{}", render_to_string(&crumbs_template(&crumbs))?);
        }
        Command::List { page, listing } => {
            let tree = cache.snapshot()?;
            let posts = Posts::load(&args.site.join("posts.json"))?;
            let orchestrator = ListingOrchestrator::new(&config, &tree, posts);

            let listing = match listing {
                ListingCommand::Home { keyword } => {
                    orchestrator.posts(page, keyword.as_deref(), visibility)?
                }
                ListingCommand::Category { slug } => {
                    orchestrator.posts_by_category(&slug, page, visibility)?
                }
                ListingCommand::Tag { slug } => orchestrator.posts_by_tag(&slug, page, visibility)?,
                ListingCommand::Archive { year, month } => {
                    orchestrator.posts_by_archive(year, month, page, visibility)?
                }
            };

            print_listing(&listing)?;
        }
        Command::Watch => watch(cache).await?,
    }

    Ok(())
}

fn print_listing(listing: &Listing<Post>) -> Result<()> {
    println!("{}", listing.meta.title);
    if !listing.meta.description.is_empty() {
        println!("{}", listing.meta.description);
    }
    println!();

    for post in &listing.items {
        println!("  {}  {}", post.published, post.title);
        if !post.description.is_empty() {
            println!("              {}", post.description);
        }
    }

    println!();
    println!(
        "Page {} of {} ({} posts)",
        listing.paginator.current_page,
        listing.paginator.total_pages,
        listing.paginator.total_items
    );

    if !listing.crumbs.is_empty() {
        println!("{}", render_to_string(&crumbs_template(&listing.crumbs))?);
    }
    println!(
        "{}",
        render_to_string(&page_bar_template(&listing.paginator, &listing.page_links))?
    );

    Ok(())
}

async fn watch(cache: TaxonomyCache<JsonTaxonomyStore>) -> Result<()> {
    let tree = cache.snapshot()?;
    print_summary(&tree);

    let snapshot_path = cache.store().path().clone();
    let watch_path = snapshot_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_owned();

    let (watcher_tx, mut watcher_rx) = unbounded_channel();

    let mut watcher = RecommendedWatcher::new(
        move |result: notify::Result<Event>| match result {
            Ok(event) => {
                let _ = watcher_tx.send(event);
            }
            Err(err) => warn!(error = %err, "watch error"),
        },
        notify::Config::default(),
    )?;

    watcher.watch(&watch_path, RecursiveMode::NonRecursive)?;

    info!(path = %snapshot_path.display(), "watching taxonomy snapshot");

    let file_name = snapshot_path.file_name();
    while let Some(event) = watcher_rx.recv().await {
        let touches_snapshot = event
            .paths
            .iter()
            .any(|path| path.file_name() == file_name);

        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                if touches_snapshot =>
            {
                cache.invalidate();

                match cache.snapshot() {
                    Ok(tree) => print_summary(&tree),
                    Err(err) => warn!(error = %err, "no taxonomy tree to serve"),
                }
            }
            _ => {}
        }
    }

    Ok(())
}

fn print_summary(tree: &TaxonomyTree) {
    println!("{} taxonomies", tree.len());
    for taxonomy_type in [TaxonomyType::Post, TaxonomyType::Tag, TaxonomyType::Link] {
        println!("  {taxonomy_type}: {} at the root", tree.roots(taxonomy_type).len());
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PostRecord {
    title: String,
    published: String,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    taxonomies: Vec<TaxonomyId>,
    #[serde(default)]
    private: bool,
}

#[derive(Debug, Clone)]
struct Post {
    title: String,
    description: String,
    published: NaiveDate,
    taxonomies: Vec<TaxonomyId>,
    private: bool,
}

/// Posts read from a JSON file, newest first.
struct Posts(Vec<Post>);

impl Posts {
    fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
        let records: Vec<PostRecord> = serde_json::from_str(&contents)?;

        let mut posts = records
            .into_iter()
            .map(|record| {
                let published = NaiveDate::parse_from_str(&record.published, "%Y-%m-%d")
                    .with_context(|| format!("invalid date for '{}'", record.title))?;

                Ok(Post {
                    description: post_description(record.excerpt.as_deref(), &record.content),
                    title: record.title,
                    published,
                    taxonomies: record.taxonomies,
                    private: record.private,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        posts.sort_by(|a, b| b.published.cmp(&a.published));

        Ok(Self(posts))
    }

    fn matching<'a>(&'a self, filter: &'a PostFilter) -> impl Iterator<Item = &'a Post> {
        self.0.iter().filter(move |post| {
            if post.private && !filter.visibility.is_admin() {
                return false;
            }

            if let Some(keyword) = &filter.keyword {
                if !post.title.to_lowercase().contains(&keyword.to_lowercase()) {
                    return false;
                }
            }

            if let Some(ids) = &filter.taxonomy_ids {
                if !post.taxonomies.iter().any(|id| ids.contains(id)) {
                    return false;
                }
            }

            filter
                .archive
                .map_or(true, |period| period.contains(post.published))
        })
    }
}

impl PagedQuery for Posts {
    type Item = Post;
    type Filter = PostFilter;
    type Error = Infallible;

    fn count(&self, filter: &PostFilter) -> Result<usize, Infallible> {
        Ok(self.matching(filter).count())
    }

    fn fetch(
        &self,
        filter: &PostFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Post>, Infallible> {
        Ok(self
            .matching(filter)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
