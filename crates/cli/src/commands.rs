//! Command handlers over a [`Session`].

use std::ops::ControlFlow;

use anyhow::{bail, Context, Result};
use serde_json::json;

use marquee_core::metrics::encode_metrics;
use marquee_core::{
    BrowseQuery, Config, CredentialStatus, ListName, SanitizedConfig, ServiceHealth, Session,
    SortKey,
};

use crate::render;
use crate::{BrowseArgs, CacheAction, Command, ThemeAction};

pub async fn dispatch(session: &Session, config: &Config, command: Command) -> Result<()> {
    match command {
        Command::Libraries => libraries(session).await,
        Command::Browse(args) => browse(session, args).await,
        Command::Show { id } => show(session, id).await,
        Command::Facets { library } => facets(session, library.as_deref()).await,
        Command::Favorite { id } => toggle(session, ListName::Favorites, id),
        Command::WatchLater { id } => toggle(session, ListName::WatchLater, id),
        Command::Lists => lists(session),
        Command::Login { credential } => login(session, &credential).await,
        Command::Logout => {
            session.settings().set_credential("");
            println!("Credential cleared");
            Ok(())
        }
        Command::Cache { action } => cache(session, config, action).await,
        Command::Health { watch } => health(session, watch).await,
        Command::Theme { action } => theme(session, action),
        Command::Config => {
            let sanitized = SanitizedConfig::new(config, session.settings().credential().is_some());
            println!("{}", serde_json::to_string_pretty(&sanitized)?);
            Ok(())
        }
        Command::Stats => {
            load(session).await?;
            print!("{}", encode_metrics());
            Ok(())
        }
    }
}

async fn load(session: &Session) -> Result<()> {
    session
        .start()
        .await
        .context("Failed to load libraries")?;
    Ok(())
}

fn select(session: &Session, library: Option<&str>) -> Result<()> {
    if let Some(key) = library {
        if !session.select_library(key) {
            bail!("No library with key '{}'", key);
        }
    }
    Ok(())
}

async fn libraries(session: &Session) -> Result<()> {
    load(session).await?;

    let catalog = session.catalog().catalog();
    if catalog.is_empty() {
        println!("No libraries");
    }
    for library in catalog.iter() {
        println!("{}\t{}\t{} items", library.key, library.name, library.items.len());
    }
    println!("{}", render::catalog_source(session.catalog()));
    Ok(())
}

async fn browse(session: &Session, args: BrowseArgs) -> Result<()> {
    load(session).await?;
    select(session, args.library.as_deref())?;

    session.set_browse_query(
        BrowseQuery::new()
            .with_query(args.query)
            .with_genre(args.genre)
            .with_content_rating(args.rating)
            .with_sort(SortKey::from(args.sort.as_str())),
    );
    let items = session.visible_items();

    let posters = if args.posters {
        Some(session.posters().resolve_all(&items).await)
    } else {
        None
    };
    let poster_for = |index: usize| posters.as_ref().map(|p| p[index].1.as_str());

    let ledger = session.ledger();
    if args.json {
        let rows: Vec<_> = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                json!({
                    "id": item.id,
                    "title": item.metadata.display_title(),
                    "year": item.metadata.year,
                    "rating": item.metadata.rating,
                    "contentRating": item.metadata.content_rating,
                    "genres": item.metadata.genre_names(),
                    "favorite": ledger.contains(ListName::Favorites, item.id),
                    "watchLater": ledger.contains(ListName::WatchLater, item.id),
                    "poster": poster_for(index),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No items match");
    }
    for (index, item) in items.iter().enumerate() {
        println!(
            "{}",
            render::card(
                item,
                ledger.contains(ListName::Favorites, item.id),
                ledger.contains(ListName::WatchLater, item.id),
                poster_for(index),
            )
        );
    }
    Ok(())
}

async fn show(session: &Session, id: u64) -> Result<()> {
    load(session).await?;

    let catalog = session.catalog().catalog();
    let item = catalog
        .iter()
        .flat_map(|library| library.items.iter())
        .find(|item| item.id == id)
        .with_context(|| format!("No item with id {}", id))?;

    print!("{}", render::detail(item));
    println!("  poster: {}", session.posters().resolve_item(item).await);
    Ok(())
}

async fn facets(session: &Session, library: Option<&str>) -> Result<()> {
    load(session).await?;
    select(session, library)?;

    let facets = session.facets();
    println!("genres: {}", facets.genres.join(", "));
    println!("content ratings: {}", facets.content_ratings.join(", "));
    Ok(())
}

fn toggle(session: &Session, list: ListName, id: u64) -> Result<()> {
    if session.toggle(list, id) {
        println!("Added {} to {}", id, list);
    } else {
        println!("Removed {} from {}", id, list);
    }
    Ok(())
}

fn lists(session: &Session) -> Result<()> {
    for list in [ListName::Favorites, ListName::WatchLater] {
        let ids: Vec<String> = session
            .ledger()
            .ids(list)
            .iter()
            .map(|id| id.to_string())
            .collect();
        println!("{}: {}", list, ids.join(", "));
    }
    Ok(())
}

async fn login(session: &Session, credential: &str) -> Result<()> {
    match session.login(credential).await {
        CredentialStatus::Valid => {
            println!("Credential accepted");
            Ok(())
        }
        CredentialStatus::Invalid { status } => {
            bail!("Credential rejected (HTTP {}); nothing was stored", status)
        }
        CredentialStatus::Unreachable { message } => {
            bail!("Could not reach the service: {}", message)
        }
    }
}

async fn cache(session: &Session, config: &Config, action: CacheAction) -> Result<()> {
    match action {
        CacheAction::Usage => {
            println!(
                "{}",
                render::usage(&session.usage_report(), config.store.quota_bytes)
            );
        }
        CacheAction::Clear { credential } => {
            let catalog = session
                .clear_cache(credential)
                .await
                .context("Cache cleared, but reloading failed")?;
            println!("Cache cleared; reloaded {} libraries", catalog.len());
        }
    }
    Ok(())
}

async fn health(session: &Session, watch: bool) -> Result<()> {
    let monitor = session.health_monitor();
    if !watch {
        let health = monitor.check().await;
        println!("{}", health_label(health));
        return Ok(());
    }

    monitor
        .run(|health| {
            println!("{}", health_label(health));
            ControlFlow::Continue(())
        })
        .await;
    Ok(())
}

fn health_label(health: ServiceHealth) -> &'static str {
    match health {
        ServiceHealth::Online => "online",
        ServiceHealth::Degraded => "degraded",
        ServiceHealth::Offline => "offline",
    }
}

fn theme(session: &Session, action: Option<ThemeAction>) -> Result<()> {
    let preference = session.theme();
    let theme = match action {
        None => preference.load(),
        Some(ThemeAction::Toggle) => preference.toggle(),
        Some(ThemeAction::Dark) => {
            preference.set(marquee_core::Theme::Dark);
            marquee_core::Theme::Dark
        }
        Some(ThemeAction::Light) => {
            preference.set(marquee_core::Theme::Light);
            marquee_core::Theme::Light
        }
    };
    println!("{}", theme);
    Ok(())
}
