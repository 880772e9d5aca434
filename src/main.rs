use poseseek::catalogue::{CatalogueEntry, DescriptionStore, InMemoryCatalogue, SqliteCatalogue};
use poseseek::cli::{Cli, Commands, ConfigAction, ModeArg};
use poseseek::config::{Config, ConfigValidator};
use poseseek::embedding::build_embedder;
use poseseek::error::{PoseSeekError, Result};
use poseseek::index::{IndexBuilder, IndexHandle, NO_NEIGHBOR};
use poseseek::rerank::build_reranker;
use poseseek::search::{CollaboratorTimeouts, SearchOrchestrator, SearchRequest, SearchResponse};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Search {
            query,
            mode,
            top_k,
            min_similarity,
            stage1_k,
            page,
            page_size,
            max_distance,
            json,
        } => {
            let config = load_config(cli.config, cli.profile)?;
            let search_mode =
                mode.into_mode(top_k, min_similarity, stage1_k, page, page_size, max_distance);
            cmd_search(config, SearchRequest::new(query, search_mode), mode, json).await?;
        }
        Commands::BuildIndex { catalogue } => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_build_index(config, catalogue).await?;
        }
        Commands::Status => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_status(config);
        }
        Commands::Raw { query, k } => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_raw(config, &query, k).await?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "poseseek=debug" } else { "poseseek=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    let mut config = if path.exists() {
        match profile {
            Some(profile) => Config::load_with_profile(&path, &profile)?,
            None => Config::load(&path)?,
        }
    } else {
        tracing::warn!(
            "Config file not found, using defaults. Run 'poseseek config init' to create one."
        );
        let mut config = Config::default();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        config
    };

    config.resolve_paths()?;
    Ok(config)
}

/// Wire up the orchestrator; missing collaborators leave search unavailable
/// rather than failing startup.
fn build_orchestrator(config: &Config) -> (SearchOrchestrator, Option<Arc<SqliteCatalogue>>) {
    let timeouts =
        CollaboratorTimeouts::from_secs(config.embedding.timeout_secs, config.reranker.timeout_secs);
    let mut orchestrator = SearchOrchestrator::new(config.retrieval.clone(), timeouts);

    match IndexHandle::load(&config.index) {
        Ok(handle) => orchestrator = orchestrator.with_index(Arc::new(handle)),
        Err(e) => tracing::warn!("Vector index unavailable: {}", e),
    }

    match build_embedder(&config.embedding, config.index.vector_dim) {
        Ok(embedder) => orchestrator = orchestrator.with_embedder(embedder),
        Err(e) => tracing::warn!("Embedder unavailable: {}", e),
    }

    match build_reranker(&config.reranker) {
        Ok(Some(reranker)) => {
            tracing::info!("Reranker enabled: {}", reranker.model_name());
            orchestrator = orchestrator.with_reranker(reranker, config.reranker.acceptance_floor);
        }
        Ok(None) => tracing::debug!("Reranker disabled"),
        Err(e) => tracing::warn!(
            "Reranker unavailable, multi-stage search will use recall order: {}",
            e
        ),
    }

    let catalogue = match SqliteCatalogue::open(&config.catalogue.database_path) {
        Ok(catalogue) => {
            let catalogue = Arc::new(catalogue);
            orchestrator = orchestrator.with_descriptions(catalogue.clone());
            Some(catalogue)
        }
        Err(e) => {
            tracing::warn!("Catalogue unavailable: {}", e);
            None
        }
    };

    (orchestrator, catalogue)
}

async fn cmd_search(
    config: Config,
    request: SearchRequest,
    mode: ModeArg,
    json: bool,
) -> Result<()> {
    let (orchestrator, catalogue) = build_orchestrator(&config);
    tracing::debug!("Running {:?} search for {:?}", mode, request.query);

    let response = orchestrator.execute(&request).await?;

    if json {
        let out = serde_json::to_string_pretty(&response).map_err(|e| PoseSeekError::Json {
            source: e,
            context: "Failed to serialize search response".to_string(),
        })?;
        println!("{}", out);
        return Ok(());
    }

    print_response(&response, catalogue.as_deref());
    Ok(())
}

fn print_response(response: &SearchResponse, catalogue: Option<&SqliteCatalogue>) {
    let info = &response.info;

    if !info.available {
        println!("⚠ Search unavailable");
    }

    for (rank, result) in response.results.iter().enumerate() {
        let title = catalogue
            .and_then(|c| c.title(result.entity_id).ok().flatten())
            .unwrap_or_else(|| "(untitled)".to_string());
        println!(
            "{:>3}. #{:<6} {:.3}  {}",
            rank + 1,
            result.entity_id,
            result.score,
            title
        );
    }

    println!();
    println!("Results: {}", response.total);
    if let Some(page) = &response.page {
        println!(
            "Page {} (size {}), more: {}",
            page.page, page.page_size, page.has_next
        );
    }
    if let Some(tier) = info.tier {
        println!("Tier: {:?}", tier);
    }
    if let Some(threshold) = info.applied_threshold {
        println!("Threshold: {:.3}", threshold);
    }
    if !info.stages.is_empty() {
        let stages: Vec<String> = info
            .stages
            .iter()
            .map(|s| format!("{}={}", s.stage, s.count))
            .collect();
        println!("Stages: {}", stages.join(", "));
    }
    for warning in &info.warnings {
        println!("⚠ {}", warning);
    }
    if let Some(suggestion) = &info.suggestion {
        println!("{}", suggestion);
    }
}

async fn cmd_build_index(config: Config, catalogue_file: Option<PathBuf>) -> Result<()> {
    let entries: Vec<CatalogueEntry> = match catalogue_file {
        Some(path) => InMemoryCatalogue::load_json(&path)?.entries(),
        None => SqliteCatalogue::open(&config.catalogue.database_path)?.active_entries()?,
    };

    if entries.is_empty() {
        println!("Catalogue is empty, nothing to index");
        return Ok(());
    }

    let embedder = build_embedder(&config.embedding, config.index.vector_dim)?;
    let report = IndexBuilder::new(embedder).build(&entries).await?;
    report.save(&config.index.index_path, &config.index.id_map_path)?;

    println!("✓ Indexed {} catalogue entries", report.indexed());
    println!("  Index:  {}", config.index.index_path.display());
    println!("  ID map: {}", config.index.id_map_path.display());
    if !report.skipped.is_empty() {
        println!("  Skipped {} entries with no text", report.skipped.len());
    }
    println!("  Took {}ms", report.duration_ms);

    Ok(())
}

fn cmd_status(config: Config) {
    let index = IndexHandle::load(&config.index);
    let embedder = build_embedder(&config.embedding, config.index.vector_dim);

    println!("PoseSeek Status");
    println!("===============");
    println!(
        "\nIndex file:   {} ({})",
        config.index.index_path.display(),
        present(config.index.index_path.exists())
    );
    println!(
        "ID map file:  {} ({})",
        config.index.id_map_path.display(),
        present(config.index.id_map_path.exists())
    );

    match &index {
        Ok(handle) => {
            println!("\nIndex:     loaded ({} backend)", handle.backend());
            println!("  Vectors:   {}", handle.len());
            println!("  Dimension: {}", handle.dimension());
            println!("  Mapped:    {}", handle.id_map().len());
        }
        Err(e) => println!("\nIndex:     unavailable ({})", e),
    }

    match &embedder {
        Ok(embedder) => println!(
            "Embedder:  {} ({}D)",
            embedder.model_name(),
            embedder.dimension()
        ),
        Err(e) => println!("Embedder:  unavailable ({})", e),
    }

    println!(
        "Reranker:  {}",
        if config.reranker.enabled {
            format!("{} ({})", config.reranker.provider, config.reranker.model)
        } else {
            "disabled".to_string()
        }
    );
    println!("Policy:    {}", config.retrieval.similarity_policy);

    let ready = index.is_ok() && embedder.is_ok();
    println!("\nSearch:    {}", if ready { "ready" } else { "unavailable" });
}

fn present(exists: bool) -> &'static str {
    if exists {
        "present"
    } else {
        "missing"
    }
}

async fn cmd_raw(config: Config, query: &str, k: usize) -> Result<()> {
    let handle = IndexHandle::load(&config.index)?;
    let embedder = build_embedder(&config.embedding, config.index.vector_dim)?;
    let policy = config.retrieval.similarity_policy;

    let timeout = std::time::Duration::from_secs(config.embedding.timeout_secs);
    let vector = tokio::time::timeout(timeout, embedder.embed(query))
        .await
        .map_err(|_| PoseSeekError::Other(anyhow::anyhow!("Embedding timed out")))??;
    let neighbors = handle.search(&vector, k)?;

    println!("Raw recall for {:?} ({} policy)", query, policy);
    println!(
        "{:>4}  {:>8}  {:>8}  {:>10}  {:>10}",
        "rank", "position", "entity", "distance", "similarity"
    );
    for (rank, neighbor) in neighbors
        .iter()
        .filter(|n| n.position != NO_NEIGHBOR)
        .enumerate()
    {
        let entity = handle
            .entity_id(neighbor.position)
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "{:>4}  {:>8}  {:>8}  {:>10.4}  {:>10.4}",
            rank + 1,
            neighbor.position,
            entity,
            neighbor.distance,
            policy.similarity(neighbor.distance)
        );
    }

    Ok(())
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, profile)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| PoseSeekError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}
