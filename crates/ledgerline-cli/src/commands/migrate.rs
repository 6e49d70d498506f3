use anyhow::{Context, Result};
use std::path::PathBuf;

use ledgerline_core::hooks::default_hooks;
use ledgerline_core::model::RawDataset;
use ledgerline_core::schema::Database;
use ledgerline_etl::{build_pipeline, Config, MigrationJob, STAGES};

/// Run the full migration workflow.
///
/// Steps:
/// 1. Schema - create missing tables, reject incompatible ones
/// 2. Clean - factor genre text, drop orphaned rows in dependency order
/// 3. Normalize - dedup, trim, validate, normalize dates, publish
/// 4. Guard - install the integrity and audit hooks
pub async fn run_migrate(config: &Config, snapshot: Option<PathBuf>) -> Result<()> {
    let db_path = &config.database_path;

    println!("\n🎵 Ledgerline Migration\n");
    println!("  Database: {}", db_path.display());

    if let Some(snapshot) = snapshot {
        println!("  Snapshot: {}", snapshot.display());
        let dataset = RawDataset::load(&snapshot)
            .with_context(|| format!("Failed to read snapshot {}", snapshot.display()))?;
        let mut db = Database::open(db_path)?;
        let loaded = db.load_raw(&dataset).context("Failed to load snapshot")?;
        println!("  Loaded {loaded} raw rows");
    }
    println!("  Stages: {}\n", STAGES.join(" → "));

    let workflow = build_pipeline(db_path.clone()).context("Failed to build pipeline")?;

    let state_path = config.state_store_path();
    let mut store = treadle::SqliteStateStore::open(&state_path)
        .await
        .context("Failed to open pipeline state store")?;

    let job = MigrationJob::new(db_path.clone());
    log::debug!("Starting migration job {}", job);

    // Subscribe to events for progress display
    let mut events = workflow.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                treadle::WorkflowEvent::StageStarted { stage, .. } => {
                    println!("  ⏳ [{stage}] Starting...");
                }
                treadle::WorkflowEvent::StageCompleted { stage, .. } => {
                    println!("  ✓ [{stage}] Complete");
                }
                treadle::WorkflowEvent::StageFailed { stage, error, .. } => {
                    eprintln!("  ✗ [{stage}] FAILED: {error}");
                }
                _ => {}
            }
        }
    });

    workflow
        .advance(&job, &mut store)
        .await
        .context("Pipeline execution failed")?;

    // The guard stage runs last; its hooks are the mark of a finished run.
    let db = Database::connect(db_path)?;
    let installed = db.triggers()?;
    let missing: Vec<String> = default_hooks()
        .iter()
        .map(|hook| hook.name())
        .filter(|name| !installed.contains(name))
        .collect();
    if !missing.is_empty() {
        anyhow::bail!(
            "Migration did not complete; missing hooks: {}",
            missing.join(", ")
        );
    }

    println!("\n✓ Migration complete!");
    println!(
        "  {} genres, {} artists, {} albums, {} tracks",
        db.count("genres")?,
        db.count("artists")?,
        db.count("albums")?,
        db.count("tracks")?
    );
    println!("\nNext steps:");
    println!("  - Run 'ledgerline status' to inspect the store");
    println!("  - Run 'ledgerline log' to follow changes to artists");

    Ok(())
}
