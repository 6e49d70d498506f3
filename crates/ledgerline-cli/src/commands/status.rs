use anyhow::Result;
use ledgerline_core::schema::Database;
use std::path::Path;

pub fn show_status(db_path: &Path) -> Result<()> {
    let db = Database::open(db_path)?;
    let raw = db.raw_counts()?;

    println!("\n📊 Ledgerline Status\n");
    println!("  Database: {}", db_path.display());

    println!("\n  Staging:");
    println!("    genres:  {}", raw.genres);
    println!("    artists: {}", raw.artists);
    println!("    albums:  {}", raw.albums);
    println!("    tracks:  {}", raw.tracks);

    println!("\n  Normalized:");
    for table in ["genres", "artists", "albums", "tracks"] {
        println!("    {:<8} {}", format!("{table}:"), db.count(table)?);
    }
    println!("    log:     {}", db.count("operation_log")?);

    let triggers = db.triggers()?;
    println!("\n  Hooks: {}", triggers.len());
    for name in &triggers {
        println!("    - {name}");
    }

    if raw.total() > 0 && db.count("artists")? == 0 {
        println!("\n  Run `ledgerline migrate` to normalize the staged rows");
    }

    Ok(())
}
