use anyhow::Result;
use ledgerline_core::normalize::normalize_date as normalize;

pub fn normalize_date(raw: &str) -> Result<()> {
    match normalize(raw) {
        Some(date) => println!("{date}"),
        None => anyhow::bail!("Cannot normalize {raw:?}: expected M/D/YY"),
    }
    Ok(())
}
