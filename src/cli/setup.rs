use anyhow::{Result, bail};
use console::style;

use crate::core::config::{AppConfig, data_dir};
use crate::core::store::CouncilStore;
use crate::core::terminal::{print_status, print_success, print_warn};

pub async fn run_init() -> Result<()> {
    let dir = data_dir();
    let (path, written) = AppConfig::write_default(&dir).await?;
    if written {
        print_success("Default configuration written.");
    } else {
        print_warn("A configuration file already exists; left untouched.");
    }
    print_status("Config", &path.display().to_string());

    CouncilStore::open(&dir).await?;
    print_status("Database", &dir.join(crate::core::config::DB_FILE).display().to_string());
    Ok(())
}

/// Mints a token straight into the local store. The raw value is shown once.
pub async fn run_token_create(owner: &str, name: &str) -> Result<()> {
    let owner = owner.trim();
    if owner.is_empty() {
        println!(
            "{}",
            style("Usage: pmcouncil token create --owner <id> [--name <label>]").bold()
        );
        bail!("--owner is required");
    }

    let store = CouncilStore::open(data_dir()).await?;
    let (raw_token, record) = store.create_api_token(owner, name.trim()).await?;
    print_success(&format!("Token '{}' created for {}", record.name, record.owner_id));
    println!("\n  {}\n", style(&raw_token).bold().yellow());
    println!("  Save the token value - it will not be shown again.");
    Ok(())
}
