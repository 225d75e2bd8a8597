use super::commands::IdentityAction;
use super::utils::print_json;
use creds_client::{IdentityRecord, IdentityStore, OutputFormat};
use creds_types::CredsResult;
use std::path::Path;

pub async fn handle_identity(
    action: IdentityAction,
    identities_dir: &Path,
    format: &OutputFormat,
) -> CredsResult<()> {
    let store = IdentityStore::open(identities_dir)?;

    match action {
        IdentityAction::Generate { secret, label } => {
            generate_identity(&store, secret.as_deref(), label, format)?
        }
        IdentityAction::List => list_identities(&store, format)?,
        IdentityAction::Show { id } => show_identity(&store, &id, format)?,
    }

    Ok(())
}

fn generate_identity(
    store: &IdentityStore,
    secret: Option<&str>,
    label: Option<String>,
    format: &OutputFormat,
) -> CredsResult<()> {
    let (record, path) = store.generate(secret, label)?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "id": record.id,
            "label": record.label,
            "commitment": record.commitment,
            "file": path.to_string_lossy(),
        }))?,
        OutputFormat::Text => {
            println!("Identity generated");
            println!("  ID:         {}", record.id);
            println!("  Label:      {}", record.label);
            println!("  Commitment: {}", record.commitment);
            println!("  File:       {}", path.display());
            println!();
            println!("Keep this file private: it holds the identity trapdoor and nullifier.");
        }
    }
    Ok(())
}

fn list_identities(store: &IdentityStore, format: &OutputFormat) -> CredsResult<()> {
    let records = store.list()?;

    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = records.iter().map(summary).collect();
            print_json(&serde_json::json!({
                "count": entries.len(),
                "identities": entries,
            }))?;
        }
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No identities found in {}", store.dir().display());
                println!("Run `creds identity generate` to create one.");
                return Ok(());
            }
            println!("{:<18} {:<24} {}", "ID", "LABEL", "CREATED");
            for record in &records {
                println!("{:<18} {:<24} {}", record.id, record.label, record.created_at);
            }
        }
    }
    Ok(())
}

fn show_identity(store: &IdentityStore, id: &str, format: &OutputFormat) -> CredsResult<()> {
    let record = store.load(id)?;
    let intact = record.identity().is_ok();

    match format {
        OutputFormat::Json => {
            let mut output = summary(&record);
            output["commitment_matches"] = serde_json::json!(intact);
            print_json(&output)?;
        }
        OutputFormat::Text => {
            println!("ID:         {}", record.id);
            println!("Label:      {}", record.label);
            println!("Commitment: {}", record.commitment);
            println!("Created:    {}", record.created_at);
            println!("Status:     {}", if intact { "ok" } else { "commitment mismatch" });
        }
    }
    Ok(())
}

fn summary(record: &IdentityRecord) -> serde_json::Value {
    serde_json::json!({
        "id": record.id,
        "label": record.label,
        "commitment": record.commitment,
        "created_at": record.created_at,
    })
}
