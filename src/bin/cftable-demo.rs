//! Walks through every client operation against an in-process store.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use cftable::{
    Action, BatchOutcome, ClientConfig, Delete, Get, MemoryStore, Put, Result, Scan, TableClient,
};

#[derive(Debug, Parser)]
#[command(name = "cftable-demo", about = "Exercise the table client against an in-memory store")]
struct Args {
    /// YAML site file; settings not given fall back to CFTABLE_* variables
    #[arg(long)]
    site_file: Option<PathBuf>,

    /// Table to create and write to
    #[arg(long, default_value = "userinfo")]
    table: String,

    /// Column family of the table
    #[arg(long, default_value = "vio1")]
    family: String,

    /// Rows fetched per scanner round trip
    #[arg(long)]
    caching: Option<usize>,
}

fn print_scan(client: &TableClient, table: &str, caching: Option<usize>) -> Result<()> {
    println!("scanning {}", table);
    let mut scan = Scan::new();
    if let Some(rows) = caching {
        scan = scan.caching(rows);
    }
    for result in client.scan(table, scan)? {
        for cell in &result? {
            println!("{}", cell);
        }
    }
    println!("scan done");
    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let config = match &args.site_file {
        Some(path) => ClientConfig::from_site_file(path)?,
        None => ClientConfig::from_env()?,
    };
    tracing::info!(quorum = %config.coordination_address(), "using configuration");

    let client = TableClient::new(config, Arc::new(MemoryStore::new()))?;
    let table = args.table.as_str();
    let family = args.family.as_bytes();

    println!("create {}: {:?}", table, client.create_table(table, family)?);
    println!("create {} again: {:?}", table, client.create_table(table, family)?);

    let mut puts = Vec::new();
    for row in ["row1", "row2"] {
        for i in 1..=5 {
            puts.push(Put::new(row).add_column(family, format!("col{}", i), format!("Hello{}", i)));
        }
    }
    let failed = client
        .put_batch(table, puts)?
        .into_iter()
        .filter(|r| r.is_err())
        .count();
    println!("batched puts, {} failed", failed);

    let results = client.batch_get(table, &[Get::new("row1"), Get::new("row2"), Get::new("row9")])?;
    for outcome in &results {
        let result = match outcome {
            Ok(result) => result,
            Err(err) => {
                println!("lookup failed: {}", err);
                continue;
            }
        };
        match result.row() {
            Some(row) => println!(
                "row {}: col1={}",
                String::from_utf8_lossy(row),
                result
                    .value(family, b"col1")
                    .map(String::from_utf8_lossy)
                    .unwrap_or_default()
            ),
            None => println!("(missing row)"),
        }
    }

    let branch = [
        Action::from(Put::new("row1").add_column(family, "col1", "hello1")),
        Action::from(Put::new("row1").add_column(family, "col2", "hello2")),
        Action::from(Get::new("row1").add_column(family, "col1")),
        Action::from(Get::new("row1").add_column(family, "col9")),
        Action::from(Delete::new("row1").add_columns(family, "col3")),
    ];
    for (i, outcome) in client.batch(table, &branch)?.iter().enumerate() {
        match outcome {
            Ok(BatchOutcome::Fetched(result)) if result.is_empty() => {
                println!("result[{}]: empty", i)
            }
            Ok(BatchOutcome::Fetched(result)) => {
                println!("result[{}]: {} cells", i, result.len())
            }
            Ok(BatchOutcome::Applied) => println!("result[{}]: applied", i),
            Err(err) => println!("result[{}]: {}", i, err),
        }
    }

    print_scan(&client, table, args.caching)?;

    let applied = client.check_and_put(
        table,
        "row1",
        family,
        "col1",
        Some(&b"hello1"[..]),
        Put::new("row1").add_column(family, "col1", "checked"),
    )?;
    println!("check and put applied: {}", applied);

    let applied = client.check_and_delete(
        table,
        "row1",
        family,
        "col2",
        Some(&b"not-there"[..]),
        Delete::new("row1").add_columns(family, "col2"),
    )?;
    println!("check and delete applied: {}", applied);

    for cell in client.column_versions(table, "row1", family, "col1")? {
        println!("col1@{}: {}", cell.timestamp(), String::from_utf8_lossy(cell.value()));
    }

    client.delete_cells(table, "row1", Some(family), Some(&b"col4"[..]))?;
    client.delete_batch(table, vec![Delete::new("row2")])?;
    print_scan(&client, table, args.caching)?;

    Ok(())
}
