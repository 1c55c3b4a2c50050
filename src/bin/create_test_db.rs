use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use ytracker_rs::{DataStore, get_local_today, initialize_db};

/// A utility for creating a test database for the REST API server of ytracker_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// A JSON snapshot saved by the local data store to import instead of the sample data.
    #[arg(long, short)]
    snapshot: Option<PathBuf>,

    /// The canonical name of the timezone used to decide what "today" is.
    #[arg(long, default_value = "Asia/Kuala_Lumpur")]
    timezone: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    let today = get_local_today(&args.timezone)?;

    let store = match &args.snapshot {
        Some(snapshot_path) => {
            println!("Loading snapshot from {snapshot_path:#?}...");
            DataStore::load(snapshot_path, today)?
        }
        None => {
            println!("Using sample data...");
            DataStore::sample(today)?
        }
    };

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!(
        "Importing {} members, {} transactions and {} card transactions...",
        store.members().len(),
        store.transactions().len(),
        store.card_transactions().len()
    );
    store.import_into(&conn)?;

    println!("Success!");

    Ok(())
}
