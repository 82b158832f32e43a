// Copyright 2023 Remi Bernotavicius

use clap::Parser;
use clap::Subcommand;
use foodgram::database::models::UserId;
use foodgram::{database, import, ops, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Path to the database file. Defaults to the per-user data directory.
    #[arg(long)]
    database: Option<PathBuf>,
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load an ingredient catalog from a JSON file.
    ImportIngredients { path: PathBuf },
    /// Load a tag catalog from a JSON file.
    ImportTags { path: PathBuf },
    /// Register a user.
    AddUser {
        email: String,
        username: String,
        first_name: String,
        last_name: String,
    },
    /// Write the aggregated shopping list of a user to a text file.
    ExportShoppingList {
        user_id: i32,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Look up the recipe behind a short-link code.
    Resolve { code: String },
}

/// This is where the database and other user-data lives on-disk. On Linux it should be like:
/// `~/.local/share/foodgram/`
fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().expect("failed to get user home directory");
    let path = dirs.data_dir().join("foodgram");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

fn export_shopping_list(
    conn: &mut database::Connection,
    user: UserId,
    output: Option<PathBuf>,
) -> Result<()> {
    let entries = ops::shopping_list::build_shopping_list(conn, user)?;
    let path = match output {
        Some(path) => path,
        None => {
            let dir = data_path()?.join("shopping-lists");
            std::fs::create_dir_all(&dir)?;
            dir.join("shopping-list.txt")
        }
    };
    std::fs::write(&path, ops::shopping_list::render_shopping_list(&entries))?;
    println!("wrote {} entries to {}", entries.len(), path.display());
    Ok(())
}

fn main() -> Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .init()?;

    let args = Args::parse();
    let database_path = match &args.database {
        Some(path) => path.clone(),
        None => data_path()?.join("foodgram.sqlite"),
    };
    let mut conn = database::establish_connection(database_path)?;
    match args.commands {
        Commands::ImportIngredients { path } => import::import_ingredients(&mut conn, path)?,
        Commands::ImportTags { path } => import::import_tags(&mut conn, path)?,
        Commands::AddUser {
            email,
            username,
            first_name,
            last_name,
        } => {
            let user =
                ops::account::register_user(&mut conn, &email, &username, &first_name, &last_name)?;
            println!("created user {} with id {}", user.username, user.id);
        }
        Commands::ExportShoppingList { user_id, output } => {
            export_shopping_list(&mut conn, UserId::new(user_id), output)?
        }
        Commands::Resolve { code } => {
            let recipe = ops::short_link::resolve(&mut conn, &code)?;
            println!("{recipe}");
        }
    }
    Ok(())
}
