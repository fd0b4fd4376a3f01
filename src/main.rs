use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, bail, eyre};
use std::path::PathBuf;
use todostore::{Task, TaskStore, snapshot};

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "To-do list with manual ordering, backed by SQLite")]
#[command(version)]
struct Cli {
    /// Path to the store directory (default: user data directory)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task at the end of the list
    Add {
        title: String,
        description: String,
    },

    /// List all tasks in order
    List {
        /// Emit JSON instead of the table
        #[arg(long)]
        json: bool,
    },

    /// Flip a task's completion flag
    Toggle { id: String },

    /// Attach an image file to a task (replaces any existing one)
    Attach { id: String, file: PathBuf },

    /// Remove a task's attached image
    Detach { id: String },

    /// Delete one task
    Rm { id: String },

    /// Delete every task
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Move the task at one position to another
    Move { from: i32, to: i32 },

    /// Export all tasks to a JSONL snapshot file
    Export { file: PathBuf },

    /// Replace all tasks with the contents of a JSONL snapshot file
    Import { file: PathBuf },
}

fn main() -> Result<()> {
    // Setup tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let store_path = match cli.store_path {
        Some(path) => path,
        None => dirs::data_dir().ok_or_else(|| eyre!("Could not determine user data directory"))?,
    };
    let mut store = TaskStore::open(&store_path)?;

    match cli.command {
        Commands::Add { title, description } => {
            // The store accepts anything; the non-empty rule lives here.
            let title = title.trim();
            let description = description.trim();
            if title.is_empty() || description.is_empty() {
                bail!("Title and description must not be empty");
            }

            let task = store.create(title, description)?;
            println!("Added {} ({})", task.title.bold(), task.id);
        }
        Commands::List { json } => {
            let tasks = store.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else if tasks.is_empty() {
                println!("Your to-do list is empty. Add an item with `todostore add`.");
            } else {
                for task in &tasks {
                    print_task(task);
                }
            }
        }
        Commands::Toggle { id } => {
            let task = store.toggle_completed(&id)?;
            let state = if task.completed { "completed" } else { "open" };
            println!("{} is now {}", task.title.bold(), state);
        }
        Commands::Attach { id, file } => {
            let bytes = std::fs::read(&file)?;
            let task = store.attach_image(&id, &bytes)?;
            println!("Attached {} bytes to {}", bytes.len(), task.title.bold());
        }
        Commands::Detach { id } => {
            let task = store.clear_image(&id)?;
            println!("Removed image from {}", task.title.bold());
        }
        Commands::Rm { id } => {
            store.delete_one(&id)?;
            println!("Deleted {}", id);
        }
        Commands::Clear { yes } => {
            if store.is_empty()? {
                println!("There are no tasks to delete.");
            } else if yes || confirm("Delete all tasks?")? {
                let removed = store.delete_all()?;
                println!("Deleted {} task(s)", removed);
            }
        }
        Commands::Move { from, to } => {
            store.reorder(from, to)?;
            println!("Moved task from position {} to {}", from, to);
        }
        Commands::Export { file } => {
            let count = snapshot::export(&store, &file)?;
            println!("Exported {} task(s) to {}", count, file.display());
        }
        Commands::Import { file } => {
            let count = snapshot::import(&mut store, &file)?;
            println!("Imported {} task(s) from {}", count, file.display());
        }
    }

    Ok(())
}

fn print_task(task: &Task) {
    let mark = if task.completed {
        "✓".green()
    } else {
        " ".normal()
    };
    let camera = if task.has_image() { " [img]" } else { "" };
    let created = chrono::DateTime::from_timestamp_millis(task.created_at)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    println!(
        "{:>3} [{}] {}{} {} {}",
        task.sort_index,
        mark,
        task.title.bold(),
        camera.dimmed(),
        task.description,
        format!("({}, {})", task.id, created).dimmed()
    );
}

fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;

    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
