use clap::{Args, Parser, Subcommand};

use minnowdb::database::{Database, DbConfig};

#[derive(Parser)]
#[command(name = "MinnowDB")]
#[command(about = "Teaching-grade relational database storage and execution core", long_about = None)]
#[command(version = "0.1.0")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run(CommandArgs),
}

#[derive(Args)]
struct CommandArgs {
    #[arg(short = 'D', long)]
    database_file_path: String,

    #[arg(long, default_value_t = 64)]
    pool_size: usize,

    #[arg(long, default_value_t = 2)]
    replacer_k: usize,

    /// Open the page file with O_DSYNC.
    #[arg(long)]
    sync_on_write: bool,

    /// Open the page file with O_DIRECT, bypassing the OS page cache.
    #[arg(long)]
    direct_io: bool,
}

fn main() -> minnowdb::error::DatabaseResult<()> {
    simple_logger::init_with_level(log::Level::Info).unwrap();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(CommandArgs {
            database_file_path,
            pool_size,
            replacer_k,
            sync_on_write,
            direct_io,
        }) => {
            let config = DbConfig {
                pool_size,
                replacer_k,
                sync_on_write,
                direct_io,
                ..DbConfig::default()
            };
            let db = Database::open(&database_file_path, config)?;

            log::info!("File path: {database_file_path}");
            log::info!(
                "Buffer pool: {} frames of {} bytes (LRU-{})",
                db.bpm.pool_size(),
                db.bpm.page_size(),
                replacer_k
            );
        }
    }

    Ok(())
}
