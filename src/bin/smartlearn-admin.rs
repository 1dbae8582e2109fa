use clap::{Parser, Subcommand};

use smartlearn_server::{
    app_state::Repositories,
    auth::hash_password,
    config::Config,
    db::Database,
    errors::{AppError, AppResult},
    ops::{
        cluster::{self, InitiateOutcome},
        seed::{self, SeedPasswords},
    },
};

#[derive(Parser)]
#[command(name = "smartlearn-admin")]
#[command(about = "SmartLearn operations: sample data and cluster bootstrap")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Populate the database with sample users, courses, materials and activities")]
    Seed {
        #[arg(long, help = "Clear existing collections first")]
        reset: bool,
    },

    #[command(about = "Describe or initiate the campus-sharded replica sets")]
    InitCluster {
        #[arg(long, help = "Send replSetInitiate to each replica set")]
        apply: bool,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Seed { reset } => run_seed(reset).await,
        Commands::InitCluster { apply } => run_init_cluster(apply).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_seed(reset: bool) -> AppResult<()> {
    let config = Config::from_env();
    let db = Database::connect(&config).await?;
    Repositories::mongo(&db).ensure_indexes().await?;

    let passwords = SeedPasswords {
        admin: hash_password(seed::ADMIN_PASSWORD, config.bcrypt_cost).await?,
        lecturer: hash_password(seed::LECTURER_PASSWORD, config.bcrypt_cost).await?,
        student: hash_password(seed::STUDENT_PASSWORD, config.bcrypt_cost).await?,
    };
    let data = seed::generate(&passwords, &mut rand::thread_rng());
    seed::insert(&db, &data, reset).await?;

    println!("Seeded {} records", data.total());
    println!("  admin:    {} / {}", seed::ADMIN_EMAIL, seed::ADMIN_PASSWORD);
    println!("  lecturer: lecturer1@hnue.edu.vn / {}", seed::LECTURER_PASSWORD);
    println!("  student:  student20@hnue.edu.vn / {}", seed::STUDENT_PASSWORD);
    Ok(())
}

async fn run_init_cluster(apply: bool) -> AppResult<()> {
    let sets = cluster::topology();

    if !apply {
        let json = serde_json::to_string_pretty(&sets)
            .map_err(|e| AppError::InternalError(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    for set in &sets {
        match cluster::initiate(set).await? {
            InitiateOutcome::Initiated => println!("{}: initiated", set.name),
            InitiateOutcome::AlreadyInitialized => println!("{}: already initialized", set.name),
        }
    }
    Ok(())
}
