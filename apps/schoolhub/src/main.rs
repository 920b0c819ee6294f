//! SchoolHub entry point.

use clap::Parser;
use schoolhub::cli::{self, Cli, Commands, UserCommand};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("schoolhub=info,tower_http=info")),
        )
        .init();

    let args = Cli::parse();
    let result = match args.command {
        Commands::Init {
            force,
            admin_password,
            sample_data,
        } => cli::cmd_init(&args.db, force, &admin_password, sample_data).map(|report| {
            println!("Initialized {}", args.db.display());
            if report.admin_created {
                println!("Default admin account: admin");
            }
            if let Some(sample) = report.sample {
                if sample.skipped {
                    println!("Sample data skipped: academic years already exist");
                } else {
                    println!(
                        "Sample data: {} classes, {} teachers, {} students",
                        sample.classes, sample.teachers, sample.students
                    );
                }
            }
        }),
        Commands::Serve(serve) => cli::cmd_serve(&args.db, serve).await,
        Commands::Status { json } => cli::cmd_status(&args.db, json).map(|out| print!("{out}")),
        Commands::User {
            action:
                UserCommand::Add {
                    username,
                    password,
                    role,
                    full_name,
                },
        } => cli::cmd_user_add(&args.db, &username, &password, &role, full_name)
            .map(|user| println!("Created {} ({})", user.username, user.role)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
