use clap::{Parser, Subcommand};
use collegeportal::{
    db,
    models::user::Role,
    repositories::SqliteUserRepository,
    services::{AccountRequest, AccountService, UploadStore},
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "portal-cli")]
#[command(about = "CLI tool for managing college portal accounts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrator management commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
    /// Commands that apply to any account
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Create an administrator account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// List all administrators
    List,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Delete a student or administrator
    Delete {
        /// Email address of the account to delete
        #[arg(short, long)]
        email: String,
    },

    /// Set a new password for an account
    SetPassword {
        /// Email address of the account
        #[arg(short, long)]
        email: String,

        /// New password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
}

fn get_password(prompt: &str) -> anyhow::Result<String> {
    use std::io::{self, Write};
    print!("{}: ", prompt);
    io::stdout().flush()?;

    Ok(rpassword::read_password()?)
}

/// Uses the supplied password, or prompts twice and requires both to match.
fn password_or_prompt(password: Option<String>, prompt: &str) -> anyhow::Result<String> {
    if let Some(pw) = password {
        return Ok(pw);
    }

    let password = get_password(prompt)?;
    let confirm = get_password("Confirm password")?;
    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }
    Ok(password)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Connect to database
    let pool = db::create_pool().await?;

    // Run migrations
    db::run_migrations(&pool).await?;

    // Initialize services
    let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());
    let user_repository = Arc::new(SqliteUserRepository::new(pool.clone()));
    let account_service =
        AccountService::new(user_repository, Arc::new(UploadStore::new(upload_dir)));

    // Parse CLI arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Create {
                email,
                first_name,
                last_name,
                password,
            } => {
                let password = password_or_prompt(password, "Password")?;
                let request = AccountRequest {
                    first_name,
                    last_name,
                    email,
                    password: Some(password),
                    ..Default::default()
                };

                match account_service.create_account(Role::Admin, request).await {
                    Ok(user) => {
                        println!("✅ Admin created successfully!");
                        println!("  ID: {}", user.id);
                        println!("  Email: {}", user.email);
                    }
                    Err(err) => {
                        eprintln!("❌ Failed to create admin: {}", err);
                        std::process::exit(1);
                    }
                }
            }

            AdminCommands::List => match account_service.list_admins().await {
                Ok(admins) => {
                    if admins.is_empty() {
                        println!("No admins found.");
                    } else {
                        println!("{:<5} {:<40} {:<30}", "ID", "Email", "Name");
                        println!("{}", "-".repeat(75));
                        for admin in admins {
                            println!(
                                "{:<5} {:<40} {:<30}",
                                admin.id,
                                admin.email,
                                format!("{} {}", admin.first_name, admin.last_name)
                            );
                        }
                    }
                }
                Err(err) => {
                    eprintln!("❌ Failed to list admins: {}", err);
                    std::process::exit(1);
                }
            },
        },

        Commands::User { command } => match command {
            UserCommands::Delete { email } => {
                match account_service.find_user_by_email(&email).await {
                    Ok(Some(user)) => match account_service.delete_account(user.role, user.id).await
                    {
                        Ok(()) => {
                            println!("✅ {} '{}' deleted successfully!", user.role, email);
                        }
                        Err(err) => {
                            eprintln!("❌ Failed to delete account: {}", err);
                            std::process::exit(1);
                        }
                    },
                    Ok(None) => {
                        eprintln!("❌ Account '{}' not found", email);
                        std::process::exit(1);
                    }
                    Err(err) => {
                        eprintln!("❌ Failed to find account: {}", err);
                        std::process::exit(1);
                    }
                }
            }

            UserCommands::SetPassword { email, password } => {
                match account_service.find_user_by_email(&email).await {
                    Ok(Some(user)) => {
                        let new_password = password_or_prompt(password, "New password")?;

                        match account_service.set_password(user.id, &new_password).await {
                            Ok(()) => {
                                println!("✅ Password updated successfully for '{}'!", email);
                            }
                            Err(err) => {
                                eprintln!("❌ Failed to update password: {}", err);
                                std::process::exit(1);
                            }
                        }
                    }
                    Ok(None) => {
                        eprintln!("❌ Account '{}' not found", email);
                        std::process::exit(1);
                    }
                    Err(err) => {
                        eprintln!("❌ Failed to find account: {}", err);
                        std::process::exit(1);
                    }
                }
            }
        },
    }

    Ok(())
}
