use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Input, Password};
use checklist_client::{ChecklistClient, ClientError, LocalStorage, StoredUser};
use checklist_core::{BoardView, ConnectionStatus, ReconciliationResponse, MIN_PASSWORD_LEN};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "checklist")]
#[command(about = "Task checklist client", long_about = None)]
struct Cli {
    /// Checklist server URL
    #[arg(short, long, default_value = "http://localhost:8080")]
    server: String,

    /// Local storage file name (will auto-create in databases/ directory)
    #[arg(short, long, default_value = "checklist")]
    database: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and log in
    Register { username: Option<String> },
    /// Log in to your personal checklist
    Login { username: Option<String> },
    /// Forget the stored login
    Logout,
    /// Show who is logged in
    Whoami,
    /// Show the checklist and its progress
    Board,
    /// Toggle a task, e.g. `toggle phase1 task2`
    Toggle { section_id: String, task_id: String },
    /// Re-check the database connection
    TestConnection,
    /// Insert the initial checklist data
    Init,
    /// Print the database setup script
    Script,
    /// Reload after running the setup script by hand
    SetupDone,
    /// Show the database setup guide
    Guide,
    /// Show toggles that may not have reached the database
    SyncLog,
    /// Re-send toggles the database rejected
    Retry,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()),
        )
        .init();

    let cli = Cli::parse();

    std::fs::create_dir_all("databases")?;
    let db_url = format!("sqlite:databases/{}.sqlite3?mode=rwc", cli.database);
    let storage = LocalStorage::new(&db_url).await?;
    let client = ChecklistClient::new(&cli.server);

    match cli.command {
        Command::Register { username } => {
            let username = prompt_username(username)?;
            let password = Password::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("Password (min {} characters)", MIN_PASSWORD_LEN))
                .with_confirmation("Repeat password", "Passwords don't match")
                .interact()?;

            let auth = client.register(&username, &password).await?;
            storage
                .save_user(&StoredUser {
                    user: auth.user.clone(),
                    session_id: auth.session_id,
                })
                .await?;
            println!("✅ Registered and logged in as {}", auth.user.username.green());
            print_board(&auth.board);
        }
        Command::Login { username } => {
            let username = prompt_username(username)?;
            let password = Password::with_theme(&ColorfulTheme::default())
                .with_prompt("Password")
                .interact()?;

            let auth = client.login(&username, &password).await?;
            storage
                .save_user(&StoredUser {
                    user: auth.user.clone(),
                    session_id: auth.session_id,
                })
                .await?;
            println!("✅ Logged in as {}", auth.user.username.green());
            print_board(&auth.board);
        }
        Command::Logout => {
            if let Some(stored) = storage.load_user().await? {
                // the server may already have dropped it
                if let Err(e) = client.close_session(stored.session_id).await {
                    tracing::debug!(%e, "Closing session failed");
                }
            }
            storage.clear_user().await?;
            println!("👋 Logged out");
        }
        Command::Whoami => match storage.load_user().await? {
            Some(stored) => println!(
                "👤 {} (id {}, session {})",
                stored.user.username.green(),
                stored.user.id,
                stored.session_id.to_string().dimmed()
            ),
            None => println!("👤 Not logged in, using the shared checklist"),
        },
        Command::Board => {
            let session_id = session(&client, &storage).await?;
            print_board(&client.board(session_id).await?);
        }
        Command::Toggle { section_id, task_id } => {
            let session_id = session(&client, &storage).await?;
            let toggled = client.toggle(session_id, &section_id, &task_id).await?;
            let state = if toggled.completed { "done".green() } else { "open".yellow() };
            println!("🔄 {} is now {}", toggled.task_id, state);
            print_board(&toggled.board);
        }
        Command::TestConnection => {
            let session_id = session(&client, &storage).await?;
            match client.test_connection(session_id).await {
                Ok(board) => {
                    println!("✅ Connection OK");
                    print_board(&board);
                }
                Err(e) => println!("❌ Connection test failed: {}", e.to_string().red()),
            }
        }
        Command::Init => {
            let session_id = session(&client, &storage).await?;
            let response = client.initialize(session_id).await?;
            println!("✅ {}", response.message);
            print_board(&response.board);
        }
        Command::Script => {
            print!("{}", client.setup_script().await?);
        }
        Command::SetupDone => {
            let session_id = session(&client, &storage).await?;
            print_board(&client.complete_setup(session_id).await?);
        }
        Command::Guide => {
            for step in client.setup_guide().await? {
                println!("{}", format!("{}. {}", step.number, step.title).bold());
                for line in &step.instructions {
                    println!("   • {}", line);
                }
                for text in &step.copyable {
                    println!("   {}", text.cyan());
                }
                println!();
            }
        }
        Command::SyncLog => {
            let session_id = session(&client, &storage).await?;
            print_reconciliation(&client.reconciliation(session_id).await?);
        }
        Command::Retry => {
            let session_id = session(&client, &storage).await?;
            print_reconciliation(&client.retry_failed_writes(session_id).await?);
        }
    }

    Ok(())
}

fn prompt_username(username: Option<String>) -> Result<String, Box<dyn std::error::Error>> {
    match username {
        Some(username) => Ok(username),
        None => Ok(Input::with_theme(&ColorfulTheme::default())
            .with_prompt("Username")
            .interact_text()?),
    }
}

/// The logged-in user's session, or a reusable anonymous one.
async fn session(
    client: &ChecklistClient,
    storage: &LocalStorage,
) -> Result<Uuid, Box<dyn std::error::Error>> {
    if let Some(stored) = storage.load_user().await? {
        return match client.board(stored.session_id).await {
            Err(ClientError::Server { status: 404, .. }) => {
                storage.clear_user().await?;
                Err("Session expired (server restarted?). Please log in again.".into())
            }
            Err(e) => Err(e.into()),
            Ok(_) => Ok(stored.session_id),
        };
    }

    if let Some(session_id) = storage.load_anonymous_session().await? {
        match client.board(session_id).await {
            Ok(_) => return Ok(session_id),
            Err(ClientError::Server { status: 404, .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }

    let opened = client.open_session().await?;
    storage.save_anonymous_session(opened.session_id).await?;
    Ok(opened.session_id)
}

fn status_line(board: &BoardView) -> ColoredString {
    let text = board.status_text.as_str();
    match board.status {
        ConnectionStatus::Connected => text.green(),
        ConnectionStatus::NotConfigured => text.blue(),
        ConnectionStatus::NeedsInit | ConnectionStatus::Connecting | ConnectionStatus::Initializing => {
            text.yellow()
        }
        ConnectionStatus::Error => text.red(),
    }
}

fn print_board(board: &BoardView) {
    println!();
    println!("🔌 {}", status_line(board));
    if let Some(message) = &board.message {
        println!("   {}", message.dimmed());
    }
    println!(
        "{}",
        format!(
            "📊 {}/{} tasks ({}%)",
            board.progress.completed, board.progress.total, board.progress.percent
        )
        .bold()
    );
    println!("{}", "─".repeat(60).dimmed());

    for section in &board.sections {
        println!(
            "{} {}",
            section.title.bold(),
            format!(
                "[{}] {}/{}",
                section.id, section.progress.completed, section.progress.total
            )
            .dimmed()
        );
        for task in &section.tasks {
            let mark = if task.completed { "✅" } else { "⬜" };
            let title = if task.completed {
                task.title.strikethrough().dimmed()
            } else {
                task.title.normal()
            };
            println!("  {} {} {}", mark, title, task.id.dimmed());
        }
    }

    if board.all_completed {
        println!();
        println!("{}", "🎉 All tasks completed!".bold().green());
    }
}

fn print_reconciliation(response: &ReconciliationResponse) {
    if response.entries.is_empty() {
        println!("📭 No toggles yet.");
        return;
    }

    for entry in &response.entries {
        let state = if entry.synced {
            "synced".green()
        } else if !entry.attempted {
            "local only".blue()
        } else if entry.last_error.is_some() {
            "failed".red()
        } else {
            "pending".yellow()
        };
        println!(
            "{:<16} desired={:<5} {}",
            entry.task_id, entry.desired, state
        );
        if let Some(error) = &entry.last_error {
            println!("   {}", error.dimmed());
        }
    }

    if response.divergent {
        println!("{}", "⚠️  Local state may differ from the database".yellow());
    }
}
