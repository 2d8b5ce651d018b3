use anyhow::Result;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "mailsync", version, about = "Sync recent mail summaries into a local store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output structured JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch recent messages for a user and store the unseen ones
    Sync(SyncArgs),
    /// List stored message summaries, newest first
    List(ListArgs),
    /// Manage local accounts and their access tokens
    Accounts {
        #[command(subcommand)]
        command: AccountCommands,
    },
    /// Show stored message counts
    Stats,
}

#[derive(Debug, Args)]
struct SyncArgs {
    /// User to sync (defaults to MAILSYNC_USER)
    #[arg(long)]
    user: Option<String>,
    /// Keep syncing every 60 seconds
    #[arg(long, default_value_t = false)]
    watch: bool,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long)]
    user: Option<String>,
    #[arg(long, default_value_t = false)]
    unread: bool,
    #[arg(long, default_value_t = 50)]
    limit: usize,
}

#[derive(Debug, Subcommand)]
enum AccountCommands {
    /// List configured accounts
    List,
    /// Add or update an account
    Add {
        user_id: String,
        email: String,
        #[arg(long)]
        name: Option<String>,
        /// OAuth access token with the gmail.readonly scope
        #[arg(long, env = "MAILSYNC_ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Replace the stored access token for an account
    SetToken { user_id: String, token: String },
    /// Forget the stored access token for an account
    ClearToken { user_id: String },
    /// Remove an account
    Remove { user_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::dispatch(cli).await
}

mod commands {
    use anyhow::{anyhow, bail, Context, Result};

    use mailsync::auth::Session;
    use mailsync::config::Settings;
    use mailsync::connectors::GmailApiConnector;
    use mailsync::db::models::Account;
    use mailsync::db::Database;
    use mailsync::output::{self, OutputFormat};
    use mailsync::sync::{list_for_session, SyncOutcome, SyncService};

    use super::{AccountCommands, Cli, Commands};

    pub async fn dispatch(cli: Cli) -> Result<()> {
        let settings = Settings::from_env()?;
        let format = OutputFormat::from_json_flag(cli.json);

        match cli.command {
            Commands::Sync(args) => handle_sync(&settings, args, format).await,
            Commands::List(args) => handle_list(&settings, args, format).await,
            Commands::Accounts { command } => handle_accounts(&settings, command, format),
            Commands::Stats => handle_stats(&settings, format),
        }
    }

    fn open_db(settings: &Settings) -> Result<Database> {
        let db = Database::open(&settings.db_path).with_context(|| {
            format!(
                "open mailsync database at {}",
                settings.db_path.display()
            )
        })?;
        tracing::debug!(path = %db.path().display(), "database ready");
        Ok(db)
    }

    fn session_for(settings: &Settings, user: Option<String>) -> Session {
        match user.or_else(|| settings.default_user.clone()) {
            Some(user) => Session::for_user(user),
            None => Session::anonymous(),
        }
    }

    async fn handle_sync(
        settings: &Settings,
        args: super::SyncArgs,
        format: OutputFormat,
    ) -> Result<()> {
        let db = open_db(settings)?;
        let connector = GmailApiConnector::from_settings(settings)
            .map_err(|e| anyhow!("build gmail client: {e}"))?;
        let service = SyncService::new(&connector, &db, &db).with_limits(settings.limits);
        let session = session_for(settings, args.user);

        loop {
            let result = service.sync(&session).await;
            match &result {
                Ok(report) => println!("{}", output::format_sync_report(format, report)?),
                Err(error) if format == OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&SyncOutcome::from(&result))?);
                    if !args.watch {
                        bail!("{error}");
                    }
                }
                Err(error) => {
                    if !args.watch {
                        bail!("{error}");
                    }
                    eprintln!("sync failed: {error}");
                }
            }

            if !args.watch {
                return Ok(());
            }
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }
    }

    async fn handle_list(
        settings: &Settings,
        args: super::ListArgs,
        format: OutputFormat,
    ) -> Result<()> {
        let db = open_db(settings)?;
        let session = session_for(settings, args.user);

        let mut messages = list_for_session(&db, &db, &session).await?;
        if args.unread {
            messages.retain(|message| !message.is_read);
        }
        messages.truncate(args.limit);

        println!("{}", output::format_messages(format, &messages)?);
        Ok(())
    }

    fn handle_accounts(
        settings: &Settings,
        command: AccountCommands,
        format: OutputFormat,
    ) -> Result<()> {
        let db = open_db(settings)?;

        match command {
            AccountCommands::List => {
                let accounts = db.list_accounts()?;
                println!("{}", output::format_accounts(format, &accounts)?);
            }
            AccountCommands::Add {
                user_id,
                email,
                name,
                token,
            } => {
                let account = Account {
                    display_name: name,
                    access_token: token.filter(|token| !token.trim().is_empty()),
                    ..Account::new(user_id.trim(), email.trim())
                };
                db.upsert_account(&account)?;
                println!("Saved account: {}", account.user_id);
            }
            AccountCommands::SetToken { user_id, token } => {
                if token.trim().is_empty() {
                    bail!("access token must not be empty");
                }
                require_updated(db.set_access_token(&user_id, Some(token.trim()))?, &user_id)?;
                println!("Stored access token for {user_id}");
            }
            AccountCommands::ClearToken { user_id } => {
                require_updated(db.set_access_token(&user_id, None)?, &user_id)?;
                println!("Cleared access token for {user_id}");
            }
            AccountCommands::Remove { user_id } => {
                let removed = db.remove_account(&user_id)?;
                if removed == 0 {
                    println!("No account found: {user_id}");
                } else {
                    println!("Removed account: {user_id}");
                }
            }
        }
        Ok(())
    }

    fn handle_stats(settings: &Settings, format: OutputFormat) -> Result<()> {
        let db = open_db(settings)?;
        let stats = db.get_stats()?;
        println!("{}", output::format_stats(format, &stats)?);
        Ok(())
    }

    fn require_updated(updated: usize, user_id: &str) -> Result<()> {
        if updated == 0 {
            return Err(anyhow!(
                "account not found: {user_id}; use 'mailsync accounts add' first"
            ));
        }
        Ok(())
    }
}
