// wallet-client/src/main.rs
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use common::models::{Role, RoleHints};
use common::{setup_tracing, Config};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use wallet_client::wallet::{AutoApprove, ConsentPrompt, ConsentRequest};
use wallet_client::{
    AuthorizedCaller, ChallengeAuthClient, GraphQlIdentityClient, IdentityService, KeyfileWallet,
    Navigator, RetryPolicy, RoleResolver, SessionStore, Transition, ViewScope, WalletAdapter,
};

#[derive(Parser)]
#[command(name = "decentwork", version, about = "Wallet login and role routing for DecentWork")]
struct Cli {
    /// GraphQL endpoint of the identity service
    #[arg(long, env = "IDENTITY_SERVICE_URL", global = true)]
    identity_url: Option<String>,

    /// Directory holding the persisted session
    #[arg(long, env = "SESSION_DIR", global = true)]
    session_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a new RSA wallet keyfile
    Keygen {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 4096)]
        bits: usize,
    },
    /// Sign in with the wallet
    Login {
        #[arg(long, env = "WALLET_KEYFILE")]
        keyfile: Option<PathBuf>,
        /// Approve wallet prompts without asking
        #[arg(long)]
        yes: bool,
    },
    /// Show the current session
    Whoami,
    /// Resolve the role and print where the user belongs
    Route {
        #[arg(long)]
        new_client: bool,
        #[arg(long, conflicts_with = "new_client")]
        new_freelancer: bool,
    },
    /// Pick a role when none is bound yet
    ChooseRole { role: Role },
    /// Create the profile for a role, binding it to the account
    Setup { role: Role },
    /// End the session
    Logout,
}

/// Asks on the terminal before connecting or signing
struct StdinConsent;

impl ConsentPrompt for StdinConsent {
    fn approve(&self, request: &ConsentRequest<'_>) -> bool {
        let question = match request {
            ConsentRequest::Connect { permissions } => {
                let names: Vec<&str> = permissions.iter().map(|p| p.as_str()).collect();
                format!("Allow DecentWork to use your wallet ({})?", names.join(", "))
            }
            ConsentRequest::Sign { payload } => {
                format!("Sign this message?\n\n{}\n", String::from_utf8_lossy(payload))
            }
        };

        let mut stderr = std::io::stderr();
        if write!(stderr, "{} [y/N] ", question).and_then(|_| stderr.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn report(transition: &Transition) {
    match transition.to.path() {
        Some(path) => println!("{} ({})", transition.to, path),
        None => println!("{}", transition.to),
    }
}

fn open_wallet(keyfile: Option<PathBuf>, yes: bool) -> anyhow::Result<WalletAdapter> {
    let Some(path) = keyfile else {
        return Ok(WalletAdapter::unavailable());
    };

    let prompt: Arc<dyn ConsentPrompt> = if yes {
        Arc::new(AutoApprove)
    } else {
        Arc::new(StdinConsent)
    };
    let wallet = KeyfileWallet::load(&path, prompt)?;
    Ok(WalletAdapter::new(Arc::new(wallet)))
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let store = SessionStore::in_dir(&config.client.session_dir);
    let identity: Arc<dyn IdentityService> = Arc::new(
        GraphQlIdentityClient::with_timeout(
            config.identity_service_url.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )
        .context("building identity client")?,
    );
    let resolver = RoleResolver::new(store.clone(), identity.clone());

    match cli.command {
        Command::Keygen { out, bits } => {
            let wallet = KeyfileWallet::generate(bits, Arc::new(AutoApprove))?;
            wallet.save(&out)?;
            println!("{}", wallet.address());
        }
        Command::Login { keyfile, yes } => {
            let keyfile = keyfile.or_else(|| config.client.wallet_keyfile.clone().map(PathBuf::from));
            let wallet = open_wallet(keyfile, yes)?;
            let auth = ChallengeAuthClient::new(wallet, identity.clone(), store.clone());

            let credential = match auth.authenticate(&ViewScope::mount()).await {
                Ok(credential) => credential,
                Err(e) => {
                    tracing::debug!("Authentication failed: {}", e);
                    bail!("{}", e.user_message());
                }
            };
            println!("Logged in as {}", credential.wallet_address);

            let mut navigator = Navigator::new(store, resolver);
            report(&navigator.enter_with_retry(&RetryPolicy::default()).await);
        }
        Command::Whoami => match store.current() {
            Some(session) => {
                println!("wallet:  {}", session.wallet_address);
                println!("user:    {}", session.user_id);
                println!("since:   {}", session.created_at.to_rfc3339());
            }
            None => println!("Not logged in"),
        },
        Command::Route {
            new_client,
            new_freelancer,
        } => {
            let hints = RoleHints {
                is_new_client_user: new_client,
                is_new_freelance_user: new_freelancer,
            };
            let mut navigator = Navigator::new(store, resolver).with_hints(hints);
            report(&navigator.enter_with_retry(&RetryPolicy::default()).await);
        }
        Command::ChooseRole { role } => {
            let mut navigator = Navigator::new(store, resolver);
            report(&navigator.choose_role(role).await);
        }
        Command::Setup { role } => {
            let caller = AuthorizedCaller::new(store.clone());
            let service = identity.clone();
            caller
                .call(move |token| async move { service.bind_role(&token, role).await })
                .await
                .with_context(|| format!("{} setup failed", role))?;

            let mut navigator = Navigator::new(store, resolver);
            report(&navigator.enter_gated_view().await);
        }
        Command::Logout => {
            let mut navigator = Navigator::new(store, resolver);
            report(&navigator.logout()?);
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, load_error) = Config::resolve();
    if let Some(url) = &cli.identity_url {
        config.identity_service_url = url.clone();
    }
    if let Some(dir) = &cli.session_dir {
        config.client.session_dir = dir.display().to_string();
    }

    setup_tracing(&config.log_level);
    if let Some(e) = &load_error {
        Config::report_fallback(e);
    }

    // One cooperative event loop, like the page it stands in for
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(cli, config))
}
