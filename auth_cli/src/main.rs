//! Operator CLI for the account authentication core.
//!
//! Runs registration, login, external-identity login, refresh and token
//! verification against PostgreSQL and prints the results as JSON.

mod config;
mod logging;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use account_auth::{
    auth::{
        AuthError, AuthSessionService, CancelSignal, CredentialVerifier, GoogleIdTokenPayload,
        IdentityClaims, LoginRequest, RegisterRequest, TokenSigner,
    },
    db::{Database, PgAccountStore},
};
use anyhow::{Context, Error, anyhow};
use config::CliConfig;
use log::info;
use pico_args::Arguments;
use serde::Serialize;

const HELP: &str = "\
Operate the account authentication core

USAGE:
  auth_cli [OPTIONS] <COMMAND> [ARGS]

COMMANDS:
  migrate                                   Create the accounts table
  register  --email E --password P --first-name F --last-name L
                                            Register a password account
  login     --email E --password P          Login with a password
  oauth     --email E [--first-name F] [--last-name L] [--avatar-url U]
  oauth     --payload FILE                  Login with a verified Google ID token payload (JSON)
  refresh   --access-token T --refresh-token R
                                            Rotate a session
  verify    --access-token T                Validate an access token

OPTIONS:
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               JWT signing secret (required)
  JWT_ISSUER               Token issuer
  JWT_AUDIENCE             Token audience
  PASSWORD_PEPPER          Password hashing pepper
  RUST_LOG                 Log filter (logs go to stderr)
  (See .env file for all configuration options)
";

#[derive(Debug)]
enum Command {
    Migrate,
    Verify { access_token: String },
    Session(SessionCommand),
}

/// Commands that run through the session service
#[derive(Debug)]
enum SessionCommand {
    Register(RegisterRequest),
    Login(LoginRequest),
    OAuth(IdentityClaims),
    Refresh {
        access_token: String,
        refresh_token: String,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Migrate => "migrate",
            Command::Verify { .. } => "verify",
            Command::Session(SessionCommand::Register(_)) => "register",
            Command::Session(SessionCommand::Login(_)) => "login",
            Command::Session(SessionCommand::OAuth(_)) => "oauth",
            Command::Session(SessionCommand::Refresh { .. }) => "refresh",
        }
    }
}

#[derive(Debug)]
struct Args {
    database_url: Option<String>,
    command: Command,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = parse_args(pargs)?;

    logging::init();

    let config = CliConfig::from_env(args.database_url)?;
    let started = Instant::now();
    let operation = args.command.name();

    let result = run(&config, args.command).await;
    logging::log_performance(operation, started.elapsed().as_millis() as u64);

    match result {
        Ok(Some(output)) => {
            println!("{output}");
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => Err(report(operation, err)),
    }
}

fn parse_args(mut pargs: Arguments) -> Result<Args, Error> {
    let database_url = pargs.opt_value_from_str("--db-url")?;

    let command = match pargs.subcommand()?.as_deref() {
        Some("migrate") => Command::Migrate,
        Some("register") => Command::Session(SessionCommand::Register(RegisterRequest {
            email: pargs.value_from_str("--email")?,
            password: pargs.value_from_str("--password")?,
            first_name: pargs.value_from_str("--first-name")?,
            last_name: pargs.value_from_str("--last-name")?,
        })),
        Some("login") => Command::Session(SessionCommand::Login(LoginRequest {
            email: pargs.value_from_str("--email")?,
            password: pargs.value_from_str("--password")?,
        })),
        Some("oauth") => {
            let payload: Option<PathBuf> = pargs.opt_value_from_str("--payload")?;
            let claims = match payload {
                Some(path) => {
                    let json = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let payload = GoogleIdTokenPayload::from_json(&json)
                        .context("Payload is not a Google ID token claim set")?;
                    IdentityClaims::try_from(payload)?
                }
                None => {
                    let email: Option<String> = pargs.opt_value_from_str("--email")?;
                    let first_name: Option<String> = pargs.opt_value_from_str("--first-name")?;
                    let last_name: Option<String> = pargs.opt_value_from_str("--last-name")?;
                    let avatar_url: Option<String> = pargs.opt_value_from_str("--avatar-url")?;
                    IdentityClaims::new(
                        email.as_deref(),
                        first_name.as_deref(),
                        last_name.as_deref(),
                        avatar_url.as_deref(),
                    )?
                }
            };
            Command::Session(SessionCommand::OAuth(claims))
        }
        Some("refresh") => Command::Session(SessionCommand::Refresh {
            access_token: pargs.value_from_str("--access-token")?,
            refresh_token: pargs.value_from_str("--refresh-token")?,
        }),
        Some("verify") => Command::Verify {
            access_token: pargs.value_from_str("--access-token")?,
        },
        Some(other) => return Err(anyhow!("Unknown command '{other}', see --help")),
        None => return Err(anyhow!("No command given, see --help")),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        return Err(anyhow!("Unexpected arguments: {remaining:?}"));
    }

    Ok(Args {
        database_url,
        command,
    })
}

/// Run one command, returning the JSON to print
async fn run(config: &CliConfig, command: Command) -> Result<Option<String>, Error> {
    let session_command = match command {
        Command::Verify { access_token } => {
            let claims = TokenSigner::new(&config.auth).validate_access_token(&access_token)?;
            return Ok(Some(to_json(&claims)?));
        }
        Command::Migrate => {
            let db = connect(config).await?;
            let migrated = db.migrate().await;
            db.close().await;
            migrated?;
            return Ok(None);
        }
        Command::Session(session_command) => session_command,
    };

    let db = connect(config).await?;
    let store = Arc::new(PgAccountStore::new(
        db.pool().clone(),
        CredentialVerifier::new(config.auth.password_pepper.clone()),
    ));
    let auth = AuthSessionService::new(store, &config.auth);

    // Ctrl-C cancels the in-flight operation before its next write.
    let (handle, cancel) = CancelSignal::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            handle.cancel();
        }
    });

    let output = run_session(&auth, session_command, &cancel).await;

    db.close().await;
    output.map(Some)
}

async fn run_session(
    auth: &AuthSessionService,
    command: SessionCommand,
    cancel: &CancelSignal,
) -> Result<String, Error> {
    match command {
        SessionCommand::Register(request) => {
            let account = auth.register_with_password(request, cancel).await?;
            info!("Registered account {}", account.id);
            to_json(&account)
        }
        SessionCommand::Login(request) => {
            to_json(&auth.login_with_password(request, cancel).await?)
        }
        SessionCommand::OAuth(claims) => {
            to_json(&auth.login_or_register_with_oauth(claims, cancel).await?)
        }
        SessionCommand::Refresh {
            access_token,
            refresh_token,
        } => to_json(
            &auth
                .refresh_session(&access_token, &refresh_token, cancel)
                .await?,
        ),
    }
}

async fn connect(config: &CliConfig) -> Result<Database, Error> {
    Database::new(config.require_database()?)
        .await
        .map_err(|e| anyhow!("Failed to connect to database: {}", e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Turn a failure into what the operator sees, logging security-relevant ones
fn report(operation: &str, err: Error) -> Error {
    let Some(auth_err) = err.downcast_ref::<AuthError>() else {
        return err;
    };

    match auth_err {
        AuthError::InvalidCredentials
        | AuthError::InvalidToken
        | AuthError::InvalidRefreshToken
        | AuthError::UnverifiedEmail => {
            logging::log_security_event(operation, None, &auth_err.to_string());
        }
        _ => {}
    }

    anyhow!("{} ({:?})", auth_err.client_message(), auth_err.kind())
}
