//! Command-line interface.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use emmy_core::{Attachment, CallbackParams, OutgoingDraft};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::api;
use crate::config::Config;
use crate::state::AppState;

/// Emmy: draft emails with Gemini and send them through Gmail.
#[derive(Debug, Parser)]
#[command(name = "emmy", version, about)]
pub struct Cli {
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve {
        /// Address to listen on (defaults to `EMMY_LISTEN_ADDR`).
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Authorize a Gmail account.
    Auth {
        /// Open the consent page in the default browser.
        #[arg(long)]
        open: bool,
    },
    /// Generate a draft and print it.
    Draft {
        /// What the email should say.
        #[arg(long)]
        prompt: String,
    },
    /// Send an email, optionally drafted from a prompt.
    Send {
        /// Recipient address.
        #[arg(long)]
        to: String,
        /// Draft the subject and body from this prompt.
        #[arg(long, conflicts_with = "subject", required_unless_present = "subject")]
        prompt: Option<String>,
        /// Subject line.
        #[arg(long, requires = "body")]
        subject: Option<String>,
        /// Body text.
        #[arg(long, requires = "subject")]
        body: Option<String>,
        /// File to attach.
        #[arg(long)]
        attach: Option<PathBuf>,
        /// Sending account (defaults to the stored one).
        #[arg(long)]
        account: Option<String>,
    },
    /// Print the authenticated account.
    Whoami,
    /// Forget an account's credential.
    Logout {
        /// Account to forget (defaults to the stored one).
        #[arg(long)]
        account: Option<String>,
    },
}

impl Command {
    /// Runs the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self, config: Config) -> anyhow::Result<()> {
        let state = AppState::open(&config).await?;

        match self {
            Self::Serve { listen } => {
                let addr = listen.unwrap_or(config.listen_addr);
                api::serve(state, addr)
                    .await
                    .with_context(|| format!("serving on {addr}"))?;
            }
            Self::Auth { open } => authorize(&state, open).await?,
            Self::Draft { prompt } => {
                let draft = emmy_core::generate_draft(state.generator()?, &prompt).await?;
                println!("Subject: {}\n\n{}", draft.subject, draft.body);
            }
            Self::Send {
                to,
                prompt,
                subject,
                body,
                attach,
                account,
            } => {
                let identity = resolve_account(&state, account).await?;
                let attachment = attach.as_deref().map(read_attachment).transpose()?;

                let (subject, body) = match prompt {
                    Some(prompt) => {
                        let draft =
                            emmy_core::generate_draft(state.generator()?, &prompt).await?;
                        println!("Subject: {}\n\n{}\n", draft.subject, draft.body);
                        (draft.subject, draft.body)
                    }
                    None => (subject.unwrap_or_default(), body.unwrap_or_default()),
                };

                let mut draft = OutgoingDraft::new(to, subject, body);
                if let Some(attachment) = attachment {
                    draft = draft.with_attachment(attachment);
                }

                let payload = emmy_core::build_payload(&draft)?;
                let id = state.dispatch.send(&identity, &payload).await?;
                println!("Email sent from {identity}. ID: {id}");
            }
            Self::Whoami => match state.auth.current_identity().await? {
                Some(email) => println!("{email}"),
                None => println!("Not signed in. Run `emmy auth`."),
            },
            Self::Logout { account } => {
                let identity = resolve_account(&state, account).await?;
                state.auth.logout(&identity).await?;
                println!("Logged out {identity}");
            }
        }

        Ok(())
    }
}

/// Prints (and optionally opens) the consent URL, then completes the
/// handshake from the redirect URL or bare code pasted back by the user.
async fn authorize(state: &AppState, open: bool) -> anyhow::Result<()> {
    let url = state.auth.begin_authorization()?;

    println!("Visit this URL to authorize Emmy:\n\n{url}\n");
    if open {
        if let Err(e) = opener::open(url.as_str()) {
            println!("Could not open a browser ({e}); open the URL manually.");
        }
    }

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Paste the URL you were redirected to (or just the code): ")
        .await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    let params = callback_from_input(&line)?;

    let email = state.auth.complete_authorization(&params).await?;
    info!(identity = %email, "authorized from the command line");
    println!("Authenticated as {email}");
    Ok(())
}

fn callback_from_input(input: &str) -> anyhow::Result<CallbackParams> {
    let input = input.trim();
    if input.is_empty() {
        bail!("no authorization code entered");
    }

    if input.contains("://") {
        return Ok(CallbackParams::from_url(input)?);
    }
    if input.contains('=') {
        return Ok(CallbackParams::from_query(input.trim_start_matches('?')));
    }
    Ok(CallbackParams {
        code: Some(input.to_string()),
        ..CallbackParams::default()
    })
}

async fn resolve_account(state: &AppState, account: Option<String>) -> anyhow::Result<String> {
    if let Some(account) = account {
        return Ok(account);
    }
    state
        .auth
        .current_identity()
        .await?
        .context("not signed in; run `emmy auth` first")
}

fn read_attachment(path: &Path) -> anyhow::Result<Attachment> {
    let data =
        std::fs::read(path).with_context(|| format!("reading attachment {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("attachment path has no usable file name: {}", path.display()))?;
    Ok(Attachment::new(filename, data))
}
