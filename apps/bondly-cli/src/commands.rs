//! REPL grammar, line reading and command execution.

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand};
use client_core::{
    ChannelError, ClientCommand, INTERESTS, LoginCredentials, PhotoUpload, ProfileUpdate,
    ReviewDecision, SignupForm, Swipe,
};
use rustyline::{DefaultEditor, error::ReadlineError};
use thiserror::Error;
use tracing::debug;

use crate::{bridge::CliBridge, config::CliConfig, state::ActionError, view};

const PROMPT: &str = "bondly> ";
const CONFIRM_DELETE_PROMPT: &str = "Delete this message? [y/N] ";

/// One REPL line. The first word is the command name.
#[derive(Debug, Parser)]
#[command(multicall = true)]
pub struct ReplLine {
    #[command(subcommand)]
    pub command: ReplCommand,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum ReplCommand {
    /// Log in. Missing values fall back to BONDLY_EMAIL / BONDLY_PASSWORD.
    Login {
        email: Option<String>,
        password: Option<String>,
    },
    /// Create an account.
    Signup(SignupArgs),
    /// Clear the local session.
    Logout,
    /// Show your profile, or another user's.
    Profile { user_id: Option<String> },
    /// Edit your profile.
    Edit(EditArgs),
    /// Load people to discover.
    Feed,
    /// Send interest to the current profile.
    Like,
    /// Skip the current profile.
    Pass,
    /// Go back to the previous profile.
    Rewind,
    /// List requests you received.
    Requests,
    Accept { request_id: String },
    Reject { request_id: String },
    /// Start or reopen a chat with a match.
    Chat { user_id: String },
    /// List your conversations.
    Chats,
    /// Open a conversation and mark it read.
    Open { conversation_id: String },
    /// Send a message to the open conversation.
    Send {
        #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },
    /// Delete one of your messages in the open conversation.
    Delete { message_id: String },
    /// Mark the open conversation read.
    Read,
    Dashboard,
    /// List the interests you can pick from.
    Interests,
    /// Show session, loading and error status.
    Status,
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Args, PartialEq, Eq)]
pub struct SignupArgs {
    #[arg(long, default_value = "")]
    pub name: String,
    #[arg(long, default_value = "")]
    pub email: String,
    #[arg(long, default_value = "")]
    pub age: String,
    #[arg(long, default_value = "")]
    pub location: String,
    #[arg(long, default_value = "")]
    pub password: String,
    #[arg(long, default_value = "")]
    pub confirm_password: String,
    #[arg(long, default_value = "")]
    pub bio: String,
    /// Comma separated, see `interests`.
    #[arg(long, value_delimiter = ',')]
    pub interests: Vec<String>,
    /// Image file to upload; repeat for more.
    #[arg(long = "photo")]
    pub photos: Vec<PathBuf>,
}

#[derive(Debug, Args, PartialEq, Eq)]
pub struct EditArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub age: Option<u32>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub bio: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub interests: Option<Vec<String>>,
}

/// What the REPL loop does after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    ConfirmDelete,
    Quit,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("client runtime stopped: {0}")]
    Channel(#[from] ChannelError),
    #[error("could not read photo {path}: {source}")]
    PhotoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a supported image")]
    NotAnImage { path: PathBuf },
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Readline(#[from] ReadlineError),
}

/// Read lines until `quit` or end of input.
pub async fn run(bridge: &CliBridge, config: &CliConfig) -> Result<(), CliError> {
    let mut editor = DefaultEditor::new()?;
    println!("Bondly at {}. Type `help` for commands.", config.api_url);

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("Type `quit` to exit.");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(trimmed);

        let command = match parse_line(trimmed) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match execute(command, bridge, config).await {
            Ok((Flow::Continue, lines)) => print_lines(lines),
            Ok((Flow::Quit, _)) => break,
            Ok((Flow::ConfirmDelete, lines)) => {
                print_lines(lines);
                let answer = editor.readline(CONFIRM_DELETE_PROMPT).unwrap_or_default();
                let command = bridge.state().resolve_delete(is_yes(&answer));
                if let Some(command) = command {
                    bridge.dispatch(command).await?;
                } else {
                    println!("Delete cancelled");
                }
            }
            Err(CliError::Channel(err)) => return Err(err.into()),
            Err(err) => println!("{err}"),
        }
    }

    println!("Goodbye!");
    Ok(())
}

pub fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

/// Tokenize and parse one line. The error is ready to print.
pub fn parse_line(line: &str) -> Result<ReplCommand, String> {
    let args = split_args(line)?;
    ReplLine::try_parse_from(args)
        .map(|parsed| parsed.command)
        .map_err(|err| err.to_string())
}

/// Run one command. Returns the flow and any lines to print right away;
/// results of remote calls arrive later through the event worker.
pub async fn execute(
    command: ReplCommand,
    bridge: &CliBridge,
    config: &CliConfig,
) -> Result<(Flow, Vec<String>), CliError> {
    let mut lines = Vec::new();
    let client_command = match command {
        ReplCommand::Quit => return Ok((Flow::Quit, lines)),
        ReplCommand::Interests => {
            lines.push(INTERESTS.join(", "));
            return Ok((Flow::Continue, lines));
        }
        ReplCommand::Status => {
            lines.extend(view::render_status(&bridge.state()));
            return Ok((Flow::Continue, lines));
        }
        ReplCommand::Login { email, password } => {
            let email = email.or_else(|| config.prefill_email.clone());
            let password = password.or_else(|| config.prefill_password.clone());
            let (Some(email), Some(password)) = (email, password) else {
                return Err(CliError::Usage("usage: login <email> <password>".to_owned()));
            };
            ClientCommand::Login(LoginCredentials { email, password })
        }
        ReplCommand::Signup(args) => ClientCommand::Signup(signup_form(args)?),
        ReplCommand::Logout => ClientCommand::Logout,
        ReplCommand::Profile { user_id } => ClientCommand::FetchProfile { user_id },
        ReplCommand::Edit(args) => ClientCommand::UpdateProfile(ProfileUpdate {
            name: args.name,
            age: args.age,
            location: args.location,
            bio: args.bio,
            interests: args.interests,
            photos: None,
        }),
        ReplCommand::Feed => ClientCommand::FetchFeed,
        ReplCommand::Like => match swipe(bridge, Swipe::Like, &mut lines)? {
            Some(command) => command,
            None => return Ok((Flow::Continue, lines)),
        },
        ReplCommand::Pass => {
            swipe(bridge, Swipe::Pass, &mut lines)?;
            return Ok((Flow::Continue, lines));
        }
        ReplCommand::Rewind => {
            let mut state = bridge.state();
            if !state.rewind() {
                lines.push("Already at the first profile".to_owned());
            }
            lines.extend(view::render_deck(&state));
            return Ok((Flow::Continue, lines));
        }
        ReplCommand::Requests => ClientCommand::ListReceivedRequests,
        ReplCommand::Accept { request_id } => bridge
            .state()
            .begin_review(&request_id, ReviewDecision::Accept)?,
        ReplCommand::Reject { request_id } => bridge
            .state()
            .begin_review(&request_id, ReviewDecision::Reject)?,
        ReplCommand::Chat { user_id } => ClientCommand::InitiateConversation {
            other_user_id: user_id,
        },
        ReplCommand::Chats => ClientCommand::ListConversations,
        ReplCommand::Open { conversation_id } => {
            let [open, mark_read] = bridge.state().begin_open(&conversation_id)?;
            bridge.dispatch(open).await?;
            mark_read
        }
        ReplCommand::Send { words } => bridge.state().begin_send(&words.join(" "))?,
        ReplCommand::Delete { message_id } => {
            bridge.state().request_delete(&message_id)?;
            return Ok((Flow::ConfirmDelete, lines));
        }
        ReplCommand::Read => bridge.state().begin_mark_read()?,
        ReplCommand::Dashboard => ClientCommand::FetchDashboard,
    };

    bridge.dispatch(client_command).await?;
    Ok((Flow::Continue, lines))
}

/// Apply a swipe locally and show the next profile. Returns the request a
/// like needs.
fn swipe(
    bridge: &CliBridge,
    swipe: Swipe,
    lines: &mut Vec<String>,
) -> Result<Option<ClientCommand>, CliError> {
    let mut state = bridge.state();
    let swiped = state.apply_optimistic(swipe)?;
    if swipe == Swipe::Like {
        lines.push(format!("You liked {}", swiped.user.display_name()));
    }
    lines.extend(view::render_deck(&state));
    Ok(swiped.command)
}

fn signup_form(args: SignupArgs) -> Result<SignupForm, CliError> {
    let photos = args
        .photos
        .iter()
        .map(|path| load_photo(path))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SignupForm {
        name: args.name,
        email: args.email,
        age: args.age,
        location: args.location,
        password: args.password,
        confirm_password: args.confirm_password,
        bio: args.bio,
        interests: args.interests,
        photos,
    })
}

/// Read an image file and detect its type from the content.
pub fn load_photo(path: &Path) -> Result<PhotoUpload, CliError> {
    let bytes = fs::read(path).map_err(|source| CliError::PhotoRead {
        path: path.to_path_buf(),
        source,
    })?;
    let kind = infer::get(&bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .ok_or_else(|| CliError::NotAnImage {
            path: path.to_path_buf(),
        })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("photo.{}", kind.extension()));
    debug!(%file_name, mime = kind.mime_type(), size = bytes.len(), "loaded photo");

    Ok(PhotoUpload {
        file_name,
        content_type: kind.mime_type().to_owned(),
        bytes,
    })
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Split on whitespace, keeping single- or double-quoted runs together.
fn split_args(line: &str) -> Result<Vec<String>, String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote = None;

    for ch in line.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err("unterminated quote".to_owned());
    }
    if in_token {
        args.push(current);
    }
    Ok(args)
}
