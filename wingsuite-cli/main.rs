// Console CLI: login, listings, execution watching and the document
// edit loop, all through the console API.
mod args;

use anyhow::{anyhow, Context, Result};
use args::{Cli, Command, GlobalArgs};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wingsuite_server::client::ConsoleClient;
use wingsuite_server::editor::{DiffSegment, EditSession};
use wingsuite_server::polling::{ExecutionPoller, NavigationTarget, PollResult};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Login {
            identifier,
            password,
        } => handle_login(&cli.global, &identifier, password).await,
        Command::Whoami => handle_whoami(&cli.global).await,
        Command::Folders { folder } => handle_folders(&cli.global, folder.as_deref()).await,
        Command::Documents => handle_documents(&cli.global).await,
        Command::Credits => handle_credits(&cli.global).await,
        Command::Watch {
            execution_id,
            interval_ms,
        } => handle_watch(&cli.global, &execution_id, interval_ms).await,
        Command::Edit {
            file_id,
            persona,
            mode,
        } => handle_edit(&cli.global, &file_id, &persona, &mode).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionMeta {
    token: String,
    saved_at: i64,
}

fn session_file(global: &GlobalArgs) -> PathBuf {
    global
        .session_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(".wingsuite/session.json"))
}

fn load_token(global: &GlobalArgs) -> Option<String> {
    let raw = std::fs::read_to_string(session_file(global)).ok()?;
    let meta: SessionMeta = serde_json::from_str(&raw).ok()?;
    let token = meta.token.trim().to_string();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn save_token(global: &GlobalArgs, token: &str) -> Result<()> {
    let path = session_file(global);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create session dir failed: {}", parent.display()))?;
    }
    let meta = SessionMeta {
        token: token.to_string(),
        saved_at: chrono::Utc::now().timestamp(),
    };
    std::fs::write(&path, serde_json::to_string_pretty(&meta)?)
        .with_context(|| format!("write session file failed: {}", path.display()))?;
    Ok(())
}

fn authed_client(global: &GlobalArgs) -> Result<ConsoleClient> {
    let token = load_token(global)
        .ok_or_else(|| anyhow!("no stored session; run `wingsuite-cli login` first"))?;
    Ok(ConsoleClient::new(&global.server)?.with_token(token))
}

async fn handle_login(
    global: &GlobalArgs,
    identifier: &str,
    password: Option<String>,
) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt_line("password: ")?,
    };
    let mut client = ConsoleClient::new(&global.server)?;
    client.login(identifier, password.trim()).await?;
    let token = client
        .token()
        .ok_or_else(|| anyhow!("login succeeded but no token was captured"))?;
    save_token(global, token)?;
    println!("logged in as {identifier}");
    Ok(())
}

async fn handle_whoami(global: &GlobalArgs) -> Result<()> {
    let client = authed_client(global)?;
    let user = client.me().await?;
    println!(
        "{} ({}) role={}",
        user.get("email").and_then(|v| v.as_str()).unwrap_or("-"),
        user.get("client").and_then(|v| v.as_str()).unwrap_or("-"),
        user.get("role").and_then(|v| v.as_str()).unwrap_or("-"),
    );
    Ok(())
}

async fn handle_folders(global: &GlobalArgs, folder: Option<&str>) -> Result<()> {
    let client = authed_client(global)?;
    match folder {
        Some(name) => {
            let stat = client.folder(name).await?;
            println!("{} ({} new)", stat.folder, stat.unseen);
            for item in &stat.items {
                let label = item
                    .get("name")
                    .or_else(|| item.get("id"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("?");
                println!("  {label}");
            }
        }
        None => {
            for stat in client.folders().await? {
                println!("{:<30} {:>4} files, {} new", stat.folder, stat.items.len(), stat.unseen);
            }
        }
    }
    Ok(())
}

async fn handle_documents(global: &GlobalArgs) -> Result<()> {
    let client = authed_client(global)?;
    for document in client.documents().await? {
        println!(
            "{:<24} {:<30} {:>5} chunks  {:<7} {}",
            document.id,
            document.title,
            document.chunks,
            document.visibility,
            document.cluster.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

async fn handle_credits(global: &GlobalArgs) -> Result<()> {
    let client = authed_client(global)?;
    let credits = client.credits().await?;
    println!(
        "used {} of {} credits ({} remaining)",
        credits.credits_used, credits.plan_credits, credits.remaining
    );
    Ok(())
}

async fn handle_watch(global: &GlobalArgs, execution_id: &str, interval_ms: u64) -> Result<()> {
    let client = authed_client(global)?;
    let poller =
        ExecutionPoller::new(client).with_interval(Duration::from_millis(interval_ms.max(100)));

    let cancel = poller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    println!("watching execution {execution_id}…");
    let result = poller
        .run(execution_id, |step, fresh| {
            let marker = if fresh { "+" } else { "·" };
            if step.summary.is_empty() {
                println!("{marker} {}", step.label);
            } else {
                println!("{marker} {}: {}", step.label, step.summary);
            }
        })
        .await;

    match result {
        PollResult::Completed { target } => match target {
            NavigationTarget::Document(id) => println!("done; open document {id}"),
            NavigationTarget::Dashboard => println!("done; no document reference, see dashboard"),
        },
        PollResult::Failed { .. } => println!("execution failed; see dashboard"),
        PollResult::Cancelled => println!("stopped watching"),
    }
    Ok(())
}

async fn handle_edit(global: &GlobalArgs, file_id: &str, persona: &str, mode: &str) -> Result<()> {
    let client = authed_client(global)?;
    let committed = client.load_document(file_id).await?;
    let mut session = EditSession::new(committed);
    let conversation_id = uuid::Uuid::new_v4().simple().to_string();

    println!("editing {file_id} ({} chars); empty line quits", session.committed().len());
    loop {
        let instruction = prompt_line("instruction> ")?;
        let instruction = instruction.trim();
        if instruction.is_empty() || instruction == "exit" {
            break;
        }

        let reply = client
            .review_chat(
                &conversation_id,
                file_id,
                session.committed(),
                instruction,
                persona,
                mode,
            )
            .await?;
        if !reply.assistant_message.is_empty() {
            println!("{}", reply.assistant_message);
        }

        let Some(suggested) = reply.suggested_text else {
            continue;
        };
        session.propose(suggested);
        println!("{}", render_diff(&session.diff()));

        let choice = prompt_line("[a]ccept / [d]iscard / [k]eep editing> ")?;
        match choice.trim() {
            "a" | "accept" => {
                let proposal = session.proposal().unwrap_or_default().to_string();
                match client.save_document(file_id, &proposal).await {
                    Ok(()) => {
                        session.commit_proposal();
                        println!("Saved.");
                    }
                    Err(err) => {
                        // Keep the proposal so a retry is possible.
                        eprintln!("save failed: {err}");
                    }
                }
            }
            "d" | "discard" => {
                session.discard();
                println!("discarded");
            }
            _ => {}
        }
    }
    Ok(())
}

/// Git-style word diff markers: `{+added+}` and `[-removed-]`.
fn render_diff(segments: &[DiffSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            DiffSegment::Equal(text) => out.push_str(text),
            DiffSegment::Insert(text) => {
                out.push_str("{+");
                out.push_str(text);
                out.push_str("+}");
            }
            DiffSegment::Delete(text) => {
                out.push_str("[-");
                out.push_str(text);
                out.push_str("-]");
            }
        }
    }
    out
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_rendering_uses_word_markers() {
        let segments = vec![
            DiffSegment::Equal("the ".to_string()),
            DiffSegment::Delete("quick".to_string()),
            DiffSegment::Insert("slow".to_string()),
            DiffSegment::Equal(" fox".to_string()),
        ];
        assert_eq!(render_diff(&segments), "the [-quick-]{+slow+} fox");
    }
}
