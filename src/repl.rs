//! Interactive terminal chat
//!
//! Each turn runs on its own task while the input loop prints progress dots.
//! `/image <path>` attaches a screenshot to the next question.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::assistant::{Assistant, ChatRequest};
use crate::{Error, Result};

const HELP: &str = "Commands: /image <path> attaches a screenshot to your next message, /clear drops it, /quit exits.";

/// Read an image file as a `data:` URL
///
/// # Errors
///
/// Returns error if the file cannot be read or is not a recognised image
pub fn image_data_url(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let format = image::guess_format(&bytes)
        .map_err(|e| Error::Image(format!("{}: {e}", path.display())))?;
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        STANDARD.encode(&bytes)
    ))
}

/// What a line of input asks for
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    Help,
    Attach(&'a str),
    ClearImage,
    Message(&'a str),
    Empty,
}

fn parse_line(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "" => Input::Empty,
        "/quit" | "/exit" | "quit" | "exit" => Input::Quit,
        "/help" => Input::Help,
        "/clear" => Input::ClearImage,
        _ => line
            .strip_prefix("/image")
            .map_or(Input::Message(line), |rest| Input::Attach(rest.trim())),
    }
}

/// Run the chat loop until EOF or `/quit`
///
/// # Errors
///
/// Returns error if reading stdin fails
pub async fn run_chat(assistant: Arc<Assistant>, user_id: Option<String>) -> anyhow::Result<()> {
    let session_id = uuid::Uuid::new_v4().to_string();
    tracing::debug!(%session_id, "starting terminal chat");

    println!("FPL Assistant - ask about players, fixtures, captaincy or transfers.");
    if let Some(id) = &user_id {
        println!("User ID: {id}");
    }
    println!("{HELP}\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending_image: Option<String> = None;

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let message = match parse_line(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Help => {
                println!("{HELP}");
                continue;
            }
            Input::ClearImage => {
                pending_image = None;
                println!("Attachment cleared.");
                continue;
            }
            Input::Attach(path) => {
                match image_data_url(Path::new(path)) {
                    Ok(url) => {
                        pending_image = Some(url);
                        println!("Attached {path}. Now ask your question.");
                    }
                    Err(e) => println!("Could not attach image: {e}"),
                }
                continue;
            }
            Input::Message(text) => text.to_string(),
        };

        let request = ChatRequest {
            message,
            image: pending_image.take(),
            session_id: Some(session_id.clone()),
            user_id: user_id.clone(),
        };

        let reply = ask_with_progress(assistant.clone(), request).await;
        println!("\nAssistant: {reply}\n");
    }

    println!("Cheerio!");
    Ok(())
}

async fn ask_with_progress(assistant: Arc<Assistant>, request: ChatRequest) -> String {
    let task = tokio::spawn(async move { assistant.respond(&request).await });
    tokio::pin!(task);

    print!("Thinking");
    let _ = std::io::stdout().flush();
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    ticker.tick().await;

    let joined = loop {
        tokio::select! {
            joined = &mut task => break joined,
            _ = ticker.tick() => {
                print!(".");
                let _ = std::io::stdout().flush();
            }
        }
    };

    match joined {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => e.to_string(),
        Err(e) => {
            tracing::error!(error = %e, "chat task failed");
            format!("Error: {e}")
        }
    }
}
