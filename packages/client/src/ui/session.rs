//! Interactive terminal session.
//!
//! rustyline runs on its own OS thread and forwards lines over a channel;
//! the async side executes commands and prints notices as they arrive.

use std::io::Write;

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{domain::Notice, usecase::SessionController};

use super::{command::Command, formatter::StatusFormatter};

const PROMPT: &str = "tandem> ";

/// Redisplay the prompt after printing asynchronously
pub fn redisplay_prompt() {
    print!("{}", PROMPT);
    std::io::stdout().flush().ok();
}

/// Run the prompt until `quit`, Ctrl+C or Ctrl+D
pub async fn run_session(
    controller: SessionController,
    mut notices: mpsc::UnboundedReceiver<Notice>,
) -> Result<(), Box<dyn std::error::Error>> {
    controller.restore().await;
    let ticker = controller.spawn_ticker();

    println!("{}", StatusFormatter::format_help());
    print!(
        "{}",
        StatusFormatter::format_status(&controller.snapshot().await)
    );

    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else {
                    break;
                };
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(&controller, command).await,
                    Err(e) => println!("{}", e),
                }
            }
            Some(notice) = notices.recv() => {
                print!("{}", StatusFormatter::format_notice(&notice));
                redisplay_prompt();
            }
        }
    }

    ticker.abort();
    tracing::info!("Session ended");
    Ok(())
}

async fn execute(controller: &SessionController, command: Command) {
    // 失敗はコントローラが通知として報告する
    match command {
        Command::SetSelfId(id) => {
            let _ = controller.set_self_id(&id).await;
        }
        Command::SetPartnerId(id) => {
            let _ = controller.set_partner_id(&id).await;
        }
        Command::Disconnect => controller.disconnect_partner().await,
        Command::Logout => controller.logout().await,
        Command::Start => {
            controller.start().await;
        }
        Command::Pause => {
            controller.pause().await;
        }
        Command::Stop => {
            controller.stop().await;
        }
        Command::Mode(mode) => {
            controller.switch_mode(mode).await;
        }
        Command::Settings {
            focus_minutes,
            break_minutes,
        } => {
            let _ = controller
                .apply_settings(focus_minutes, break_minutes)
                .await;
        }
        Command::Status => {
            print!(
                "{}",
                StatusFormatter::format_status(&controller.snapshot().await)
            );
        }
        Command::Log => {
            print!(
                "{}",
                StatusFormatter::format_log(&controller.snapshot().await.log_entries)
            );
        }
        Command::Help => println!("{}", StatusFormatter::format_help()),
        Command::Quit => {}
    }
}
