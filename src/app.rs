//! Terminal host for one session.
//!
//! Plays the part of the web page: shows the landing text, starts the
//! session, then runs a single `select!` loop over channel events and user
//! input lines until the session ends from either side or the backend drops
//! the connection.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{error, info, warn};

use crate::backend::HttpBackend;
use crate::channel::ChannelHandle;
use crate::client::{SessionClient, Update};
use crate::config::ClientConfig;
use crate::error::WandError;
use crate::launch::LaunchParams;
use crate::protocol::INBOUND_EVENTS;
use crate::render::Rgb;
use crate::screens;
use crate::session::SessionId;

/// One line of user input, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    End,
    Help,
    ShowDocument,
    ShowGoal,
    QuickReply(usize),
    Chat(String),
    Empty,
}

impl Command {
    /// Slash commands and `#N` quick-reply picks; every other line is chat,
    /// including plain numbers.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line {
            "" => Command::Empty,
            "/end" | "/quit" => Command::End,
            "/help" => Command::Help,
            "/doc" => Command::ShowDocument,
            "/goal" => Command::ShowGoal,
            _ => match line.strip_prefix('#').map(str::parse::<usize>) {
                Some(Ok(n)) => Command::QuickReply(n),
                _ => Command::Chat(line.to_string()),
            },
        }
    }
}

/// How the event loop finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    EndedByUser,
    Killed,
    ConnectionLost,
}

/// Ask for a session code until a non-empty one is entered.
///
/// Returns `None` when input ends first.
pub async fn prompt_code<R>(lines: &mut Lines<R>) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        println!("{}", screens::CODE_PROMPT);
        match lines.next_line().await {
            Ok(Some(line)) => {
                let code = line.trim();
                if !code.is_empty() {
                    return Some(code.to_string());
                }
                println!("{}", screens::EMPTY_CODE);
            }
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "could not read session code");
                return None;
            }
        }
    }
}

pub struct App {
    config: ClientConfig,
    launch: LaunchParams,
    code: Option<String>,
    base: Rgb,
    color: bool,
}

impl App {
    pub fn new(config: ClientConfig, launch: LaunchParams, code: Option<String>) -> Result<Self, WandError> {
        let base = config.highlight_base()?;
        let color = config.render.color;
        Ok(App {
            config,
            launch,
            code,
            base,
            color,
        })
    }

    /// `--code` first, then the participant id from the link.
    fn initial_code(&self) -> Option<String> {
        let code = match self.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => self.launch.default_code().trim().to_string(),
        };
        (!code.is_empty()).then_some(code)
    }

    /// Run one session to completion.
    ///
    /// # Returns
    /// - `Ok(())` when the session ends, or never starts for lack of a mode
    ///   or a code.
    /// - `Err(WandError::ConnectionLost)` when the backend drops the
    ///   websocket while the session is active.
    pub async fn run(self) -> Result<(), WandError> {
        println!("{}\n", screens::landing(self.launch.mode.as_deref()));

        let mode = match self.launch.mode.as_deref() {
            Some(mode) => mode,
            None => {
                println!("{}", screens::MISSING_MODE);
                return Ok(());
            }
        };

        let mut stdin = BufReader::new(tokio::io::stdin()).lines();

        let code = match self.initial_code() {
            Some(code) => code,
            None => match prompt_code(&mut stdin).await {
                Some(code) => code,
                None => {
                    info!("no session code entered");
                    return Ok(());
                }
            },
        };

        let backend = HttpBackend::new(&self.config)?;
        let id = SessionId::generate();
        info!(session_id = %id, backend = %backend.base_url(), "launching session");

        let socket_url = self.config.socket_url()?;
        let channel = ChannelHandle::connect(&socket_url, self.config.connect_timeout()).await?;
        let mut events = channel.subscribe(INBOUND_EVENTS);

        let mut client = SessionClient::new(id, backend);
        client.attach_channel(channel)?;
        client.start_session(&code, Some(mode))?;

        if let Some(greeting) = client.chat().last() {
            println!("{}", screens::chat_line(greeting));
        }
        self.show_goal(&client).await;
        println!("{}\n", screens::COMMANDS);

        let mut help_open = false;
        let exit = loop {
            tokio::select! {
                event = events.recv() => {
                    let Some((name, payload)) = event else {
                        break Exit::ConnectionLost;
                    };
                    match client.handle_raw(&name, payload) {
                        Ok(Some(Update::Document)) => self.show_document(&client),
                        Ok(Some(Update::Chat)) => self.show_chat(&client),
                        Ok(Some(Update::SessionKilled)) => break Exit::Killed,
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "rejected inbound event"),
                    }
                }
                line = stdin.next_line() => {
                    let line = match line {
                        Ok(Some(line)) => line,
                        Ok(None) | Err(_) => {
                            let _ = client.end_session();
                            break Exit::EndedByUser;
                        }
                    };
                    match Command::parse(&line) {
                        Command::End => {
                            client.end_session()?;
                            break Exit::EndedByUser;
                        }
                        Command::Help => {
                            help_open = !help_open;
                            if help_open {
                                println!("{}\n", screens::help_overlay());
                            } else {
                                println!("(help closed)");
                            }
                        }
                        Command::ShowDocument => self.show_document(&client),
                        Command::ShowGoal => self.show_goal(&client).await,
                        Command::QuickReply(n) => {
                            if let Err(e) = client.choose_quick_reply(n) {
                                println!("{e}");
                            }
                        }
                        Command::Chat(text) => {
                            if let Err(e) = client.send_chat_message(&text) {
                                println!("{e}");
                            }
                        }
                        Command::Empty => {}
                    }
                }
            }
        };

        drop(events);
        client.backend().flush(self.config.request_timeout()).await;

        if exit == Exit::ConnectionLost {
            error!(session_id = %client.id(), url = %socket_url, "backend closed the connection mid-session");
            println!("\n{}", screens::connection_lost(self.launch.pid.as_deref()));
            return Err(WandError::ConnectionLost { url: socket_url });
        }
        info!(session_id = %client.id(), killed = exit == Exit::Killed, "session finished");
        println!("\n{}", screens::end_screen(self.launch.pid.as_deref()));
        Ok(())
    }

    fn show_document(&self, client: &SessionClient<HttpBackend>) {
        println!("\n{}\n", client.render(self.base).to_terminal(self.color));
    }

    fn show_chat(&self, client: &SessionClient<HttpBackend>) {
        if let Some(entry) = client.chat().last() {
            println!("{}", screens::chat_line(entry));
        }
        let menu = screens::quick_reply_menu(client.chat().quick_replies());
        if !menu.is_empty() {
            println!("{menu}");
        }
    }

    async fn show_goal(&self, client: &SessionClient<HttpBackend>) {
        match client.backend().fetch_goal(client.id()).await {
            Ok(goal) => println!("\n{}\n", screens::goal_panel(&goal)),
            Err(e) => warn!(error = %e, "could not load goal"),
        }
    }
}
