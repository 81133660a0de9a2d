use anyhow::Result;
use orion_client::{AuthClient, ConversationSync, SendOrchestrator, TurnHandle};
use orion_persist::StoreHandle;
use orion_types::{Feedback, FeedbackOption, Rating, Role, SessionContext, TurnState};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::{Command, HELP};

/// Line-oriented front end over the orchestrator and sync layers
pub struct App {
    orchestrator: SendOrchestrator,
    sync: ConversationSync,
    auth: AuthClient,
    store: StoreHandle,
    session: SessionContext,
}

impl App {
    pub fn new(
        orchestrator: SendOrchestrator,
        sync: ConversationSync,
        auth: AuthClient,
        session: SessionContext,
    ) -> Self {
        let store = orchestrator.store().clone();
        Self {
            orchestrator,
            sync,
            auth,
            store,
            session,
        }
    }

    pub async fn run(&self) -> Result<()> {
        println!("{}", HELP);
        self.print_active_thread();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            prompt();
            let Some(line) = lines.next_line().await? else {
                break;
            };

            match Command::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => {
                    if let Err(e) = self.execute(command).await {
                        println!("error: {}", e);
                    }
                }
                Ok(None) => {}
                Err(usage) => println!("{}", usage),
            }
        }

        Ok(())
    }

    async fn execute(&self, command: Command) -> Result<()> {
        let allowed_while_expired = matches!(
            command,
            Command::Login { .. } | Command::Signup { .. } | Command::Logout | Command::Help
        );
        if self.session.needs_reauth() && !allowed_while_expired {
            println!("Your session has expired. Use /login to sign in again or /logout to continue anonymously.");
            return Ok(());
        }

        match command {
            Command::Send(text) => match self.orchestrator.send(&text) {
                Some(turn) => self.follow_turn(turn).await,
                None => println!("Nothing to send to."),
            },
            Command::New => {
                self.store.update(|s| s.create_thread());
                self.print_active_thread();
            }
            Command::List => self.print_threads(),
            Command::More => {
                if !self.sync.load_more().await? {
                    println!("No more conversations.");
                }
                self.print_threads();
            }
            Command::Switch(index) => {
                let id = self
                    .store
                    .read(|s| s.threads().get(index.wrapping_sub(1)).map(|t| t.id.clone()));
                match id {
                    Some(id) => {
                        self.sync.select_thread(&id).await?;
                        self.print_active_thread();
                    }
                    None => println!("No conversation {}", index),
                }
            }
            Command::Delete => {
                if let Some(id) = self.active_thread_id() {
                    self.sync.delete_thread(&id).await?;
                    self.print_active_thread();
                }
            }
            Command::Rename(title) => {
                if let Some(id) = self.active_thread_id() {
                    self.sync.rename_thread(&id, &title).await?;
                }
            }
            Command::Up => self.rate_last_answer(None, Rating::Up)?,
            Command::Down(comment) => self.rate_last_answer(comment, Rating::Down)?,
            Command::Share => {
                let token = self
                    .store
                    .read(|s| s.active_thread().map(|t| t.share_token()))
                    .transpose()?;
                match token {
                    Some(token) => println!("{}", token),
                    None => println!("No active conversation."),
                }
            }
            Command::Login { email, password } => {
                let user = self.auth.login(&email, &password).await?;
                println!("Signed in as {}", user.name);
                self.sync.load_initial().await?;
                self.print_active_thread();
            }
            Command::Signup {
                email,
                password,
                name,
            } => {
                let user = self.auth.signup(&email, &password, &name).await?;
                println!("Welcome, {}", user.name);
                self.sync.load_initial().await?;
                self.print_active_thread();
            }
            Command::Logout => {
                self.sync.logout(&self.auth).await?;
                self.print_active_thread();
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
        }

        Ok(())
    }

    /// Print the assistant message as it grows, until the turn ends
    async fn follow_turn(&self, turn: TurnHandle) {
        let message_id = turn.message_id().to_string();
        let mut changes = self.store.subscribe();
        let mut shown = String::new();

        let finished = turn.wait();
        tokio::pin!(finished);

        let state = loop {
            tokio::select! {
                state = &mut finished => break state,
                changed = changes.changed() => {
                    if changed.is_err() {
                        break (&mut finished).await;
                    }
                    self.print_progress(&message_id, &mut shown);
                }
            }
        };

        self.print_progress(&message_id, &mut shown);
        println!();

        if let TurnState::Failed(kind) = state {
            tracing::debug!(?kind, "Turn ended with failure");
        }

        let quota = self.store.read(|s| s.quota());
        if let Some(remaining) = quota.remaining {
            println!("({} questions left)", remaining);
        }
    }

    fn print_progress(&self, message_id: &str, shown: &mut String) {
        let Some(content) = self
            .store
            .read(|s| s.message(message_id).map(|m| m.content.clone()))
        else {
            return;
        };

        if let Some(suffix) = content.strip_prefix(shown.as_str()) {
            print!("{}", suffix);
        } else {
            // Content was replaced wholesale
            print!("\n{}", content);
        }
        let _ = std::io::stdout().flush();
        *shown = content;
    }

    fn rate_last_answer(&self, comment: Option<String>, rating: Rating) -> Result<()> {
        let Some(message_id) = self.store.read(|s| {
            s.active_thread().and_then(|t| {
                t.messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::Assistant)
                    .map(|m| m.id.clone())
            })
        }) else {
            println!("No answer to rate.");
            return Ok(());
        };

        match comment {
            Some(comment) => self.store.update(|s| {
                s.attach_feedback(&message_id, Feedback::new(vec![FeedbackOption::Other], comment))
            })?,
            None => self.store.update(|s| s.rate_message(&message_id, rating))?,
        }
        println!("Thanks for the feedback.");
        Ok(())
    }

    fn active_thread_id(&self) -> Option<String> {
        self.store.read(|s| s.active_thread_id().map(str::to_owned))
    }

    fn print_threads(&self) {
        self.store.read(|s| {
            for (i, thread) in s.threads().iter().enumerate() {
                let marker = if Some(thread.id.as_str()) == s.active_thread_id() {
                    "*"
                } else {
                    " "
                };
                println!("{} {:>3}. {}", marker, i + 1, thread.title);
            }
        });
        if self.sync.has_more() {
            println!("      ... /more to load older conversations");
        }
    }

    fn print_active_thread(&self) {
        self.store.read(|s| match s.active_thread() {
            Some(thread) => {
                println!("== {} ==", thread.title);
                for message in &thread.messages {
                    let who = match message.role {
                        Role::User => "you",
                        Role::Assistant => "orion",
                    };
                    println!("{}> {}", who, message.content);
                }
            }
            None => println!("No conversation selected. Use /new to start one."),
        });
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
