/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    New,
    List,
    More,
    Switch(usize),
    Delete,
    Rename(String),
    Up,
    Down(Option<String>),
    Share,
    Login { email: String, password: String },
    Signup { email: String, password: String, name: String },
    Logout,
    Help,
    Quit,
}

pub const HELP: &str = "\
Commands:
  <text>                          send a message on the active thread
  /new                            start a new conversation
  /list                           list conversations
  /more                           load the next page of conversations
  /switch <n>                     switch to conversation n from /list
  /delete                         delete the active conversation
  /rename <title>                 rename the active conversation
  /up                             rate the last answer up
  /down [comment]                 rate the last answer down
  /share                          print a share token for the active conversation
  /login <email> <password>       sign in
  /signup <email> <password> <name>
  /logout                         sign out
  /quit                           exit";

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Command::Send(line.to_string())));
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "new" => Command::New,
            "list" => Command::List,
            "more" => Command::More,
            "switch" => {
                let index = args
                    .parse::<usize>()
                    .map_err(|_| "usage: /switch <n>".to_string())?;
                Command::Switch(index)
            }
            "delete" => Command::Delete,
            "rename" if !args.is_empty() => Command::Rename(args.to_string()),
            "rename" => return Err("usage: /rename <title>".to_string()),
            "up" => Command::Up,
            "down" => Command::Down((!args.is_empty()).then(|| args.to_string())),
            "share" => Command::Share,
            "login" => match args.split_whitespace().collect::<Vec<_>>().as_slice() {
                [email, password] => Command::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                _ => return Err("usage: /login <email> <password>".to_string()),
            },
            "signup" => {
                let mut parts = args.splitn(3, char::is_whitespace);
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(email), Some(password), Some(name)) if !name.trim().is_empty() => {
                        Command::Signup {
                            email: email.to_string(),
                            password: password.to_string(),
                            name: name.trim().to_string(),
                        }
                    }
                    _ => return Err("usage: /signup <email> <password> <name>".to_string()),
                }
            }
            "logout" => Command::Logout,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command: /{}", other)),
        };

        Ok(Some(command))
    }
}
