//! Parsing of the shell's one-line commands.

use todo_client_core::views::Filter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    /// `login` alone switches screens; with credentials it signs in.
    Login(Option<(String, String)>),
    Register(Option<RegisterArgs>),
    Forgot,
    SendReset(String),
    TryAgain,
    Reset { password: String, confirm: String },
    Google(Option<String>),
    List,
    Refresh,
    Add { title: String, description: String },
    Toggle(i64),
    Edit(i64),
    Title(String),
    Desc(String),
    Save,
    Cancel,
    Delete(i64),
    Clear,
    Filter(Filter),
    Summary,
    Logout,
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterArgs {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
}

fn id(rest: &str) -> Result<i64, String> {
    rest.trim()
        .parse()
        .map_err(|_| format!("expected a todo id, got '{}'", rest.trim()))
}

fn words(rest: &str) -> Vec<String> {
    rest.split_whitespace().map(str::to_string).collect()
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match head.to_ascii_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "login" => match words(rest).as_slice() {
                [] => Command::Login(None),
                [user, password] => Command::Login(Some((user.clone(), password.clone()))),
                _ => return Err("usage: login <username|email> <password>".to_string()),
            },
            "register" => match words(rest).as_slice() {
                [] => Command::Register(None),
                [username, email, password, confirm] => Command::Register(Some(RegisterArgs {
                    username: username.clone(),
                    email: email.clone(),
                    password: password.clone(),
                    confirm: confirm.clone(),
                })),
                _ => {
                    return Err(
                        "usage: register <username> <email> <password> <confirm>".to_string()
                    )
                }
            },
            "forgot" => Command::Forgot,
            "send" => Command::SendReset(rest.to_string()),
            "again" => Command::TryAgain,
            "reset" => match words(rest).as_slice() {
                [password, confirm] => Command::Reset {
                    password: password.clone(),
                    confirm: confirm.clone(),
                },
                [password] => Command::Reset {
                    password: password.clone(),
                    confirm: String::new(),
                },
                _ => return Err("usage: reset <new-password> <confirm>".to_string()),
            },
            "google" => Command::Google((!rest.is_empty()).then(|| rest.to_string())),
            "list" | "ls" => Command::List,
            "refresh" => Command::Refresh,
            "add" => {
                let (title, description) = rest.split_once('|').unwrap_or((rest, ""));
                Command::Add {
                    title: title.trim().to_string(),
                    description: description.trim().to_string(),
                }
            }
            "toggle" | "done" => Command::Toggle(id(rest)?),
            "edit" => Command::Edit(id(rest)?),
            "title" => Command::Title(rest.to_string()),
            "desc" => Command::Desc(rest.to_string()),
            "save" => Command::Save,
            "cancel" => Command::Cancel,
            "delete" | "rm" => Command::Delete(id(rest)?),
            "clear" => Command::Clear,
            "filter" => Command::Filter(rest.parse()?),
            "summary" => Command::Summary,
            "logout" => Command::Logout,
            "retry" => Command::Retry,
            "" => return Err(String::new()),
            other => return Err(format!("unknown command '{other}', type 'help'")),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_splits_title_and_description() {
        assert_eq!(
            Command::parse("add Buy milk | 2 litres").unwrap(),
            Command::Add {
                title: "Buy milk".to_string(),
                description: "2 litres".to_string()
            }
        );
        assert_eq!(
            Command::parse("add   ").unwrap(),
            Command::Add {
                title: String::new(),
                description: String::new()
            }
        );
    }

    #[test]
    fn login_with_and_without_credentials() {
        assert_eq!(Command::parse("login").unwrap(), Command::Login(None));
        assert_eq!(
            Command::parse("login alice secret1").unwrap(),
            Command::Login(Some(("alice".to_string(), "secret1".to_string())))
        );
        assert!(Command::parse("login alice").is_err());
    }

    #[test]
    fn ids_and_filters_are_checked() {
        assert_eq!(Command::parse("toggle 5").unwrap(), Command::Toggle(5));
        assert!(Command::parse("delete five").is_err());
        assert_eq!(
            Command::parse("filter completed").unwrap(),
            Command::Filter(Filter::Completed)
        );
        assert!(Command::parse("filter someday").is_err());
    }

    #[test]
    fn unknown_command_is_an_error() {
        assert!(Command::parse("frobnicate").is_err());
    }
}
