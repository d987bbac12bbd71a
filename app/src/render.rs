//! Plain-text rendering of each screen.

use todo_client_core::types::{Todo, User};
use todo_client_core::views::{
    EditBuffer, ForgotPasswordForm, GoogleControl, GoogleSignIn, ResetState, TodoView,
};

pub fn help(screen: &str) -> &'static str {
    match screen {
        "login" => "login <user|email> <password>, google <credential>, register, forgot, quit",
        "register" => "register <username> <email> <password> <confirm>, google <credential>, login, quit",
        "forgot" => "send <email>, again, login, quit",
        "reset" => "reset <new-password> <confirm>, login, quit",
        "offline" => "retry, logout, quit",
        _ => "list, refresh, add <title> [| description], toggle <id>, edit <id>, title <text>, \
              desc <text>, save, cancel, delete <id>, clear, filter all|active|completed, \
              summary, logout, quit",
    }
}

pub fn error_line(error: &Option<String>) {
    if let Some(error) = error {
        println!("  ! {error}");
    }
}

pub fn google(google: &GoogleSignIn) {
    match google.control() {
        GoogleControl::Widget { client_id } => {
            println!("  Google sign-in available (client {client_id})");
        }
        GoogleControl::Placeholder => println!("  {}", GoogleSignIn::placeholder_message()),
    }
}

pub fn forgot(form: &ForgotPasswordForm) {
    println!("== Forgot password ==");
    if form.email_sent {
        if let Some(message) = &form.message {
            println!("  {message}");
        }
        println!("  Check your inbox, or type 'again' to send another link.");
    } else {
        println!("  Enter the email address of your account.");
    }
    error_line(&form.error);
}

pub fn reset(state: &ResetState) {
    println!("== Reset password ==");
    match state {
        ResetState::Verifying => println!("  Verifying reset link..."),
        ResetState::Invalid { error } => {
            println!("  ! {error}");
            println!("  Type 'forgot' to request a new link or 'login' to go back.");
        }
        ResetState::Ready { account, error } => {
            if let Some(username) = &account.username {
                println!("  Resetting password for {username}");
            }
            if let Some(email) = &account.email {
                println!("  ({email})");
            }
            error_line(error);
        }
        ResetState::Submitting { .. } => println!("  Resetting password..."),
        ResetState::Success { message } => {
            println!("  {message}");
            println!("  Type 'login' to sign in.");
        }
    }
}

fn todo_line(todo: &Todo, editing: Option<&EditBuffer>) {
    let mark = if todo.completed { "x" } else { " " };
    match editing.filter(|b| b.id == todo.id) {
        Some(buffer) => println!(
            "  [{mark}] {:>4}  * editing: {} / {}",
            todo.id, buffer.title, buffer.description
        ),
        None => {
            let description = todo
                .description
                .as_deref()
                .filter(|d| !d.is_empty())
                .map(|d| format!("  ({d})"))
                .unwrap_or_default();
            println!(
                "  [{mark}] {:>4}  {}{description}  {}",
                todo.id,
                todo.title,
                todo.created_at.format("%b %d, %Y")
            );
        }
    }
}

pub fn todos(user: Option<&User>, view: &TodoView) {
    let who = user.map(|u| u.username.as_str()).unwrap_or("?");
    println!("== Todos for {who} ==");
    if view.loading {
        println!("  Loading...");
        return;
    }
    let stats = view.stats();
    println!(
        "  {} total, {} active, {} completed  [filter: {}]",
        stats.total,
        stats.active,
        stats.completed,
        view.filter()
    );
    let visible = view.filtered();
    if visible.is_empty() {
        println!("  {}", view.filter().empty_message());
    }
    for todo in visible {
        todo_line(todo, view.editing());
    }
}
