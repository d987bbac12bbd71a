//! The interactive loop: render the current route, read a command, apply it.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use todo_client_core::views::{
    AuthMode, ForgotPasswordForm, GoogleSignIn, LoginForm, Prompt, RegisterForm,
    ResetPasswordView, Route, Router, TodoView, ViewError,
};
use todo_client_core::{AppContext, SessionState, SessionWatch};
use tracing::debug;

use crate::command::{Command, RegisterArgs};
use crate::render;

pub struct Shell {
    ctx: AppContext,
    session: SessionWatch,
    prompt: Arc<dyn Prompt>,
    router: Router,
    google: GoogleSignIn,
    login: LoginForm,
    register: RegisterForm,
    forgot: ForgotPasswordForm,
    reset: Option<ResetPasswordView>,
    todos: Option<TodoView>,
}

enum Flow {
    Continue,
    Quit,
}

impl Shell {
    pub fn new(ctx: AppContext, prompt: Arc<dyn Prompt>, router: Router) -> Self {
        let google = GoogleSignIn::new(ctx.config.google_client_id.clone(), ctx.gateway.clone());
        let session = ctx.session.subscribe();
        Self {
            ctx,
            session,
            prompt,
            router,
            google,
            login: LoginForm::new(),
            register: RegisterForm::new(),
            forgot: ForgotPasswordForm::new(),
            reset: None,
            todos: None,
        }
    }

    pub fn run(&mut self, input: impl BufRead) -> Result<()> {
        let mut lines = input.lines();
        loop {
            let route = self.sync_route();
            self.render(&route);
            print!("> ");
            io::stdout().flush()?;

            let Some(line) = lines.next() else {
                break;
            };
            let line = line?;
            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(message) => {
                    if !message.is_empty() {
                        println!("{message}");
                    }
                    continue;
                }
            };
            debug!(?command, ?route, "command");
            if let Flow::Quit = self.apply(&route, command) {
                break;
            }
        }
        if let Some(view) = self.todos.as_mut() {
            view.unmount();
        }
        Ok(())
    }

    /// Latest session state, resetting the auth screens when it changed.
    fn observe_session(&mut self) -> SessionState {
        if !self.session.has_changed().unwrap_or(false) {
            return self.session.borrow().clone();
        }
        let state = self.session.borrow_and_update().clone();
        debug!(status = ?state.status(), ended = ?state.ended, "session changed");
        if state.ended.is_some() {
            self.login.password.clear();
            self.register = RegisterForm::new();
            if state.expiry_message().is_some() {
                self.switch(AuthMode::Login);
            }
        }
        state
    }

    /// Mount or tear down the per-route views to match the session.
    fn sync_route(&mut self) -> Route {
        let state = self.observe_session();
        let route = self.router.route(&state);

        if route == Route::Todos {
            if self.todos.is_none() {
                let mut view = TodoView::new(self.ctx.auth.clone(), self.prompt.clone())
                    .with_clear_policy(self.ctx.config.clear_policy);
                // Failures are reported through the prompt.
                if let Err(e) = view.fetch_todos() {
                    debug!(error = %e, "initial fetch failed");
                }
                self.todos = Some(view);
            }
        } else if let Some(mut view) = self.todos.take() {
            view.unmount();
        }

        if let Route::ResetPassword { token } = &route {
            if self.reset.is_none() {
                let mut view = ResetPasswordView::new(token.clone());
                view.mount(&self.ctx.gateway);
                self.reset = Some(view);
            }
        }
        // Re-resolve: a fetch above may have ended the session.
        let state = self.observe_session();
        self.router.route(&state)
    }

    fn render(&self, route: &Route) {
        println!();
        match route {
            Route::Loading => println!("Loading..."),
            Route::Offline => {
                println!("== Offline ==");
                println!("  Could not reach {}.", self.ctx.config.api_url);
                println!("  {}", render::help("offline"));
            }
            Route::Login => {
                println!("== Login ==");
                if let Some(message) = self.session.borrow().expiry_message() {
                    println!("  Session ended: {message}");
                }
                render::error_line(&self.login.error);
                render::google(&self.google);
                println!("  {}", render::help("login"));
            }
            Route::Register => {
                println!("== Register ==");
                render::error_line(&self.register.error);
                render::google(&self.google);
                println!("  {}", render::help("register"));
            }
            Route::ForgotPassword => {
                render::forgot(&self.forgot);
                println!("  {}", render::help("forgot"));
            }
            Route::ResetPassword { .. } => {
                if let Some(view) = &self.reset {
                    render::reset(view.state());
                }
                println!("  {}", render::help("reset"));
            }
            Route::Todos => {
                if let Some(view) = &self.todos {
                    render::todos(self.ctx.session.user().as_ref(), view);
                }
            }
        }
    }

    fn apply(&mut self, route: &Route, command: Command) -> Flow {
        match command {
            Command::Quit => return Flow::Quit,
            Command::Help => {
                let screen = match route {
                    Route::Login => "login",
                    Route::Register => "register",
                    Route::ForgotPassword => "forgot",
                    Route::ResetPassword { .. } => "reset",
                    Route::Offline => "offline",
                    _ => "todos",
                };
                println!("{}", render::help(screen));
            }
            command => match route {
                Route::Todos => self.apply_todos(command),
                Route::Offline => self.apply_offline(command),
                Route::Loading => println!("Still loading, try again."),
                _ => self.apply_auth(command),
            },
        }
        Flow::Continue
    }

    fn apply_auth(&mut self, command: Command) {
        match command {
            Command::Login(None) => self.switch(AuthMode::Login),
            Command::Login(Some((username, password))) => {
                self.login.edited();
                self.login.username = username;
                self.login.password = password;
                self.login.submit(&self.ctx.auth);
            }
            Command::Register(None) => self.switch(AuthMode::Register),
            Command::Register(Some(RegisterArgs {
                username,
                email,
                password,
                confirm,
            })) => {
                self.switch(AuthMode::Register);
                self.register.edited();
                self.register.username = username;
                self.register.email = email;
                self.register.password = password;
                self.register.confirm_password = confirm;
                self.register.submit(&self.ctx.auth);
            }
            Command::Forgot => self.switch(AuthMode::ForgotPassword),
            Command::SendReset(email) => {
                self.forgot.email = email;
                self.forgot.submit(&self.ctx.gateway);
            }
            Command::TryAgain => self.forgot.try_again(),
            Command::Reset { password, confirm } => match self.reset.as_mut() {
                Some(view) => {
                    view.password = password;
                    view.confirm_password = confirm;
                    view.submit(&self.ctx.gateway);
                }
                None => println!("Open the reset link from your email first."),
            },
            Command::Google(credential) => self.google_sign_in(credential),
            _ => println!("Sign in first. Type 'help' for commands."),
        }
    }

    fn google_sign_in(&mut self, credential: Option<String>) {
        if !self.google.is_configured() {
            println!("{}", GoogleSignIn::placeholder_message());
            return;
        }
        let Some(credential) = credential else {
            self.login.google_error(GoogleSignIn::cancelled_message());
            return;
        };
        let registering = self.router.mode() == AuthMode::Register;
        match self.google.exchange(&credential) {
            Ok(payload) if registering => {
                self.register.google_success(&self.ctx.auth, payload);
            }
            Ok(payload) => {
                self.login.google_success(&self.ctx.auth, payload);
            }
            Err(message) if registering => self.register.google_error(message),
            Err(message) => self.login.google_error(message),
        }
    }

    fn switch(&mut self, mode: AuthMode) {
        if mode != AuthMode::ResetPassword {
            self.reset = None;
        }
        self.router.show(mode);
    }

    fn apply_offline(&mut self, command: Command) {
        match command {
            Command::Retry => {
                self.ctx.auth.hydrate();
            }
            Command::Logout => self.ctx.auth.logout(),
            _ => println!("The backend is unreachable. Type 'retry' or 'logout'."),
        }
    }

    fn apply_todos(&mut self, command: Command) {
        let Some(view) = self.todos.as_mut() else {
            return;
        };
        // Outcomes that matter to the user are reported through the prompt;
        // the returned errors only carry detail for logging.
        let outcome = match command {
            Command::List => Ok(()),
            Command::Refresh => view.fetch_todos(),
            Command::Add { title, description } => {
                view.create_todo(&title, &description).map(|_| ())
            }
            Command::Toggle(id) => match view.todos().iter().find(|t| t.id == id) {
                Some(todo) => {
                    let completed = todo.completed;
                    view.toggle_todo(id, completed).map(|_| ())
                }
                None => {
                    println!("No todo with id {id}.");
                    Ok(())
                }
            },
            Command::Edit(id) => {
                if !view.start_edit(id) {
                    println!("No todo with id {id}.");
                }
                Ok(())
            }
            Command::Title(text) => {
                match view.edit_buffer_mut() {
                    Some(buffer) => buffer.title = text,
                    None => println!("Not editing anything; use 'edit <id>'."),
                }
                Ok(())
            }
            Command::Desc(text) => {
                match view.edit_buffer_mut() {
                    Some(buffer) => buffer.description = text,
                    None => println!("Not editing anything; use 'edit <id>'."),
                }
                Ok(())
            }
            Command::Save => view.save_edit().map(|_| ()),
            Command::Cancel => {
                view.cancel_edit();
                Ok(())
            }
            Command::Delete(id) => view.delete_todo(id).map(|_| ()),
            Command::Clear => view.clear_completed().map(|_| ()),
            Command::Filter(filter) => {
                view.set_filter(filter);
                Ok(())
            }
            Command::Summary => view.send_email_summary().map(|_| ()),
            Command::Logout => {
                view.logout_with_confirmation();
                Ok(())
            }
            _ => {
                println!("Already signed in. Type 'help' for commands.");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            debug!(error = %e, "todo command failed");
            if let ViewError::Validation(v) = &e {
                println!("{v}");
            }
        }
    }
}
