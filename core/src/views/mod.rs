//! View models for each screen. They hold form state, call the gateway or
//! auth store, and report outcomes through `Prompt`; rendering is left to
//! the host.

pub mod forgot_password;
pub mod google;
pub mod login;
pub mod prompt;
pub mod register;
pub mod reset_password;
pub mod router;
pub mod todos;

pub use forgot_password::ForgotPasswordForm;
pub use google::{GoogleControl, GoogleSignIn};
pub use login::LoginForm;
pub use prompt::{Notice, NoticeLevel, Prompt};
pub use register::RegisterForm;
pub use reset_password::{ResetAccount, ResetPasswordView, ResetState};
pub use router::{AuthMode, Route, Router};
pub use todos::{ClearPolicy, ClearReport, EditBuffer, Filter, TodoStats, TodoView, ViewError};
