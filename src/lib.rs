//! docrag: column-aware PDF fragment extraction, a dense similarity index
//! over the fragments, and grounded question answering on top of it.

pub mod app_state;
pub mod commands;
pub mod error;
pub mod fragment;
pub mod services;
pub mod utils;

pub use app_state::AppState;
pub use error::{AppError, AppResult, ResultExt};
pub use fragment::{Fragment, FragmentKind};
