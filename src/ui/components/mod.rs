mod command_input;
mod confirm;
mod input;
mod key_result;
mod search_input;
mod toast;

pub use command_input::CommandInput;
pub use confirm::ConfirmDialog;
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use search_input::{SearchEvent, SearchInput};
pub use toast::Toasts;
