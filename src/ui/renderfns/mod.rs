pub mod footer;
pub mod header;
pub mod loading;
pub mod utils;

pub use footer::draw_footer;
pub use header::{draw_header, extract_domain};
pub use loading::draw_loading;
pub use utils::{centered_rect, format_money, status_color, truncate};
