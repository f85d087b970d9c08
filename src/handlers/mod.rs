pub mod account_handlers;
pub mod course_handlers;
pub mod forms;
pub mod import_handlers;
pub mod notification_handlers;

pub use account_handlers::*;
pub use course_handlers::*;
pub use import_handlers::*;
pub use notification_handlers::*;
