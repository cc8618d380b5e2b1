pub mod member;
pub mod project;
pub mod status;
pub mod task;
pub mod user;

pub use member::*;
pub use project::*;
pub use status::*;
pub use task::*;
pub use user::*;
