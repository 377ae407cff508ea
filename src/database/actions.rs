pub mod named;
pub mod recipes;
pub mod users;

pub use named::*;
pub use recipes::*;
pub use users::*;
