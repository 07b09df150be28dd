pub mod actor;
pub mod cinema;
pub mod genre;
mod macros;
pub mod movie;
pub mod paging;
pub mod review;
pub mod upload;

pub use paging::{Page, Paging};
