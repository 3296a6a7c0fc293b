pub mod audit;
pub mod content;
pub mod page;
pub mod redirect;
pub mod reserved;
