// General-purpose lab data tooling

pub mod com;
pub mod dist;
pub mod html;
pub mod io;
pub mod plot;
pub mod stat;
pub mod tidy;

pub use tidy::Table;
