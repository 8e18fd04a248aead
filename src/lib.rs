pub mod assistant;
pub mod blob;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod ident;
pub mod models;
