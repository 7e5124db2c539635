pub mod backend;
pub mod connection;
pub mod dao;
pub mod entities;

pub use connection::connect;
