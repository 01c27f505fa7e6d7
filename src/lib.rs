pub mod config;
pub mod corpus;
pub mod csv;
pub mod extract;
pub mod queries;
pub mod store;
pub mod tables;
pub mod transfers;
