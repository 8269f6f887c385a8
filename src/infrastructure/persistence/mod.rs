pub mod mongodb;
pub mod rest;
pub mod sqlite;
