pub mod assignment;
pub mod audit;
pub mod auth;
pub mod bank_details;
pub mod collections;
pub mod materials;
pub mod metrics;
pub mod notifications;
pub mod organizations;
pub mod permissions;
pub mod products;
pub mod resource;
pub mod roles;
pub mod transactions;
pub mod users;
