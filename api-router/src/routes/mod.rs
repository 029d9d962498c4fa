pub mod alerts;
pub mod health;
pub mod runbooks;
pub mod webhooks;
