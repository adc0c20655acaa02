pub mod auth;
pub mod progression_engine;
pub mod progression_service;
pub mod reminder_service;
pub mod settings_service;
pub mod task_service;
