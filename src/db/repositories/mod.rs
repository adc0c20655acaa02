pub mod progression_repository;
pub mod settings_repository;
pub mod task_repository;
