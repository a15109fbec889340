pub mod commands;
pub mod lookup;
pub mod notifier;
pub mod record;
pub mod refresh;
