pub mod bot_engine;
pub mod events;
pub mod membership;
pub mod menu;
pub mod restriction;
pub mod settings_store;
pub mod transport;
