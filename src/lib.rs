pub mod app;
pub mod apps_script;
pub mod assistant;
pub mod config;
pub mod dates;
pub mod errors;
pub mod followup;
pub mod handlers;
pub mod models;
pub mod openai;
pub mod sheets;
pub mod state;
pub mod stats;
pub mod storage;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
pub use storage::load_settings;
