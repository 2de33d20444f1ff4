#[path = "integration/session.rs"]
mod session;
#[path = "integration/dispatch.rs"]
mod dispatch;
#[path = "integration/navigation.rs"]
mod navigation;
#[path = "integration/history.rs"]
mod history;
#[path = "integration/config.rs"]
mod config;
