pub mod setting;

pub use setting::{ServerSetting, SessionSetting, Settings, SETTINGS};
