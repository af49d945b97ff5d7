pub mod gamestate_common;
pub mod messages_common;
