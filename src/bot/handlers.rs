mod autojoin;
pub use autojoin::autojoin_authorized_room;

mod commands;
pub use commands::answer_commands;
