pub mod general;
pub mod list;
pub mod modes;
pub mod now_playing;
pub mod pause;
pub mod play;
pub mod skip;
pub mod stop;
pub mod volume;
