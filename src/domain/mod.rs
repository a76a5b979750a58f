pub mod player;
pub mod queue;
pub mod track;
pub mod volume;
