pub mod audio;
pub mod inactivity;
pub mod notifier;
pub mod resolver;
pub mod voice;
pub mod youtube;
