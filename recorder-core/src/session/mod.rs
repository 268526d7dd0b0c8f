pub mod controls;
pub mod feed;
pub mod playback;
pub mod recorder;
pub mod resources;
pub mod timing;
mod worker;
