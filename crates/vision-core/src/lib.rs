pub mod calibration;
pub mod color;
pub mod detector;
pub mod error;
pub mod floor_item;
pub mod frame;
pub mod ganon;
pub mod hud;
pub mod image_buf;
pub mod inventory_reader;
pub mod item_detector;
pub mod minimap;
pub mod screen;
pub mod state;
pub mod template;
pub mod triforce_reader;
pub mod zelda_map;

pub use error::{Error, Result};
