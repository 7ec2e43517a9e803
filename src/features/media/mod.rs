//! 记录更新流程中的图片槽位（头像、背景、封面）
pub mod handler;
mod slot;

pub use handler::create_media_router;
pub use slot::{ImageSlot, SlotUpdate};
