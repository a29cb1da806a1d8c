pub mod carousel;

pub use carousel::{Attachment, AttachmentKind, CarouselState, Effect, Message};
