mod conversion;
mod core;
pub mod dev_utils;
pub mod html;
mod model;
mod ops;
mod paragraph_like;
mod plugin;
mod schema;
mod writer;

pub use crate::conversion::*;
pub use crate::core::*;
pub use crate::html::{parse_fragment, DataOutput, DataOutputs, SourceElement, SourceNode};
pub use crate::model::*;
pub use crate::ops::*;
pub use crate::paragraph_like::{ParagraphLikeElements, ParagraphLikeError};
pub use crate::plugin::*;
pub use crate::schema::*;
pub use crate::writer::{ChangeFn, Writer};
