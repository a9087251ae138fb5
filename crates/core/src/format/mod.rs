//! Binary formats found inside console package files.

pub(crate) mod bytes;
/// Package container reader.
pub mod container;
/// Property-set decoder and writer.
pub mod param;

pub use container::{read_container, ContainerIndex, ContainerView, Descriptor};
pub use param::{decode_property_set, PropertySetWriter};
