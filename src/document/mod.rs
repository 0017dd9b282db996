//! Document model and codec.
//!
//! - [`ValueTree`] / [`Document`]: the closed set of storable shapes
//! - [`codec`]: native <-> tree conversion and the shape-checked field accessors
//! - [`DocumentKey`]: the schema keys of a stored player document

pub mod codec;
pub mod keys;
pub mod value;

pub use codec::{
    field_value, field_value_opt, list_field, materialize_from_storage, materialize_keyed,
    normalize_for_storage, DocumentReader, FromValueTree, ToValueTree,
};
pub use keys::DocumentKey;
pub use value::{Document, Shape, ValueTree};
