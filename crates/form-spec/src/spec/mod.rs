pub mod field;
pub mod form;

pub use field::{FieldGroup, FieldKind, FieldSpec, Label};
pub use form::{FormSpec, SubmitButton};
