pub mod field;
pub mod form;
pub mod row;

pub use field::{DateFieldType, FieldId, FieldSpec, InputType};
pub use form::FormSpec;
pub use row::{RowLayout, RowSpec};
