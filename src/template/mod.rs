//! Template handling: placeholder discovery, substitution, field schema and
//! storage.

mod fill;
mod placeholders;
mod schema;
mod store;

pub use fill::{check_delimiters, fill, is_templated_part, FillOptions, LineBreaks};
pub use placeholders::{
    audit_placeholders, extract_fields, placeholders_in_xml, template_fields, visible_text,
};
pub use schema::{
    resolve, values_from_json, FieldKind, FieldPolicy, FieldSpec, FieldValues, Resolution,
};
pub use store::{
    FsTemplateStore, Registration, Template, TemplateStore, TemplateUpdate, Upload, UploadPolicy,
    DOCX_MIME,
};
