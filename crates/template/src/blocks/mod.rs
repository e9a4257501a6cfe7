//! Element and body-block renderers
//!
//! Static elements (text, label, image) are drawn wherever their region
//! places them. Exactly one body block (table, card list or label sheet)
//! drives pagination.

pub(crate) mod card_list;
pub(crate) mod label_sheet;
pub(crate) mod static_elements;
pub(crate) mod table;

use serde_json::Value;

use crate::parser::subtable_rows;
use crate::renderer::RenderContext;
use crate::warnings::Warning;
use crate::{DataSource, TemplateDataRecord};

/// Rows feeding a table or card list
///
/// Subtable and field references read the record; a static source may carry
/// its rows inline as an array of objects.
pub(crate) fn source_rows(
    ctx: &mut RenderContext<'_>,
    source: &DataSource,
    element_id: &str,
) -> Vec<TemplateDataRecord> {
    match source {
        DataSource::Subtable { field_code } | DataSource::Field { field_code } => {
            match ctx.record.as_ref() {
                Some(record) => subtable_rows(record, field_code, &mut ctx.sink),
                None => Vec::new(),
            }
        }
        DataSource::Static { value } => match value {
            Value::Array(items) => items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect(),
            Value::Null => Vec::new(),
            _ => {
                ctx.warn(
                    Warning::data("static rows must be an array").with("element", element_id),
                );
                Vec::new()
            }
        },
    }
}
