//! Numbering resolver - decides list kind and nesting for numbered paragraphs.

use rs_docx::Docx;
use std::collections::HashMap;

/// Resolver for DOCX numbering definitions.
pub struct NumberingResolver<'a> {
    /// Maps numId -> abstractNumId
    num_instances: HashMap<i32, i32>,
    /// Maps abstractNumId -> (ilvl -> numFmt)
    formats: HashMap<i32, HashMap<i32, String>>,
    _phantom: std::marker::PhantomData<&'a ()>,
}

impl<'a> NumberingResolver<'a> {
    /// Creates a new numbering resolver from a parsed DOCX.
    pub fn new(docx: &'a Docx) -> Self {
        let mut num_instances = HashMap::new();
        let mut formats = HashMap::new();

        if let Some(numbering) = &docx.numbering {
            for abs_num in &numbering.abstract_numberings {
                let abs_id = abs_num.abstract_num_id.map(|id| id as i32).unwrap_or(0);
                let levels: HashMap<i32, String> = abs_num
                    .levels
                    .iter()
                    .map(|lvl| {
                        let ilvl = lvl.i_level.map(|i| i as i32).unwrap_or(0);
                        let num_fmt = lvl
                            .number_format
                            .as_ref()
                            .map(|f| f.value.to_string())
                            .unwrap_or_else(|| "decimal".to_string());
                        (ilvl, num_fmt)
                    })
                    .collect();
                formats.insert(abs_id, levels);
            }

            for num in &numbering.numberings {
                if let (Some(num_id), Some(abs_ref)) = (num.num_id, &num.abstract_num_id) {
                    if let Some(abs_id) = abs_ref.value {
                        num_instances.insert(num_id as i32, abs_id as i32);
                    }
                }
            }
        }

        Self {
            num_instances,
            formats,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Whether items at this level render as `<ol>` rather than `<ul>`.
    ///
    /// Unknown numbering instances are treated as bullets.
    pub fn is_ordered(&self, num_id: i32, ilvl: i32) -> bool {
        let Some(levels) = self
            .num_instances
            .get(&num_id)
            .and_then(|abs_id| self.formats.get(abs_id))
        else {
            return false;
        };

        match levels.get(&ilvl) {
            Some(fmt) => !matches!(fmt.as_str(), "bullet" | "none"),
            None => false,
        }
    }

    /// Zero-based nesting depth of a list item.
    pub fn get_indent(&self, _num_id: i32, ilvl: i32) -> usize {
        ilvl.max(0) as usize
    }

    /// `numId` 0 is Word's way of switching numbering off for a paragraph.
    pub fn is_numbered(&self, num_id: i32) -> bool {
        num_id != 0
    }
}
