//! Categorical class label files (`.cls`)

use std::io::Write;
use std::path::Path;

use super::write_text;
use crate::data::ClassTable;
use crate::error::Result;

/// Three lines, `\n` terminated:
///
/// ```text
/// <samples> <classes> 1
/// # <class names in enumeration order, space separated>
/// <label per sample, tab separated>
/// ```
pub fn cls_content(classes: &ClassTable) -> String {
    format!(
        "{} {} 1\n# {}\n{}\n",
        classes.n_samples(),
        classes.n_groups(),
        classes.groups().join(" "),
        classes.labels().join("\t")
    )
}

pub fn write_cls<P: AsRef<Path>>(path: P, classes: &ClassTable) -> Result<()> {
    let content = cls_content(classes);
    write_text(path.as_ref(), |out| out.write_all(content.as_bytes()))
}
