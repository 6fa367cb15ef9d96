//! Renaming of qualified references across nested bodies.
//!
//! References such as `terraform.workspace` or `var.name` are rewritten by
//! replacing their leading segments only. Everything around a reference,
//! including template delimiters, quoting and whitespace, is left as is.
//!
//! # Example
//!
//! ```
//! # use tfmigrate::references::{has_reference, rename_reference_prefix};
//! # use tfmigrate_hcl::parse;
//! let (mut doc, _) = parse("locals {\n  name = \"app-${terraform.workspace}\"\n}\n", "main.tf");
//!
//! let from = ["terraform", "workspace"];
//! assert!(has_reference(doc.body(), &from));
//! rename_reference_prefix(doc.body_mut(), &from, &["var", "environment"]);
//!
//! assert_eq!(
//!     doc.to_string(),
//!     "locals {\n  name = \"app-${var.environment}\"\n}\n"
//! );
//! ```

use tfmigrate_hcl::Body;

/// Returns `true` if any expression in `body` or its nested blocks has a
/// reference starting with `from`.
pub fn has_reference(body: &Body, from: &[&str]) -> bool {
    body.attributes()
        .any(|attribute| attribute.expr().has_traversal_prefix(from))
        || body.blocks().any(|block| has_reference(block.body(), from))
}

/// Rename every reference in `body` and its nested blocks that starts with
/// `from` so that it starts with `to` instead.
///
/// Returns the number of references renamed.
pub fn rename_reference_prefix(body: &mut Body, from: &[&str], to: &[&str]) -> usize {
    let mut renamed = 0;
    for attribute in body.attributes_mut() {
        renamed += attribute.expr_mut().rename_traversal_prefix(from, to);
    }
    for block in body.blocks_mut() {
        renamed += rename_reference_prefix(block.body_mut(), from, to);
    }
    renamed
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use tfmigrate_hcl::parse;

    const WORKSPACE: [&str; 2] = ["terraform", "workspace"];
    const VARIABLE: [&str; 2] = ["var", "environment"];

    fn rename(src: &str) -> (String, usize) {
        let (mut doc, diagnostics) = parse(src, "main.tf");
        assert!(!diagnostics.has_errors(), "{diagnostics}");
        let count = rename_reference_prefix(doc.body_mut(), &WORKSPACE, &VARIABLE);
        (doc.to_string(), count)
    }

    #[test]
    fn test_renames_nested_references() {
        let src = concat!(
            "locals {\n",
            "  env = terraform.workspace # current\n",
            "}\n",
            "\n",
            "resource \"aws_instance\" \"web\" {\n",
            "  tags = {\n",
            "    Name = \"web-${terraform.workspace}\"\n",
            "  }\n",
            "\n",
            "  dynamic \"ebs\" {\n",
            "    content {\n",
            "      size = lookup(var.sizes, terraform.workspace)\n",
            "    }\n",
            "  }\n",
            "}\n",
        );
        let (output, count) = rename(src);
        assert_eq!(count, 3);
        assert_eq!(output, src.replace("terraform.workspace", "var.environment"));
    }

    #[test]
    fn test_leaves_other_references() {
        let src = concat!(
            "a = terraform.workspaces\n",
            "b = data.terraform.workspace\n",
            "c = \"terraform.workspace\"\n",
            "d = var.terraform\n",
        );
        let (output, count) = rename(src);
        assert_eq!(count, 0);
        assert_eq!(output, src);
    }

    #[test]
    fn test_keeps_trailing_segments() {
        let (output, count) = rename("a = terraform.workspace.id\nb = terraform.workspace[0]\n");
        assert_eq!(count, 2);
        assert_eq!(output, "a = var.environment.id\nb = var.environment[0]\n");
    }

    #[test]
    fn test_rename_is_idempotent() {
        let (once, _) = rename("a = \"${terraform.workspace}\"\n");
        let (twice, count) = rename(&once);
        assert_eq!(count, 0);
        assert_eq!(once, twice);
    }

    proptest! {
        #[test]
        fn test_rename_counts_every_reference(
            names in proptest::collection::vec("[a-z][a-z0-9]{0,8}", 1..8),
            templated in any::<bool>(),
        ) {
            let value = if templated {
                "\"x-${terraform.workspace}\""
            } else {
                "terraform.workspace"
            };
            let src: String = names
                .iter()
                .enumerate()
                .map(|(i, name)| format!("{name}_{i} = {value}\n"))
                .collect();

            let (output, count) = rename(&src);
            prop_assert_eq!(count, names.len());
            prop_assert_eq!(output, src.replace("terraform.workspace", "var.environment"));
        }
    }

    #[test]
    fn test_has_reference() {
        let (doc, _) = parse("a {\n  b {\n    c = terraform.workspace\n  }\n}\n", "main.tf");
        assert!(has_reference(doc.body(), &WORKSPACE));
        assert!(!has_reference(doc.body(), &VARIABLE));
    }
}
