//! Matching remote state data sources against the module's backend.
//!
//! Both sides are reduced to a [`StateLocation`]: the statically known
//! settings that identify where a state file lives. A `terraform_remote_state`
//! data source reads the migrated module's state when every setting it
//! declares agrees with the module's backend.

use indexmap::IndexMap;
use log::trace;

use tfmigrate_core::value::Value;
use tfmigrate_hcl::eval::{EvalError, evaluate};

use crate::module::Backend;

/// Where a state file is stored.
///
/// The settings shared by the common backends are kept as typed fields;
/// anything else lands in [`StateLocation::other`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateLocation {
    pub path: Option<String>,
    pub workspace_dir: Option<String>,
    pub bucket: Option<String>,
    pub key: Option<String>,
    pub region: Option<String>,
    pub prefix: Option<String>,
    pub workspace_key_prefix: Option<String>,
    pub other: IndexMap<String, Value>,
}

impl StateLocation {
    /// Build a location from an evaluated `config` object.
    ///
    /// Known fields holding a non-primitive value are kept in `other` so
    /// they still take part in the comparison.
    pub fn from_object(object: &IndexMap<String, Value>) -> Self {
        let mut location = Self::default();
        for (key, value) in object {
            location.set(key, value.clone());
        }
        location
    }

    /// Build the location of a module's backend.
    ///
    /// Attributes that are not constant are left out, so a data source
    /// that sets them can never match.
    pub fn from_backend(backend: &Backend) -> Self {
        let mut location = Self::default();
        for (key, expr) in backend.config() {
            match evaluate(expr, backend.filename()) {
                Ok(value) => location.set(key, value),
                Err(EvalError::NonConstant) => {
                    trace!(attribute = key.as_str(); "Skipping non-constant backend attribute");
                }
                Err(EvalError::Invalid(diagnostic)) => {
                    trace!(
                        attribute = key.as_str(),
                        error = diagnostic.to_string();
                        "Skipping invalid backend attribute"
                    );
                }
            }
        }
        location
    }

    fn set(&mut self, key: &str, value: Value) {
        let field = match key {
            "path" => &mut self.path,
            "workspace_dir" => &mut self.workspace_dir,
            "bucket" => &mut self.bucket,
            "key" => &mut self.key,
            "region" => &mut self.region,
            "prefix" => &mut self.prefix,
            "workspace_key_prefix" => &mut self.workspace_key_prefix,
            _ => {
                self.other.insert(key.to_string(), value);
                return;
            }
        };
        match value.to_primitive_string() {
            Some(s) => *field = Some(s),
            None => {
                self.other.insert(key.to_string(), value);
            }
        }
    }

    fn fields(&self) -> [(&'static str, Option<&str>); 7] {
        [
            ("path", self.path.as_deref()),
            ("workspace_dir", self.workspace_dir.as_deref()),
            ("bucket", self.bucket.as_deref()),
            ("key", self.key.as_deref()),
            ("region", self.region.as_deref()),
            ("prefix", self.prefix.as_deref()),
            ("workspace_key_prefix", self.workspace_key_prefix.as_deref()),
        ]
    }

    /// Returns `true` if every setting present here has the same value in
    /// `target`.
    ///
    /// Settings only `target` has are ignored, which lets a data source
    /// rely on backend defaults it does not spell out.
    pub fn is_satisfied_by(&self, target: &StateLocation) -> bool {
        let declared = self
            .fields()
            .into_iter()
            .zip(target.fields())
            .all(|((name, ours), (_, theirs))| match ours {
                None => true,
                Some(ours) => {
                    let equal = theirs == Some(ours);
                    if !equal {
                        trace!(
                            field = name,
                            expected = theirs.unwrap_or_default(),
                            found = ours;
                            "State location field differs"
                        );
                    }
                    equal
                }
            });

        declared
            && self.other.iter().all(|(key, ours)| {
                target
                    .other
                    .get(key)
                    .is_some_and(|theirs| ours.loosely_equals(theirs))
            })
    }
}

/// Returns `true` if a remote state data source with backend type
/// `data_backend` and the evaluated `config` reads `backend`'s state.
pub fn correlates(
    backend: &Backend,
    primary: &StateLocation,
    data_backend: &str,
    config: &StateLocation,
) -> bool {
    backend.kind() == data_backend && config.is_satisfied_by(primary)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::{fs::MemoryFileSystem, module::ModuleView, store::DocumentStore};

    fn backend(src: &str) -> Backend {
        let fs = MemoryFileSystem::with_files([("app/backend.tf", src)]);
        let (module, diagnostics) = ModuleView::load(&DocumentStore::new(&fs), Path::new("app"));
        assert!(diagnostics.is_empty(), "{diagnostics}");
        module.unwrap().backend().unwrap().clone()
    }

    fn location(entries: &[(&str, Value)]) -> StateLocation {
        let object: IndexMap<String, Value> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        StateLocation::from_object(&object)
    }

    #[test]
    fn test_from_backend() {
        let backend = backend(concat!(
            "terraform {\n",
            "  backend \"s3\" {\n",
            "    bucket  = \"state\"\n",
            "    key     = \"app/${var.env}\"\n",
            "    region  = \"us-east-1\"\n",
            "    encrypt = true\n",
            "  }\n",
            "}\n",
        ));
        let primary = StateLocation::from_backend(&backend);
        assert_eq!(primary.bucket.as_deref(), Some("state"));
        assert_eq!(primary.key, None);
        assert_eq!(primary.region.as_deref(), Some("us-east-1"));
        assert_eq!(primary.other.get("encrypt"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_declared_fields_must_match() {
        let primary = location(&[
            ("bucket", Value::string("state")),
            ("key", Value::string("app.tfstate")),
            ("region", Value::string("us-east-1")),
        ]);

        // A subset of the backend's settings is enough
        let config = location(&[
            ("bucket", Value::string("state")),
            ("key", Value::string("app.tfstate")),
        ]);
        assert!(config.is_satisfied_by(&primary));

        let config = location(&[
            ("bucket", Value::string("state")),
            ("key", Value::string("other.tfstate")),
        ]);
        assert!(!config.is_satisfied_by(&primary));

        // Settings the backend does not have never match
        let config = location(&[("workspace_key_prefix", Value::string("env:"))]);
        assert!(!config.is_satisfied_by(&primary));
    }

    #[test]
    fn test_other_fields_compare_loosely() {
        let primary = location(&[
            ("path", Value::string("a.tfstate")),
            ("encrypt", Value::Bool(true)),
        ]);

        let config = location(&[("encrypt", Value::string("true"))]);
        assert!(config.is_satisfied_by(&primary));

        let config = location(&[("encrypt", Value::Bool(false))]);
        assert!(!config.is_satisfied_by(&primary));

        let config = location(&[("profile", Value::string("default"))]);
        assert!(!config.is_satisfied_by(&primary));
    }

    #[test]
    fn test_numbers_match_strings() {
        let primary = location(&[("path", Value::string("1"))]);
        let config = location(&[("path", Value::Number(1.0))]);
        assert!(config.is_satisfied_by(&primary));
    }

    #[test]
    fn test_correlates_requires_backend_type() {
        let backend =
            backend("terraform {\n  backend \"local\" {\n    path = \"a.tfstate\"\n  }\n}\n");
        let primary = StateLocation::from_backend(&backend);
        let config = location(&[("path", Value::string("a.tfstate"))]);

        assert!(correlates(&backend, &primary, "local", &config));
        assert!(!correlates(&backend, &primary, "s3", &config));
    }
}
